use anyhow::Result;
use tracing::{debug, warn};
use tracker_core::model::{NewItem, NewProject};
use tracker_core::{MutationError, Tracker};

use crate::nav::{Effect, FocusableEntry, Key, NavigationState};

/// A project view over a [`Tracker`]: keys go through the navigation state
/// and the create requests they produce are written through the tracker.
pub struct Session {
    tracker: Tracker,
    state: NavigationState,
}

impl Session {
    pub fn new(tracker: Tracker) -> Self {
        Self {
            tracker,
            state: NavigationState::new(),
        }
    }

    /// Load both collections and put the cursor on the first entry.
    pub async fn load(&mut self) -> Result<()> {
        self.tracker.refresh().await?;
        let entries = self.entries();
        self.state.sync(&entries);
        Ok(())
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut NavigationState {
        &mut self.state
    }

    pub fn entries(&self) -> Vec<FocusableEntry> {
        self.state
            .entries(&self.tracker.projects(), &self.tracker.items())
    }

    /// Feed one key. On a failed create the draft and input mode are left as
    /// they were and the error is returned.
    pub async fn press(&mut self, key: Key) -> Result<Vec<Effect>, MutationError> {
        let entries = self.entries();
        let effects = self.state.handle_key(key, &entries);
        debug!(?key, effects = effects.len(), "key handled");
        for effect in effects.iter().filter(|effect| effect.is_create()) {
            if let Err(err) = self.run(effect).await {
                warn!(error = %err, "create from the project view failed");
                return Err(err);
            }
        }
        Ok(effects)
    }

    async fn run(&mut self, effect: &Effect) -> Result<(), MutationError> {
        match effect {
            Effect::CreateProject { title, color } => {
                let mut input = NewProject::titled(title.as_str());
                input.color = Some(*color);
                self.tracker.create_project(input).await?;
                self.state.finish_create_project();
            }
            Effect::CreateTask { project, title } => {
                let mut input = NewItem::titled(title.as_str());
                input.project_id = project.project_id().map(str::to_string);
                self.tracker.create_item(input).await?;
                self.state.finish_task_add(project);
            }
            Effect::CreateSubItem {
                parent_id,
                project,
                title,
            } => {
                let mut input = NewItem::titled(title.as_str());
                input.parent_id = Some(parent_id.clone());
                input.project_id = project.project_id().map(str::to_string);
                self.tracker.create_item(input).await?;
                self.state.finish_sub_item_add(parent_id);
            }
            _ => {}
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tracker_core::model::{ProjectColor, ProjectScope};
    use tracker_core::records::RecordSet;
    use tracker_core::{MemoryStore, StaticAuth};

    use super::*;
    use crate::nav::tests::{item, project};
    use crate::nav::{parse_keys, Focus};

    fn session_over(store: Arc<MemoryStore>) -> Session {
        Session::new(Tracker::new(store, Arc::new(StaticAuth::signed_in("user-1"))))
    }

    fn seeded() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::from_records(RecordSet {
            items: vec![item("i", None, Some("p1"), 1)],
            projects: vec![project("p1", 1)],
        }))
    }

    async fn press_all(session: &mut Session, keys: &str) -> Result<(), MutationError> {
        for key in parse_keys(keys).unwrap() {
            session.press(key).await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn load_focuses_create_project() {
        let mut session = session_over(seeded());
        session.load().await.unwrap();
        assert_eq!(session.state().focus(), &Focus::CreateProject);
        assert_eq!(session.entries().len(), 2);
    }

    #[tokio::test]
    async fn typed_project_is_created_with_its_color() {
        let store = seeded();
        let mut session = session_over(store.clone());
        session.load().await.unwrap();

        press_all(&mut session, "text:Errands,tab,tab,enter")
            .await
            .unwrap();

        let created = session
            .tracker()
            .projects()
            .into_iter()
            .find(|project| project.title == "Errands")
            .unwrap();
        assert_eq!(created.color, ProjectColor::Purple);
        assert_eq!(session.state().project_form().draft(), "");
        assert_eq!(store.snapshot().projects.len(), 2);
    }

    #[tokio::test]
    async fn sub_item_lands_under_its_parent() {
        let mut session = session_over(seeded());
        session.load().await.unwrap();
        press_all(&mut session, "down,enter,down,s,text:buy milk,enter")
            .await
            .unwrap();

        let child = session
            .tracker()
            .items()
            .into_iter()
            .find(|item| item.title == "buy milk")
            .unwrap();
        assert_eq!(child.parent_id.as_deref(), Some("i"));
        assert_eq!(child.project_id.as_deref(), Some("p1"));
        assert_eq!(session.state().adding_sub_item(), None);
        assert_eq!(session.state().sub_item_draft("i"), None);
        assert_eq!(
            session.entries().last(),
            Some(&FocusableEntry::Item {
                id: child.id.clone(),
                project: ProjectScope::Project("p1".into()),
                depth: 1,
            })
        );
    }

    #[tokio::test]
    async fn failed_create_keeps_the_draft() {
        let store = seeded();
        let mut session = session_over(store.clone());
        session.load().await.unwrap();
        press_all(&mut session, "down,t,text:Call mom").await.unwrap();

        store.fail_next_write();
        let err = session.press(Key::Enter).await.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(session.state().task_draft(), "Call mom");
        assert_eq!(
            session.state().adding_task(),
            Some(&ProjectScope::Project("p1".into()))
        );
        assert_eq!(session.tracker().items().len(), 1);

        session.press(Key::Enter).await.unwrap();
        assert_eq!(session.state().adding_task(), None);
        assert_eq!(session.tracker().items().len(), 2);
    }
}
