use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use ulid::Ulid;

use crate::model::{Item, ItemPatch, NewItem, NewProject, Project, ProjectPatch};
use crate::records::RecordSet;
use crate::store::RemoteStore;

/// In-process [`RemoteStore`]. Assigns identities, positions and timestamps
/// the way a backend would, and can be told to fail or stall writes.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    latency: Option<Duration>,
}

#[derive(Debug, Default)]
struct MemoryState {
    items: Vec<Item>,
    projects: Vec<Project>,
    failing_writes: usize,
    list_calls: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: RecordSet) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                items: records.items,
                projects: records.projects,
                ..MemoryState::default()
            }),
            latency: None,
        }
    }

    /// Every call waits this long before touching the data.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// The next write call is rejected.
    pub fn fail_next_write(&self) {
        self.state.lock().failing_writes += 1;
    }

    /// Number of list calls served so far.
    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }

    pub fn snapshot(&self) -> RecordSet {
        let state = self.state.lock();
        RecordSet {
            items: state.items.clone(),
            projects: state.projects.clone(),
        }
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn check_write(&self, action: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            bail!("{action} rejected by store");
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_items(&self, user_id: &str) -> Result<Vec<Item>> {
        self.delay().await;
        let mut state = self.state.lock();
        state.list_calls += 1;
        let mut items: Vec<Item> = state
            .items
            .iter()
            .filter(|item| item.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| item.position);
        Ok(items)
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        self.delay().await;
        let state = self.state.lock();
        Ok(state.items.iter().find(|item| item.id == id).cloned())
    }

    async fn create_item(&self, user_id: &str, input: &NewItem) -> Result<Item> {
        self.delay().await;
        self.check_write("create item")?;
        let mut state = self.state.lock();
        let position = state
            .items
            .iter()
            .filter(|item| item.user_id == user_id && item.parent_id == input.parent_id)
            .map(|item| item.position)
            .max()
            .unwrap_or(0)
            + 1;
        let item = input
            .clone()
            .into_item(Ulid::new().to_string(), user_id, position, Utc::now());
        state.items.push(item.clone());
        Ok(item)
    }

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Item> {
        self.delay().await;
        self.check_write("update item")?;
        let mut state = self.state.lock();
        let item = state
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| anyhow!("item {id} not found"))?;
        patch.apply_to(item, Utc::now());
        Ok(item.clone())
    }

    async fn delete_item(&self, id: &str) -> Result<()> {
        self.delay().await;
        self.check_write("delete item")?;
        let mut state = self.state.lock();
        if !state.items.iter().any(|item| item.id == id) {
            bail!("item {id} not found");
        }
        let mut doomed = vec![id.to_string()];
        let mut cursor = 0;
        while cursor < doomed.len() {
            let parent = doomed[cursor].clone();
            doomed.extend(
                state
                    .items
                    .iter()
                    .filter(|item| item.parent_id.as_deref() == Some(parent.as_str()))
                    .map(|item| item.id.clone()),
            );
            cursor += 1;
        }
        state.items.retain(|item| !doomed.contains(&item.id));
        Ok(())
    }

    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        self.delay().await;
        let mut state = self.state.lock();
        state.list_calls += 1;
        let mut projects: Vec<Project> = state
            .projects
            .iter()
            .filter(|project| project.user_id == user_id)
            .cloned()
            .collect();
        projects.sort_by_key(|project| project.position);
        Ok(projects)
    }

    async fn get_project(&self, id: &str) -> Result<Option<Project>> {
        self.delay().await;
        let state = self.state.lock();
        Ok(state.projects.iter().find(|project| project.id == id).cloned())
    }

    async fn create_project(&self, user_id: &str, input: &NewProject) -> Result<Project> {
        self.delay().await;
        self.check_write("create project")?;
        let mut state = self.state.lock();
        let position = state
            .projects
            .iter()
            .filter(|project| project.user_id == user_id)
            .map(|project| project.position)
            .max()
            .unwrap_or(0)
            + 1;
        let project = input
            .clone()
            .into_project(Ulid::new().to_string(), user_id, position, Utc::now());
        state.projects.push(project.clone());
        Ok(project)
    }

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Project> {
        self.delay().await;
        self.check_write("update project")?;
        let mut state = self.state.lock();
        let project = state
            .projects
            .iter_mut()
            .find(|project| project.id == id)
            .ok_or_else(|| anyhow!("project {id} not found"))?;
        patch.apply_to(project, Utc::now());
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> Result<()> {
        self.delay().await;
        self.check_write("delete project")?;
        let mut state = self.state.lock();
        let before = state.projects.len();
        state.projects.retain(|project| project.id != id);
        if state.projects.len() == before {
            bail!("project {id} not found");
        }
        for item in state
            .items
            .iter_mut()
            .filter(|item| item.project_id.as_deref() == Some(id))
        {
            item.project_id = None;
        }
        Ok(())
    }
}
