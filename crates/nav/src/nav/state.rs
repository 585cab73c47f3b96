use std::collections::HashMap;

use tracing::trace;
use tracker_core::model::{Item, Project, ProjectColor, ProjectScope};

use super::buffer::TextBuffer;
use super::entries::{build_entries, Expansion, FocusableEntry};
use super::{Effect, Focus};

/// The open detail panel and the focus to return to when it closes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPanel {
    pub item_id: String,
    pub restore: Focus,
}

/// The create-project form at the top of the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectForm {
    draft: TextBuffer,
    color: ProjectColor,
    active: bool,
}

impl ProjectForm {
    pub fn draft(&self) -> &str {
        self.draft.as_str()
    }

    pub fn color(&self) -> ProjectColor {
        self.color
    }

    /// Whether the form's title field holds keyboard input.
    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SubItemAdd {
    parent_id: String,
    project: ProjectScope,
}

/// The text field that currently receives typed characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextTarget {
    CreateProject,
    Task(ProjectScope),
    SubItem(String),
}

/// Focus, expansion, detail panel and inline forms of one project view.
/// Every change goes through a named method; [`NavigationState::handle_key`]
/// only dispatches to them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    focus: Focus,
    expansion: Expansion,
    detail: Option<DetailPanel>,
    adding_sub_item: Option<SubItemAdd>,
    sub_item_drafts: HashMap<String, TextBuffer>,
    adding_task: Option<ProjectScope>,
    task_draft: TextBuffer,
    project_form: ProjectForm,
}

impl NavigationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    pub fn expansion(&self) -> &Expansion {
        &self.expansion
    }

    pub fn detail(&self) -> Option<&DetailPanel> {
        self.detail.as_ref()
    }

    pub fn is_detail_open(&self) -> bool {
        self.detail.is_some()
    }

    pub fn adding_sub_item(&self) -> Option<&str> {
        self.adding_sub_item
            .as_ref()
            .map(|adding| adding.parent_id.as_str())
    }

    pub fn sub_item_draft(&self, item_id: &str) -> Option<&str> {
        self.sub_item_drafts.get(item_id).map(TextBuffer::as_str)
    }

    pub fn adding_task(&self) -> Option<&ProjectScope> {
        self.adding_task.as_ref()
    }

    pub fn task_draft(&self) -> &str {
        self.task_draft.as_str()
    }

    pub fn project_form(&self) -> &ProjectForm {
        &self.project_form
    }

    pub fn text_target(&self) -> Option<TextTarget> {
        if let Some(adding) = &self.adding_sub_item {
            return Some(TextTarget::SubItem(adding.parent_id.clone()));
        }
        if let Some(scope) = &self.adding_task {
            return Some(TextTarget::Task(scope.clone()));
        }
        self.project_form
            .active
            .then_some(TextTarget::CreateProject)
    }

    /// The focusable sequence for these records under the current expansion.
    pub fn entries(&self, projects: &[Project], items: &[Item]) -> Vec<FocusableEntry> {
        build_entries(projects, items, &self.expansion)
    }

    /// Index of the focused entry in `entries`, if it is still there.
    pub fn position(&self, entries: &[FocusableEntry]) -> Option<usize> {
        entries
            .iter()
            .position(|entry| entry.is_focused_by(&self.focus))
    }

    /// The row for adding a sub-item under `item_id` is shown while the item
    /// is expanded and focused, and either being typed into or holding a
    /// draft.
    pub fn shows_sub_item_row(&self, item_id: &str) -> bool {
        if !self.expansion.item_expanded(item_id) || self.focus.item_id() != Some(item_id) {
            return false;
        }
        self.adding_sub_item() == Some(item_id)
            || self
                .sub_item_drafts
                .get(item_id)
                .is_some_and(|draft| !draft.is_blank())
    }

    /// Focus the first entry when nothing is focused yet.
    pub fn sync(&mut self, entries: &[FocusableEntry]) -> Vec<Effect> {
        match entries.first() {
            Some(first) if self.focus.is_unfocused() => self.land_on(first),
            _ => Vec::new(),
        }
    }

    /// One entry down; past the last entry wraps to the create-project
    /// affordance. From no focus the cursor counts as sitting on it.
    pub fn move_down(&mut self, entries: &[FocusableEntry]) -> Vec<Effect> {
        let mut effects = self.blur_inputs();
        if entries.is_empty() {
            return effects;
        }
        let current = self.position(entries).unwrap_or(0);
        let next = (current + 1) % entries.len();
        effects.extend(self.land_on(&entries[next]));
        effects
    }

    /// One entry up, clamped at the create-project affordance.
    pub fn move_up(&mut self, entries: &[FocusableEntry]) -> Vec<Effect> {
        let mut effects = self.blur_inputs();
        if entries.is_empty() {
            return effects;
        }
        let previous = self
            .position(entries)
            .map_or(0, |current| current.saturating_sub(1));
        effects.extend(self.land_on(&entries[previous]));
        effects
    }

    /// Toggle the focused item, else the focused project; on the
    /// create-project affordance, take its title field.
    pub fn confirm(&mut self) -> Vec<Effect> {
        match self.focus.clone() {
            Focus::Item { id, .. } => self.toggle_item_expanded(&id),
            Focus::Project(scope) => self.toggle_project_expanded(&scope),
            Focus::CreateProject => self.activate_create_input(),
            Focus::Unfocused => Vec::new(),
        }
    }

    pub fn toggle_item_expanded(&mut self, id: &str) -> Vec<Effect> {
        let expanded = self.expansion.toggle_item(id);
        vec![Effect::ItemToggled {
            id: id.to_string(),
            expanded,
        }]
    }

    pub fn toggle_project_expanded(&mut self, scope: &ProjectScope) -> Vec<Effect> {
        let expanded = self.expansion.toggle_project(scope);
        vec![Effect::ProjectToggled {
            scope: scope.clone(),
            expanded,
        }]
    }

    pub fn expand_item(&mut self, id: &str) {
        self.expansion.expand_item(id);
    }

    pub fn collapse_item(&mut self, id: &str) {
        self.expansion.collapse_item(id);
    }

    pub fn expand_project(&mut self, scope: &ProjectScope) {
        self.expansion.expand_project(scope);
    }

    pub fn collapse_project(&mut self, scope: &ProjectScope) {
        self.expansion.collapse_project(scope);
    }

    /// Open the detail panel for the focused item, remembering the focus.
    pub fn open_detail(&mut self) -> Vec<Effect> {
        let Some(item_id) = self.focus.item_id().map(str::to_string) else {
            return Vec::new();
        };
        self.detail = Some(DetailPanel {
            item_id: item_id.clone(),
            restore: self.focus.clone(),
        });
        vec![Effect::DetailOpened(item_id)]
    }

    /// Close the detail panel and put the focus back where it was when the
    /// panel opened.
    pub fn close_detail(&mut self) -> Vec<Effect> {
        let Some(panel) = self.detail.take() else {
            return Vec::new();
        };
        let mut effects = vec![Effect::DetailClosed];
        if self.focus != panel.restore {
            self.set_focus(panel.restore);
            effects.push(Effect::FocusChanged(self.focus.clone()));
        }
        effects
    }

    /// Start typing a sub-item under the focused item. The item is expanded
    /// so the row is visible, and an earlier draft for it is kept.
    pub fn start_sub_item_add(&mut self) -> Vec<Effect> {
        let Focus::Item { id, project } = self.focus.clone() else {
            return Vec::new();
        };
        let mut effects = self.blur_inputs();
        if !self.expansion.item_expanded(&id) {
            effects.extend(self.toggle_item_expanded(&id));
        }
        self.sub_item_drafts.entry(id.clone()).or_default();
        self.adding_sub_item = Some(SubItemAdd {
            parent_id: id.clone(),
            project,
        });
        effects.push(Effect::SubItemAddStarted(id));
        effects
    }

    /// Start typing a task in the focused bucket with an empty draft.
    pub fn start_task_add(&mut self) -> Vec<Effect> {
        let Some(scope) = self.focus.project().cloned() else {
            return Vec::new();
        };
        let mut effects = self.blur_inputs();
        self.task_draft.clear();
        self.adding_task = Some(scope.clone());
        effects.push(Effect::TaskAddStarted(scope));
        effects
    }

    pub fn activate_create_input(&mut self) -> Vec<Effect> {
        if !self.focus.is_create_project() || self.project_form.active {
            return Vec::new();
        }
        self.project_form.active = true;
        vec![Effect::CreateInputActive(true)]
    }

    pub fn release_create_input(&mut self) -> Vec<Effect> {
        if !self.project_form.active {
            return Vec::new();
        }
        self.project_form.active = false;
        vec![Effect::CreateInputActive(false)]
    }

    pub fn select_project_color(&mut self, color: ProjectColor) {
        self.project_form.color = color;
    }

    pub fn cycle_project_color(&mut self) {
        let all = ProjectColor::ALL;
        let current = all
            .iter()
            .position(|color| *color == self.project_form.color)
            .unwrap_or(0);
        self.project_form.color = all[(current + 1) % all.len()];
    }

    /// Mutable draft of the active text field.
    pub fn active_draft_mut(&mut self) -> Option<&mut TextBuffer> {
        match self.text_target()? {
            TextTarget::SubItem(id) => Some(self.sub_item_drafts.entry(id).or_default()),
            TextTarget::Task(_) => Some(&mut self.task_draft),
            TextTarget::CreateProject => Some(&mut self.project_form.draft),
        }
    }

    pub fn type_char(&mut self, ch: char) {
        if let Some(draft) = self.active_draft_mut() {
            draft.insert_char(ch);
        }
    }

    pub fn type_str(&mut self, text: &str) {
        if let Some(draft) = self.active_draft_mut() {
            draft.insert_str(text);
        }
    }

    pub fn backspace(&mut self) {
        if let Some(draft) = self.active_draft_mut() {
            draft.backspace();
        }
    }

    /// Submit the active field. A blank draft is a silent no-op; otherwise
    /// the create request is returned and the draft stays until the matching
    /// `finish_*` call reports success.
    pub fn submit(&mut self) -> Vec<Effect> {
        let Some(target) = self.text_target() else {
            return Vec::new();
        };
        let effect = match target {
            TextTarget::SubItem(parent_id) => {
                let Some(adding) = self.adding_sub_item.clone() else {
                    return Vec::new();
                };
                self.sub_item_drafts
                    .get(&parent_id)
                    .and_then(TextBuffer::submission)
                    .map(|title| Effect::CreateSubItem {
                        parent_id,
                        project: adding.project,
                        title,
                    })
            }
            TextTarget::Task(project) => self
                .task_draft
                .submission()
                .map(|title| Effect::CreateTask { project, title }),
            TextTarget::CreateProject => {
                self.project_form
                    .draft
                    .submission()
                    .map(|title| Effect::CreateProject {
                        title,
                        color: self.project_form.color,
                    })
            }
        };
        effect.into_iter().collect()
    }

    /// Leave the active field. A sub-item draft survives unless it is blank;
    /// the task draft is dropped; the project title is kept.
    pub fn cancel(&mut self) -> Vec<Effect> {
        match self.text_target() {
            Some(TextTarget::SubItem(parent_id)) => {
                self.adding_sub_item = None;
                if self
                    .sub_item_drafts
                    .get(&parent_id)
                    .is_some_and(TextBuffer::is_blank)
                {
                    self.sub_item_drafts.remove(&parent_id);
                }
                vec![Effect::SubItemAddClosed(parent_id)]
            }
            Some(TextTarget::Task(scope)) => {
                self.adding_task = None;
                self.task_draft.clear();
                vec![Effect::TaskAddClosed(scope)]
            }
            Some(TextTarget::CreateProject) => self.release_create_input(),
            None => Vec::new(),
        }
    }

    /// Cancel the active field, or else close the detail panel.
    pub fn escape(&mut self) -> Vec<Effect> {
        if self.text_target().is_some() {
            return self.cancel();
        }
        self.close_detail()
    }

    /// The sub-item under `parent_id` was created.
    pub fn finish_sub_item_add(&mut self, parent_id: &str) {
        self.sub_item_drafts.remove(parent_id);
        if self.adding_sub_item() == Some(parent_id) {
            self.adding_sub_item = None;
        }
    }

    /// The task typed into `scope` was created.
    pub fn finish_task_add(&mut self, scope: &ProjectScope) {
        self.task_draft.clear();
        if self.adding_task.as_ref() == Some(scope) {
            self.adding_task = None;
        }
    }

    /// The project typed into the form was created.
    pub fn finish_create_project(&mut self) {
        self.project_form.draft.clear();
    }

    pub fn hover_create_project(&mut self) -> Vec<Effect> {
        self.hover(Focus::CreateProject)
    }

    pub fn hover_project(&mut self, scope: ProjectScope) -> Vec<Effect> {
        self.hover(Focus::Project(scope))
    }

    pub fn hover_item(&mut self, id: String, project: ProjectScope) -> Vec<Effect> {
        self.hover(Focus::Item { id, project })
    }

    /// Hover moves the same cursor as the keyboard but never takes the
    /// create-project field.
    fn hover(&mut self, focus: Focus) -> Vec<Effect> {
        if self.focus == focus {
            return Vec::new();
        }
        let mut effects = Vec::new();
        if !focus.is_create_project() {
            effects.extend(self.release_create_input());
        }
        self.set_focus(focus);
        effects.push(Effect::FocusChanged(self.focus.clone()));
        effects
    }

    /// Keyboard arrival on an entry; the create-project field takes input
    /// as soon as the cursor reaches it.
    fn land_on(&mut self, entry: &FocusableEntry) -> Vec<Effect> {
        let focus = entry.focus();
        let mut effects = Vec::new();
        if self.focus != focus {
            self.set_focus(focus);
            effects.push(Effect::FocusChanged(self.focus.clone()));
        }
        effects.extend(self.activate_create_input());
        effects
    }

    fn set_focus(&mut self, focus: Focus) {
        trace!(?focus, "focus moved");
        if !focus.is_create_project() {
            self.project_form.active = false;
        }
        self.focus = focus;
    }

    /// Close the inline add rows ahead of a cursor move. Drafts are kept.
    fn blur_inputs(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(adding) = self.adding_sub_item.take() {
            effects.push(Effect::SubItemAddClosed(adding.parent_id));
        }
        if let Some(scope) = self.adding_task.take() {
            effects.push(Effect::TaskAddClosed(scope));
        }
        effects.extend(self.release_create_input());
        effects
    }
}
