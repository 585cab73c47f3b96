//! Keyboard focus over the project view.
//!
//! The state machine never renders anything. It consumes [`Key`]s against
//! the current [`FocusableEntry`] sequence and reports what changed as
//! [`Effect`]s; create requests are carried out by [`crate::session`].

mod buffer;
mod entries;
mod input;
mod state;

use tracker_core::model::{ProjectColor, ProjectScope};

pub use buffer::TextBuffer;
pub use entries::{build_entries, Expansion, FocusableEntry};
pub use input::{parse_keys, Key};
pub use state::{DetailPanel, NavigationState, ProjectForm, TextTarget};

/// Where the single cursor sits. A focused item keeps its enclosing bucket
/// so project-level actions stay addressable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Focus {
    #[default]
    Unfocused,
    CreateProject,
    Project(ProjectScope),
    Item {
        id: String,
        project: ProjectScope,
    },
}

impl Focus {
    pub fn item_id(&self) -> Option<&str> {
        match self {
            Focus::Item { id, .. } => Some(id.as_str()),
            _ => None,
        }
    }

    /// The bucket the cursor is in, whether on the project row or inside it.
    pub fn project(&self) -> Option<&ProjectScope> {
        match self {
            Focus::Project(scope) | Focus::Item { project: scope, .. } => Some(scope),
            _ => None,
        }
    }

    pub fn is_create_project(&self) -> bool {
        matches!(self, Focus::CreateProject)
    }

    pub fn is_unfocused(&self) -> bool {
        matches!(self, Focus::Unfocused)
    }
}

/// Observable outcome of a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FocusChanged(Focus),
    ItemToggled { id: String, expanded: bool },
    ProjectToggled { scope: ProjectScope, expanded: bool },
    DetailOpened(String),
    DetailClosed,
    CreateInputActive(bool),
    SubItemAddStarted(String),
    SubItemAddClosed(String),
    TaskAddStarted(ProjectScope),
    TaskAddClosed(ProjectScope),
    CreateProject {
        title: String,
        color: ProjectColor,
    },
    CreateTask {
        project: ProjectScope,
        title: String,
    },
    CreateSubItem {
        parent_id: String,
        project: ProjectScope,
        title: String,
    },
}

impl Effect {
    /// Whether the effect asks for a record to be written.
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Effect::CreateProject { .. } | Effect::CreateTask { .. } | Effect::CreateSubItem { .. }
        )
    }
}

/// `(state, key) -> (state, effects)` without touching the input state.
pub fn transition(
    state: &NavigationState,
    key: Key,
    entries: &[FocusableEntry],
) -> (NavigationState, Vec<Effect>) {
    let mut next = state.clone();
    let effects = next.handle_key(key, entries);
    (next, effects)
}
