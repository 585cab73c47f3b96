use std::collections::HashSet;

use tracker_core::model::{Item, Project, ProjectScope};
use tracker_core::tree::{build_forest, items_in_scope};

use super::Focus;

/// One stop of the keyboard cursor. Rebuilt from the records and the
/// expansion flags on every read; nothing holds on to these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FocusableEntry {
    CreateProject,
    Project(ProjectScope),
    Item {
        id: String,
        project: ProjectScope,
        depth: usize,
    },
}

impl FocusableEntry {
    /// The focus state that lands on this entry.
    pub fn focus(&self) -> Focus {
        match self {
            FocusableEntry::CreateProject => Focus::CreateProject,
            FocusableEntry::Project(scope) => Focus::Project(scope.clone()),
            FocusableEntry::Item { id, project, .. } => Focus::Item {
                id: id.clone(),
                project: project.clone(),
            },
        }
    }

    pub fn is_focused_by(&self, focus: &Focus) -> bool {
        match (self, focus) {
            (FocusableEntry::CreateProject, Focus::CreateProject) => true,
            (FocusableEntry::Project(scope), Focus::Project(focused)) => scope == focused,
            (FocusableEntry::Item { id, .. }, Focus::Item { id: focused, .. }) => id == focused,
            _ => false,
        }
    }
}

/// Expanded/collapsed flags for items and project buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    items: HashSet<String>,
    projects: HashSet<ProjectScope>,
}

impl Expansion {
    pub fn item_expanded(&self, id: &str) -> bool {
        self.items.contains(id)
    }

    pub fn project_expanded(&self, scope: &ProjectScope) -> bool {
        self.projects.contains(scope)
    }

    pub fn expanded_items(&self) -> &HashSet<String> {
        &self.items
    }

    /// Flip the item's flag and return the new value.
    pub fn toggle_item(&mut self, id: &str) -> bool {
        if self.items.remove(id) {
            false
        } else {
            self.items.insert(id.to_string());
            true
        }
    }

    pub fn expand_item(&mut self, id: &str) {
        self.items.insert(id.to_string());
    }

    pub fn collapse_item(&mut self, id: &str) {
        self.items.remove(id);
    }

    pub fn toggle_project(&mut self, scope: &ProjectScope) -> bool {
        if self.projects.remove(scope) {
            false
        } else {
            self.projects.insert(scope.clone());
            true
        }
    }

    pub fn expand_project(&mut self, scope: &ProjectScope) {
        self.projects.insert(scope.clone());
    }

    pub fn collapse_project(&mut self, scope: &ProjectScope) {
        self.projects.remove(scope);
    }
}

/// Linearize the project view: the create-project affordance, then every
/// project followed by its visible items when expanded, then the unassigned
/// bucket when any item falls in it.
pub fn build_entries(
    projects: &[Project],
    items: &[Item],
    expansion: &Expansion,
) -> Vec<FocusableEntry> {
    let mut entries = vec![FocusableEntry::CreateProject];

    let mut ordered: Vec<&Project> = projects.iter().collect();
    ordered.sort_by_key(|project| project.position);
    for project in ordered {
        let scope = ProjectScope::Project(project.id.clone());
        push_scope(&mut entries, items, expansion, scope);
    }

    let unassigned = build_forest(items_in_scope(items, &ProjectScope::Unassigned));
    if unassigned.roots().next().is_some() {
        push_scope(&mut entries, items, expansion, ProjectScope::Unassigned);
    }

    entries
}

fn push_scope(
    entries: &mut Vec<FocusableEntry>,
    items: &[Item],
    expansion: &Expansion,
    scope: ProjectScope,
) {
    let expanded = expansion.project_expanded(&scope);
    entries.push(FocusableEntry::Project(scope.clone()));
    if !expanded {
        return;
    }
    let forest = build_forest(items_in_scope(items, &scope));
    for node in forest.visible(expansion.expanded_items()) {
        entries.push(FocusableEntry::Item {
            id: node.id().to_string(),
            project: scope.clone(),
            depth: node.depth,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::tests::{item, project};
    use pretty_assertions::assert_eq;

    fn ids(entries: &[FocusableEntry]) -> Vec<String> {
        entries
            .iter()
            .map(|entry| match entry {
                FocusableEntry::CreateProject => "+".to_string(),
                FocusableEntry::Project(scope) => format!("[{scope}]"),
                FocusableEntry::Item { id, depth, .. } => format!("{}{id}", "  ".repeat(*depth)),
            })
            .collect()
    }

    #[test]
    fn collapsed_projects_hide_their_items() {
        let projects = vec![project("p2", 2), project("p1", 1)];
        let items = vec![item("a", None, Some("p1"), 1)];
        let entries = build_entries(&projects, &items, &Expansion::default());
        assert_eq!(ids(&entries), vec!["+", "[p1]", "[p2]"]);
    }

    #[test]
    fn expanded_tree_follows_item_flags() {
        let projects = vec![project("p1", 1)];
        let items = vec![
            item("a", None, Some("p1"), 1),
            item("a1", Some("a"), Some("p1"), 1),
            item("b", None, Some("p1"), 2),
        ];
        let mut expansion = Expansion::default();
        expansion.expand_project(&ProjectScope::Project("p1".into()));
        assert_eq!(
            ids(&build_entries(&projects, &items, &expansion)),
            vec!["+", "[p1]", "a", "b"]
        );

        expansion.expand_item("a");
        assert_eq!(
            ids(&build_entries(&projects, &items, &expansion)),
            vec!["+", "[p1]", "a", "  a1", "b"]
        );
    }

    #[test]
    fn unassigned_bucket_lists_loose_items() {
        let items = vec![item("a", None, None, 1)];
        let mut expansion = Expansion::default();
        expansion.expand_project(&ProjectScope::Unassigned);
        let entries = build_entries(&[], &items, &expansion);
        assert_eq!(ids(&entries), vec!["+", "[unassigned]", "a"]);
        assert_eq!(
            entries[2].focus(),
            Focus::Item {
                id: "a".into(),
                project: ProjectScope::Unassigned
            }
        );

        assert_eq!(ids(&build_entries(&[], &[], &expansion)), vec!["+"]);
    }

    #[test]
    fn item_with_missing_parent_is_reachable() {
        let items = vec![
            item("orphan", Some("gone"), None, 1),
            item("kid", Some("orphan"), None, 1),
        ];
        let mut expansion = Expansion::default();
        expansion.expand_project(&ProjectScope::Unassigned);
        let entries = build_entries(&[], &items, &expansion);
        assert_eq!(ids(&entries), vec!["+", "[unassigned]", "orphan"]);
        assert!(entries[2].is_focused_by(&Focus::Item {
            id: "orphan".into(),
            project: ProjectScope::Unassigned,
        }));

        expansion.expand_item("orphan");
        let entries = build_entries(&[], &items, &expansion);
        assert_eq!(ids(&entries), vec!["+", "[unassigned]", "orphan", "  kid"]);
    }

    #[test]
    fn toggles_report_new_state() {
        let mut expansion = Expansion::default();
        assert!(expansion.toggle_item("a"));
        assert!(!expansion.toggle_item("a"));
        assert!(expansion.toggle_project(&ProjectScope::Unassigned));
        expansion.collapse_project(&ProjectScope::Unassigned);
        assert!(!expansion.project_expanded(&ProjectScope::Unassigned));
    }
}
