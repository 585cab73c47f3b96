//! Builds a navigable forest out of a flat, parent-referencing item set.
//!
//! Nodes live in an arena and refer to each other by index, so the forest is
//! plain owned data. Siblings are ordered by `position`; positions are not
//! unique and ties keep the order in which the items were supplied (stable
//! sort). A parent reference that does not resolve inside the supplied set
//! makes the item a root.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::model::{Item, ProjectScope};

pub type NodeIndex = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemNode {
    pub item: Item,
    pub parent: Option<NodeIndex>,
    pub children: Vec<NodeIndex>,
    pub depth: usize,
}

impl ItemNode {
    pub fn id(&self) -> &str {
        &self.item.id
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemForest {
    nodes: Vec<ItemNode>,
    roots: Vec<NodeIndex>,
    by_id: HashMap<String, NodeIndex>,
}

/// Build the forest for exactly the supplied items. Callers wanting one
/// project's tree pre-filter with [`items_in_scope`].
pub fn build_forest<'a, I>(items: I) -> ItemForest
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut nodes: Vec<ItemNode> = Vec::new();
    let mut by_id: HashMap<String, NodeIndex> = HashMap::new();
    for item in items {
        if by_id.contains_key(&item.id) {
            continue;
        }
        by_id.insert(item.id.clone(), nodes.len());
        nodes.push(ItemNode {
            item: item.clone(),
            parent: None,
            children: Vec::new(),
            depth: 0,
        });
    }

    for idx in 0..nodes.len() {
        let parent = nodes[idx]
            .item
            .parent_id
            .as_deref()
            .and_then(|parent_id| by_id.get(parent_id).copied())
            .filter(|parent| *parent != idx);
        nodes[idx].parent = parent;
    }

    break_cycles(&mut nodes);

    let mut roots = Vec::new();
    for idx in 0..nodes.len() {
        match nodes[idx].parent {
            Some(parent) => nodes[parent].children.push(idx),
            None => roots.push(idx),
        }
    }

    sort_by_position(&nodes, &mut roots);
    for idx in 0..nodes.len() {
        let mut children = std::mem::take(&mut nodes[idx].children);
        sort_by_position(&nodes, &mut children);
        nodes[idx].children = children;
    }

    let mut forest = ItemForest {
        nodes,
        roots,
        by_id,
    };
    forest.assign_depths();
    forest
}

/// Items whose project reference matches `scope`.
pub fn items_in_scope<'a>(items: &'a [Item], scope: &ProjectScope) -> Vec<&'a Item> {
    items.iter().filter(|item| scope.contains(item)).collect()
}

/// A parent chain that loops back on itself has no root; detach the
/// first-supplied member of each loop so it becomes one.
fn break_cycles(nodes: &mut [ItemNode]) {
    let mut settled: HashSet<NodeIndex> = HashSet::new();
    for start in 0..nodes.len() {
        let mut path: Vec<NodeIndex> = Vec::new();
        let mut on_path: HashSet<NodeIndex> = HashSet::new();
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            if settled.contains(&idx) {
                break;
            }
            if !on_path.insert(idx) {
                let loop_start = path.iter().position(|n| *n == idx).unwrap_or(0);
                let breaker = path[loop_start..].iter().copied().min().unwrap_or(idx);
                warn!(
                    item_id = nodes[breaker].item.id.as_str(),
                    "parent references form a cycle; promoting item to root"
                );
                nodes[breaker].parent = None;
                break;
            }
            path.push(idx);
            cursor = nodes[idx].parent;
        }
        settled.extend(path);
    }
}

fn sort_by_position(nodes: &[ItemNode], indices: &mut [NodeIndex]) {
    indices.sort_by_key(|idx| nodes[*idx].item.position);
}

impl ItemForest {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ItemNode> + '_ {
        self.roots.iter().map(move |idx| &self.nodes[*idx])
    }

    pub fn root_indices(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ItemNode> {
        self.nodes.get(idx)
    }

    pub fn get(&self, id: &str) -> Option<&ItemNode> {
        self.by_id.get(id).map(|idx| &self.nodes[*idx])
    }

    pub fn children<'a>(&'a self, node: &'a ItemNode) -> impl Iterator<Item = &'a ItemNode> + 'a {
        node.children.iter().map(move |idx| &self.nodes[*idx])
    }

    pub fn parent(&self, node: &ItemNode) -> Option<&ItemNode> {
        node.parent.map(|idx| &self.nodes[idx])
    }

    /// Depth-first pre-order traversal of the whole forest.
    pub fn flatten(&self) -> Vec<&ItemNode> {
        self.walk(|_| true)
    }

    /// Pre-order traversal that only descends into nodes whose id is in
    /// `expanded`; roots are always visible.
    pub fn visible(&self, expanded: &HashSet<String>) -> Vec<&ItemNode> {
        self.walk(|node| expanded.contains(node.id()))
    }

    fn walk<F>(&self, descend: F) -> Vec<&ItemNode>
    where
        F: Fn(&ItemNode) -> bool,
    {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeIndex> = self.roots.iter().rev().copied().collect();
        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx];
            out.push(node);
            if descend(node) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        out
    }

    fn assign_depths(&mut self) {
        let mut stack: Vec<(NodeIndex, usize)> = self.roots.iter().map(|idx| (*idx, 0)).collect();
        while let Some((idx, depth)) = stack.pop() {
            self.nodes[idx].depth = depth;
            for child in &self.nodes[idx].children {
                stack.push((*child, depth + 1));
            }
        }
    }
}
