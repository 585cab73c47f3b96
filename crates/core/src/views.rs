//! Read-only projections over the item set used by the board, calendar and
//! projects views.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::model::{Item, ItemStatus, ProjectScope};
use crate::tree::build_forest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardCard<'a> {
    pub item: &'a Item,
    pub child_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardColumn<'a> {
    pub status: ItemStatus,
    pub cards: Vec<BoardCard<'a>>,
}

/// Root items split into one column per status, in board order. Roots are
/// taken from the built forest, so an item whose parent is missing from the
/// set still gets a card.
pub fn board_columns(items: &[Item]) -> Vec<BoardColumn<'_>> {
    let forest = build_forest(items);
    let originals = first_by_id(items);
    let cards: Vec<BoardCard<'_>> = forest
        .roots()
        .filter_map(|node| {
            originals.get(node.id()).map(|item| BoardCard {
                item: *item,
                child_count: node.children.len(),
            })
        })
        .collect();

    ItemStatus::ORDER
        .iter()
        .map(|status| BoardColumn {
            status: *status,
            cards: cards
                .iter()
                .filter(|card| card.item.status == *status)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Items with a due date, keyed by that date.
pub fn calendar_days(items: &[Item]) -> BTreeMap<NaiveDate, Vec<&Item>> {
    let mut days: BTreeMap<NaiveDate, Vec<&Item>> = BTreeMap::new();
    for item in items {
        if let Some(due) = item.due_date {
            days.entry(due).or_default().push(item);
        }
    }
    for entries in days.values_mut() {
        entries.sort_by_key(|item| item.position);
    }
    days
}

/// Root items grouped by the project bucket they belong to. Each bucket's
/// roots come from that bucket's own forest.
pub fn root_items_by_scope(items: &[Item]) -> BTreeMap<ProjectScope, Vec<&Item>> {
    let mut buckets: BTreeMap<ProjectScope, Vec<&Item>> = BTreeMap::new();
    for item in items {
        buckets.entry(item.scope()).or_default().push(item);
    }

    let mut groups: BTreeMap<ProjectScope, Vec<&Item>> = BTreeMap::new();
    for (scope, members) in buckets {
        let forest = build_forest(members.iter().copied());
        let originals = first_by_id(members.iter().copied());
        let roots: Vec<&Item> = forest
            .roots()
            .filter_map(|node| originals.get(node.id()).copied())
            .collect();
        if !roots.is_empty() {
            groups.insert(scope, roots);
        }
    }
    groups
}

fn first_by_id<'a, I>(items: I) -> HashMap<&'a str, &'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut by_id: HashMap<&str, &Item> = HashMap::new();
    for item in items {
        by_id.entry(item.id.as_str()).or_insert(item);
    }
    by_id
}
