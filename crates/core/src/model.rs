use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Todo,
    InProgress,
    Done,
    Archived,
}

impl ItemStatus {
    /// Board column order.
    pub const ORDER: [ItemStatus; 4] = [
        ItemStatus::Todo,
        ItemStatus::InProgress,
        ItemStatus::Done,
        ItemStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Todo => "todo",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Done => "done",
            ItemStatus::Archived => "archived",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemStatus::Todo => "To Do",
            ItemStatus::InProgress => "In Progress",
            ItemStatus::Done => "Done",
            ItemStatus::Archived => "Archived",
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "todo" => Ok(ItemStatus::Todo),
            "in_progress" | "in-progress" => Ok(ItemStatus::InProgress),
            "done" => Ok(ItemStatus::Done),
            "archived" => Ok(ItemStatus::Archived),
            other => Err(anyhow!(
                "Unknown status '{}': expected todo|in_progress|done|archived",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ItemPriority {
    #[default]
    None,
    Low,
    Medium,
    High,
    Urgent,
}

impl ItemPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemPriority::None => "none",
            ItemPriority::Low => "low",
            ItemPriority::Medium => "medium",
            ItemPriority::High => "high",
            ItemPriority::Urgent => "urgent",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItemPriority::None => "None",
            ItemPriority::Low => "Low",
            ItemPriority::Medium => "Medium",
            ItemPriority::High => "High",
            ItemPriority::Urgent => "Urgent",
        }
    }
}

impl fmt::Display for ItemPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItemPriority {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(ItemPriority::None),
            "low" => Ok(ItemPriority::Low),
            "medium" | "med" => Ok(ItemPriority::Medium),
            "high" => Ok(ItemPriority::High),
            "urgent" => Ok(ItemPriority::Urgent),
            other => Err(anyhow!(
                "Unknown priority '{}': expected none|low|medium|high|urgent",
                other
            )),
        }
    }
}

/// Presentation-only project color.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProjectColor {
    Red,
    Orange,
    Yellow,
    Green,
    #[default]
    Blue,
    Indigo,
    Purple,
    Pink,
    Gray,
}

impl ProjectColor {
    pub const ALL: [ProjectColor; 9] = [
        ProjectColor::Red,
        ProjectColor::Orange,
        ProjectColor::Yellow,
        ProjectColor::Green,
        ProjectColor::Blue,
        ProjectColor::Indigo,
        ProjectColor::Purple,
        ProjectColor::Pink,
        ProjectColor::Gray,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectColor::Red => "red",
            ProjectColor::Orange => "orange",
            ProjectColor::Yellow => "yellow",
            ProjectColor::Green => "green",
            ProjectColor::Blue => "blue",
            ProjectColor::Indigo => "indigo",
            ProjectColor::Purple => "purple",
            ProjectColor::Pink => "pink",
            ProjectColor::Gray => "gray",
        }
    }
}

impl fmt::Display for ProjectColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProjectColor {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        ProjectColor::ALL
            .iter()
            .copied()
            .find(|color| color.as_str() == lowered || (lowered == "grey" && *color == ProjectColor::Gray))
            .ok_or_else(|| {
                anyhow!(
                    "Unknown color '{}': expected red|orange|yellow|green|blue|indigo|purple|pink|gray",
                    s
                )
            })
    }
}

/// Which project bucket an item belongs to. Items without a project
/// reference live in the synthetic unassigned bucket.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectScope {
    Project(String),
    Unassigned,
}

impl ProjectScope {
    pub const UNASSIGNED_KEY: &'static str = "unassigned";

    pub fn from_project_id(project_id: Option<&str>) -> Self {
        match project_id {
            Some(id) => ProjectScope::Project(id.to_string()),
            None => ProjectScope::Unassigned,
        }
    }

    /// The project reference an item in this scope carries.
    pub fn project_id(&self) -> Option<&str> {
        match self {
            ProjectScope::Project(id) => Some(id.as_str()),
            ProjectScope::Unassigned => None,
        }
    }

    pub fn contains(&self, item: &Item) -> bool {
        self.project_id() == item.project_id.as_deref()
    }

    pub fn key(&self) -> &str {
        self.project_id().unwrap_or(Self::UNASSIGNED_KEY)
    }
}

impl fmt::Display for ProjectScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub priority: ItemPriority,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    pub fn scope(&self) -> ProjectScope {
        ProjectScope::from_project_id(self.project_id.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub color: ProjectColor,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub position: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new item; unset fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    pub due_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
}

impl NewItem {
    pub fn titled<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build the record a store (or the optimistic cache) holds for this input.
    pub fn into_item(self, id: String, user_id: &str, position: i64, now: DateTime<Utc>) -> Item {
        let status = self.status.unwrap_or_default();
        Item {
            id,
            user_id: user_id.to_string(),
            parent_id: self.parent_id,
            project_id: self.project_id,
            title: self.title,
            description: self.description,
            status,
            priority: self.priority.unwrap_or_default(),
            due_date: self.due_date,
            start_date: self.start_date,
            completed_at: (status == ItemStatus::Done).then_some(now),
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of an item. `None` leaves a field untouched; for nullable
/// fields `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<String>>,
    pub project_id: Option<Option<String>>,
    pub status: Option<ItemStatus>,
    pub priority: Option<ItemPriority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub position: Option<i64>,
}

impl ItemPatch {
    pub fn status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn title<T: Into<String>>(title: T) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn touches_status(&self) -> bool {
        self.status.is_some()
    }

    /// Shallow-merge onto `item`, keeping `completed_at` in step with the
    /// status: stamped on entering `done`, cleared on any other status, left
    /// alone when the patch has no status.
    pub fn apply_to(&self, item: &mut Item, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            item.title = title.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            item.parent_id = parent_id.clone();
        }
        if let Some(project_id) = &self.project_id {
            item.project_id = project_id.clone();
        }
        if let Some(status) = self.status {
            item.completed_at = match status {
                ItemStatus::Done if item.status == ItemStatus::Done => item.completed_at.or(Some(now)),
                ItemStatus::Done => Some(now),
                _ => None,
            };
            item.status = status;
        }
        if let Some(priority) = self.priority {
            item.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            item.due_date = due_date;
        }
        if let Some(start_date) = self.start_date {
            item.start_date = start_date;
        }
        if let Some(position) = self.position {
            item.position = position;
        }
        item.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub description: Option<String>,
    pub color: Option<ProjectColor>,
    pub icon: Option<String>,
}

impl NewProject {
    pub fn titled<T: Into<String>>(title: T) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn into_project(
        self,
        id: String,
        user_id: &str,
        position: i64,
        now: DateTime<Utc>,
    ) -> Project {
        Project {
            id,
            user_id: user_id.to_string(),
            title: self.title,
            description: self.description,
            color: self.color.unwrap_or_default(),
            icon: self.icon,
            position,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub color: Option<ProjectColor>,
    pub icon: Option<Option<String>>,
    pub position: Option<i64>,
}

impl ProjectPatch {
    pub fn apply_to(&self, project: &mut Project, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            project.title = title.clone();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(color) = self.color {
            project.color = color;
        }
        if let Some(icon) = &self.icon {
            project.icon = icon.clone();
        }
        if let Some(position) = self.position {
            project.position = position;
        }
        project.updated_at = now;
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{at, item};
    use super::*;
    use rstest::rstest;

    #[test]
    fn status_round_trips_through_strings() {
        for status in ItemStatus::ORDER {
            assert_eq!(status.as_str().parse::<ItemStatus>().unwrap(), status);
        }
        assert!("someday".parse::<ItemStatus>().is_err());
    }

    #[rstest]
    #[case("in-progress", ItemStatus::InProgress)]
    #[case("DONE", ItemStatus::Done)]
    #[case("archived", ItemStatus::Archived)]
    fn status_accepts_aliases(#[case] raw: &str, #[case] expected: ItemStatus) {
        assert_eq!(raw.parse::<ItemStatus>().unwrap(), expected);
    }

    #[rstest]
    #[case("med", ItemPriority::Medium)]
    #[case("Urgent", ItemPriority::Urgent)]
    #[case("none", ItemPriority::None)]
    fn priority_accepts_aliases(#[case] raw: &str, #[case] expected: ItemPriority) {
        assert_eq!(raw.parse::<ItemPriority>().unwrap(), expected);
    }

    #[rstest]
    #[case("grey", ProjectColor::Gray)]
    #[case("Indigo", ProjectColor::Indigo)]
    #[case("green", ProjectColor::Green)]
    fn color_accepts_aliases(#[case] raw: &str, #[case] expected: ProjectColor) {
        assert_eq!(raw.parse::<ProjectColor>().unwrap(), expected);
    }

    #[rstest]
    #[case("someday")]
    #[case("")]
    fn unknown_priority_names_the_choices(#[case] raw: &str) {
        let err = raw.parse::<ItemPriority>().unwrap_err();
        assert!(err.to_string().contains("none|low|medium|high|urgent"));
    }

    #[test]
    fn patch_to_done_stamps_completion_and_back_to_todo_clears_it() {
        let mut record = item("a", None, 1);
        ItemPatch::status(ItemStatus::Done).apply_to(&mut record, at(5));
        assert_eq!(record.completed_at, Some(at(5)));
        assert_eq!(record.updated_at, at(5));

        ItemPatch::title("Renamed").apply_to(&mut record, at(6));
        assert_eq!(record.completed_at, Some(at(5)));

        ItemPatch::status(ItemStatus::Todo).apply_to(&mut record, at(7));
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn patch_without_status_leaves_completion_untouched() {
        let mut record = item("a", None, 1);
        record.status = ItemStatus::Done;
        record.completed_at = Some(at(1));
        let patch = ItemPatch {
            priority: Some(ItemPriority::High),
            due_date: Some(NaiveDate::from_ymd_opt(2025, 4, 1)),
            ..ItemPatch::default()
        };
        patch.apply_to(&mut record, at(9));
        assert_eq!(record.completed_at, Some(at(1)));
        assert_eq!(record.priority, ItemPriority::High);
        assert_eq!(record.due_date, NaiveDate::from_ymd_opt(2025, 4, 1));
    }

    #[test]
    fn new_item_defaults_status_and_priority() {
        let record = NewItem::titled("Plan trip").into_item("x".into(), "user-1", 4, at(0));
        assert_eq!(record.status, ItemStatus::Todo);
        assert_eq!(record.priority, ItemPriority::None);
        assert_eq!(record.position, 4);
        assert!(record.completed_at.is_none());
    }

    #[test]
    fn scope_matches_project_reference() {
        let mut record = item("a", None, 1);
        assert!(ProjectScope::Unassigned.contains(&record));
        record.project_id = Some("p1".into());
        assert!(ProjectScope::Project("p1".into()).contains(&record));
        assert_eq!(record.scope().key(), "p1");
        assert_eq!(ProjectScope::Unassigned.key(), "unassigned");
    }

    #[test]
    fn item_deserializes_with_defaults() {
        let raw = r#"{
            "id": "a",
            "title": "Water plants",
            "created_at": "2025-03-01T09:00:00Z",
            "updated_at": "2025-03-01T09:00:00Z"
        }"#;
        let record: Item = serde_json::from_str(raw).unwrap();
        assert_eq!(record.status, ItemStatus::Todo);
        assert!(record.parent_id.is_none());
        assert_eq!(record.position, 0);
    }
}
