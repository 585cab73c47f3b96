use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracker_core::model::{Item, ItemStatus, Project, ProjectScope};
use tracker_core::records::RecordSet;
use tracker_core::tree::ItemForest;
use tracker_core::views::{board_columns, calendar_days};
use tracker_core::{MemoryStore, StaticAuth, Tracker};

use crate::cli::{CliCommand, NavigateArgs, TreeArgs};
use crate::config::AppConfig;
use crate::nav::{parse_keys, FocusableEntry, NavigationState};
use crate::session::Session;

pub async fn execute<W: Write>(config: &AppConfig, command: CliCommand, mut writer: W) -> Result<()> {
    match command {
        CliCommand::Tree(args) => handle_tree(config, &args, &mut writer).await,
        CliCommand::Board => handle_board(config, &mut writer).await,
        CliCommand::Calendar => handle_calendar(config, &mut writer).await,
        CliCommand::Navigate(args) => handle_navigate(config, &args, &mut writer).await,
    }
}

/// A tracker over the records in the data directory, already loaded.
pub async fn open_tracker(config: &AppConfig) -> Result<Tracker> {
    let mut records = RecordSet::load(config)?;
    records.claim_unowned(config.user_id());
    let tracker = Tracker::new(
        Arc::new(MemoryStore::from_records(records)),
        Arc::new(StaticAuth::signed_in(config.user_id())),
    );
    tracker
        .refresh()
        .await
        .context("failed to load records")?;
    Ok(tracker)
}

async fn handle_tree<W: Write>(config: &AppConfig, args: &TreeArgs, mut writer: W) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let forest = if args.unassigned {
        tracker.forest_in(&ProjectScope::Unassigned)
    } else if let Some(project) = &args.project {
        tracker.forest_in(&ProjectScope::Project(project.clone()))
    } else {
        tracker.forest()
    };
    write_outline(&forest, &mut writer)
}

fn write_outline<W: Write>(forest: &ItemForest, mut writer: W) -> Result<()> {
    if forest.is_empty() {
        writeln!(writer, "No items")?;
        return Ok(());
    }
    for node in forest.flatten() {
        writeln!(
            writer,
            "{}- {} {}",
            "  ".repeat(node.depth),
            status_box(&node.item),
            node.item.title
        )?;
    }
    Ok(())
}

async fn handle_board<W: Write>(config: &AppConfig, mut writer: W) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let items = tracker.items();
    for column in board_columns(&items) {
        writeln!(writer, "{} ({})", column.status.label(), column.cards.len())?;
        for card in &column.cards {
            match card.child_count {
                0 => writeln!(writer, "  - {}", card.item.title)?,
                1 => writeln!(writer, "  - {} (1 sub-item)", card.item.title)?,
                n => writeln!(writer, "  - {} ({n} sub-items)", card.item.title)?,
            }
        }
    }
    Ok(())
}

async fn handle_calendar<W: Write>(config: &AppConfig, mut writer: W) -> Result<()> {
    let tracker = open_tracker(config).await?;
    let items = tracker.items();
    let days = calendar_days(&items);
    if days.is_empty() {
        writeln!(writer, "No scheduled items")?;
        return Ok(());
    }
    for (day, entries) in days {
        writeln!(writer, "{}", day.format("%Y-%m-%d (%a)"))?;
        for item in entries {
            writeln!(writer, "  - {} {}", status_box(item), item.title)?;
        }
    }
    Ok(())
}

async fn handle_navigate<W: Write>(
    config: &AppConfig,
    args: &NavigateArgs,
    mut writer: W,
) -> Result<()> {
    let keys = if args.keys.trim().is_empty() {
        Vec::new()
    } else {
        parse_keys(&args.keys)?
    };

    let mut session = Session::new(open_tracker(config).await?);
    session.load().await?;
    for key in keys {
        if let Err(err) = session.press(key).await {
            writeln!(writer, "! {err}")?;
        }
    }

    let tracker = session.tracker();
    let view = ViewRows {
        state: session.state(),
        items: tracker.items(),
        projects: tracker.projects(),
    };
    view.write_to(&session.entries(), &mut writer)
}

struct ViewRows<'a> {
    state: &'a NavigationState,
    items: Vec<Item>,
    projects: Vec<Project>,
}

impl ViewRows<'_> {
    fn write_to<W: Write>(&self, entries: &[FocusableEntry], mut writer: W) -> Result<()> {
        for entry in entries {
            let cursor = if entry.is_focused_by(self.state.focus()) {
                ">"
            } else {
                " "
            };
            match entry {
                FocusableEntry::CreateProject => {
                    let form = self.state.project_form();
                    let caret = if form.is_active() { "_" } else { "" };
                    writeln!(
                        writer,
                        "{cursor} + New project [{}]: {}{caret}",
                        form.color(),
                        form.draft()
                    )?;
                }
                FocusableEntry::Project(scope) => {
                    let marker = if self.state.expansion().project_expanded(scope) {
                        "v"
                    } else {
                        ">"
                    };
                    writeln!(writer, "{cursor} {marker} {}", self.project_title(scope))?;
                    if self.state.adding_task() == Some(scope) {
                        writeln!(writer, "      + task: {}_", self.state.task_draft())?;
                    }
                }
                FocusableEntry::Item { id, depth, .. } => {
                    let indent = "  ".repeat(depth + 1);
                    let title = self
                        .items
                        .iter()
                        .find(|item| &item.id == id)
                        .map_or("?", |item| item.title.as_str());
                    writeln!(writer, "{cursor} {indent}- {title}")?;
                    if self.state.shows_sub_item_row(id) {
                        let draft = self.state.sub_item_draft(id).unwrap_or_default();
                        writeln!(writer, "  {indent}  + sub-item: {draft}")?;
                    }
                }
            }
        }
        if let Some(panel) = self.state.detail() {
            if let Some(item) = self.items.iter().find(|item| item.id == panel.item_id) {
                writeln!(
                    writer,
                    "Detail: {} [{}] priority {}",
                    item.title,
                    item.status.label(),
                    item.priority.label()
                )?;
            }
        }
        Ok(())
    }

    fn project_title<'a>(&'a self, scope: &'a ProjectScope) -> &'a str {
        match scope {
            ProjectScope::Unassigned => "Unassigned",
            ProjectScope::Project(id) => self
                .projects
                .iter()
                .find(|project| &project.id == id)
                .map_or(id.as_str(), |project| project.title.as_str()),
        }
    }
}

fn status_box(item: &Item) -> &'static str {
    match item.status {
        ItemStatus::Done => "[x]",
        ItemStatus::InProgress => "[~]",
        ItemStatus::Archived => "[-]",
        ItemStatus::Todo => "[ ]",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::tests::{item, project};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn temp_config(records: RecordSet) -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let config = AppConfig::from_data_dir(dir.path().to_path_buf())
            .expect("config")
            .with_user("user-1");
        records.save(&config).expect("seed records");
        (config, dir)
    }

    fn seeded() -> RecordSet {
        let mut done = item("c", None, None, 3);
        done.status = ItemStatus::Done;
        done.due_date = NaiveDate::from_ymd_opt(2025, 3, 4);
        RecordSet {
            items: vec![
                item("a", None, Some("p1"), 1),
                item("a1", Some("a"), Some("p1"), 1),
                done,
            ],
            projects: vec![project("p1", 1)],
        }
    }

    async fn run(config: &AppConfig, command: CliCommand) -> String {
        let mut output = Vec::new();
        execute(config, command, &mut output)
            .await
            .expect("execute command");
        String::from_utf8(output).expect("utf8")
    }

    #[tokio::test]
    async fn tree_prints_indented_outline() {
        let (config, _dir) = temp_config(seeded());
        let output = run(&config, CliCommand::default()).await;
        assert_eq!(output, "- [ ] Item a\n  - [ ] Item a1\n- [x] Item c\n");

        let args = TreeArgs {
            project: None,
            unassigned: true,
        };
        let output = run(&config, CliCommand::Tree(args)).await;
        assert_eq!(output, "- [x] Item c\n");
    }

    #[tokio::test]
    async fn empty_data_dir_has_no_items() {
        let (config, _dir) = temp_config(RecordSet::default());
        assert_eq!(run(&config, CliCommand::default()).await, "No items\n");
        assert_eq!(run(&config, CliCommand::Calendar).await, "No scheduled items\n");
    }

    #[tokio::test]
    async fn board_counts_sub_items() {
        let (config, _dir) = temp_config(seeded());
        let output = run(&config, CliCommand::Board).await;
        assert!(output.starts_with("To Do (1)\n  - Item a (1 sub-item)\n"));
        assert!(output.contains("Done (1)\n  - Item c\n"));
    }

    #[tokio::test]
    async fn calendar_groups_by_due_date() {
        let (config, _dir) = temp_config(seeded());
        let output = run(&config, CliCommand::Calendar).await;
        assert_eq!(output, "2025-03-04 (Tue)\n  - [x] Item c\n");
    }

    #[tokio::test]
    async fn navigate_prints_cursor_and_draft() {
        let (config, _dir) = temp_config(seeded());
        let args = NavigateArgs {
            keys: "down,enter,down,s,text:buy milk,down,up".into(),
        };
        let output = run(&config, CliCommand::Navigate(args)).await;
        assert_eq!(
            output,
            [
                "  + New project [blue]: ",
                "  v Project p1",
                ">   - Item a",
                "      + sub-item: buy milk",
                "      - Item a1",
                "  > Unassigned",
                "",
            ]
            .join("\n")
        );
    }

    fn hand_written_records() -> (AppConfig, TempDir) {
        let dir = TempDir::new().expect("temp dir");
        let stamp = "2025-03-01T09:00:00Z";
        let items = json!([
            { "id": "a", "title": "Plan trip", "project_id": "p1", "position": 1,
              "created_at": stamp, "updated_at": stamp },
            { "id": "a1", "parent_id": "a", "project_id": "p1", "title": "Book flights",
              "status": "in_progress", "position": 1, "created_at": stamp, "updated_at": stamp },
            { "id": "b", "parent_id": "gone", "title": "Orphan", "position": 2,
              "created_at": stamp, "updated_at": stamp }
        ]);
        let projects = json!([
            { "id": "p1", "title": "Travel", "color": "green", "position": 1,
              "created_at": stamp, "updated_at": stamp }
        ]);
        fs::write(dir.path().join("items.json"), items.to_string()).expect("write items");
        fs::write(dir.path().join("projects.json"), projects.to_string())
            .expect("write projects");

        let config = AppConfig::discover(Some(dir.path().to_path_buf()), Some("me".into()))
            .expect("config");
        (config, dir)
    }

    #[tokio::test]
    async fn tree_promotes_dangling_parents_to_roots() {
        let (config, _dir) = hand_written_records();
        let output = run(&config, CliCommand::Tree(TreeArgs::default())).await;
        assert_eq!(output, "- [ ] Plan trip\n  - [~] Book flights\n- [ ] Orphan\n");

        let only_travel = TreeArgs {
            project: Some("p1".into()),
            unassigned: false,
        };
        let output = run(&config, CliCommand::Tree(only_travel)).await;
        assert!(!output.contains("Orphan"));
    }

    #[tokio::test]
    async fn navigate_opens_and_closes_detail() {
        let (config, _dir) = hand_written_records();
        let args = NavigateArgs {
            keys: "down,enter,down,right".into(),
        };
        let output = run(&config, CliCommand::Navigate(args)).await;
        assert!(output.contains(">   - Plan trip\n"));
        assert!(output.ends_with("Detail: Plan trip [To Do] priority None\n"));

        let args = NavigateArgs {
            keys: "down,enter,down,right,up,left".into(),
        };
        let output = run(&config, CliCommand::Navigate(args)).await;
        assert!(output.contains(">   - Plan trip\n"));
        assert!(!output.contains("Detail:"));
    }

    #[tokio::test]
    async fn navigate_reaches_items_with_missing_parents() {
        let (config, _dir) = hand_written_records();
        let args = NavigateArgs {
            keys: "down,down,enter,down".into(),
        };
        let output = run(&config, CliCommand::Navigate(args)).await;
        assert_eq!(
            output,
            [
                "  + New project [blue]: ",
                "  > Travel",
                "  v Unassigned",
                ">   - Orphan",
                "",
            ]
            .join("\n")
        );
    }
}
