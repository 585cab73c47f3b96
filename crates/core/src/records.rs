use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::model::{Item, Project};

/// Flat item and project records as stored in the data directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordSet {
    pub items: Vec<Item>,
    pub projects: Vec<Project>,
}

impl RecordSet {
    /// Read `items.json` and `projects.json`; a missing file is an empty list.
    pub fn load(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            items: read_list(config.items_path())?,
            projects: read_list(config.projects_path())?,
        })
    }

    /// Records written without an owner belong to `user_id`.
    pub fn claim_unowned(&mut self, user_id: &str) {
        for item in self.items.iter_mut().filter(|item| item.user_id.is_empty()) {
            item.user_id = user_id.to_string();
        }
        for project in self
            .projects
            .iter_mut()
            .filter(|project| project.user_id.is_empty())
        {
            project.user_id = user_id.to_string();
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        fs::create_dir_all(config.data_dir()).with_context(|| {
            format!(
                "Failed to create data directory at {}",
                config.data_dir().display()
            )
        })?;
        write_list(config.items_path(), &self.items)?;
        write_list(config.projects_path(), &self.projects)
    }
}

fn read_list<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn write_list<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let raw = serde_json::to_string_pretty(records)?;
    fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()))
}
