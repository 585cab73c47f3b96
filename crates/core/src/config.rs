use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use once_cell::sync::Lazy;

static ITEMS_FILE: &str = "items.json";
static PROJECTS_FILE: &str = "projects.json";
static ENV_DATA_DIR: &str = "TRACKER_DATA_DIR";
static ENV_USER: &str = "TRACKER_USER";
static DEFAULT_USER: &str = "local";

static PROJECT_DIRS: Lazy<Option<ProjectDirs>> =
    Lazy::new(|| ProjectDirs::from("dev", "tracker", "tracker"));

#[derive(Debug, Clone)]
pub struct AppConfig {
    data_dir: PathBuf,
    items_path: PathBuf,
    projects_path: PathBuf,
    user_id: String,
}

impl AppConfig {
    /// Construct [`AppConfig`] by resolving the data directory and acting user from the
    /// provided overrides, environment variables, and platform defaults.
    pub fn discover(data_dir_override: Option<PathBuf>, user_override: Option<String>) -> Result<Self> {
        let data_dir = resolve_data_dir(data_dir_override)?;
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir).with_context(|| {
                format!("Failed to create data directory at {}", data_dir.display())
            })?;
        }
        let mut config = Self::from_data_dir(data_dir)?;
        config.user_id = resolve_user(user_override);
        Ok(config)
    }

    /// Construct [`AppConfig`] directly from a resolved data directory.
    pub fn from_data_dir(data_dir: PathBuf) -> Result<Self> {
        let items_path = data_dir.join(ITEMS_FILE);
        let projects_path = data_dir.join(PROJECTS_FILE);
        Ok(Self {
            data_dir,
            items_path,
            projects_path,
            user_id: DEFAULT_USER.to_string(),
        })
    }

    pub fn with_user<T: Into<String>>(mut self, user_id: T) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn items_path(&self) -> &Path {
        &self.items_path
    }

    pub fn projects_path(&self) -> &Path {
        &self.projects_path
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

fn resolve_user(user_override: Option<String>) -> String {
    user_override
        .or_else(|| env::var(ENV_USER).ok())
        .map(|user| user.trim().to_string())
        .filter(|user| !user.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string())
}

fn resolve_data_dir(data_dir_override: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = data_dir_override {
        return Ok(dir);
    }

    if let Ok(env_dir) = env::var(ENV_DATA_DIR) {
        return Ok(PathBuf::from(env_dir));
    }

    if let Some(project) = &*PROJECT_DIRS {
        return Ok(project.data_dir().to_path_buf());
    }

    if let Some(base) = BaseDirs::new() {
        return Ok(base.home_dir().join(".tracker"));
    }

    Ok(env::current_dir()?.join(".tracker"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn discover_prefers_explicit_overrides() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("data");
        let config = AppConfig::discover(Some(target.clone()), Some(" alice ".into())).unwrap();
        assert!(target.exists());
        assert_eq!(config.data_dir(), target.as_path());
        assert_eq!(config.items_path(), target.join("items.json").as_path());
        assert_eq!(config.user_id(), "alice");
    }

    #[test]
    fn blank_user_override_falls_back() {
        assert!(!resolve_user(Some("   ".into())).is_empty());
    }
}
