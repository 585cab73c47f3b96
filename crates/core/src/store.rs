//! Collaborators the tracker talks to: the remote record store and the
//! authentication session.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Item, ItemPatch, NewItem, NewProject, Project, ProjectPatch, User};

/// Remote record store scoped per user. Lists come back ordered by
/// `position` ascending; positions are not unique.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list_items(&self, user_id: &str) -> Result<Vec<Item>>;

    async fn get_item(&self, id: &str) -> Result<Option<Item>>;

    async fn create_item(&self, user_id: &str, input: &NewItem) -> Result<Item>;

    async fn update_item(&self, id: &str, patch: &ItemPatch) -> Result<Item>;

    async fn delete_item(&self, id: &str) -> Result<()>;

    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>>;

    async fn get_project(&self, id: &str) -> Result<Option<Project>>;

    async fn create_project(&self, user_id: &str, input: &NewProject) -> Result<Project>;

    async fn update_project(&self, id: &str, patch: &ProjectPatch) -> Result<Project>;

    async fn delete_project(&self, id: &str) -> Result<()>;
}

/// Source of the signed-in user. `None` means nobody is signed in.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self) -> Result<Option<User>>;
}

/// Auth provider with a fixed session.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user: Option<User>,
}

impl StaticAuth {
    pub fn signed_in<T: Into<String>>(user_id: T) -> Self {
        Self {
            user: Some(User {
                id: user_id.into(),
                email: None,
            }),
        }
    }

    pub fn signed_out() -> Self {
        Self { user: None }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn current_user(&self) -> Result<Option<User>> {
        Ok(self.user.clone())
    }
}
