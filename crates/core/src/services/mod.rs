//! The tracker service: item and project caches over the remote store, with
//! every write going through the optimistic protocol in [`crate::cache`].

mod items;
mod projects;
#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};
use ulid::Ulid;

use crate::cache::{Collection, CollectionKind, Record, RefetchOutcome};
use crate::error::MutationError;
use crate::model::{Item, Project, ProjectScope, User};
use crate::store::{AuthProvider, RemoteStore};
use crate::telemetry::Handle;
use crate::tree::{build_forest, ItemForest};

const TEMP_ID_PREFIX: &str = "temp-";

pub struct Tracker {
    store: Arc<dyn RemoteStore>,
    auth: Arc<dyn AuthProvider>,
    items: Collection<Item>,
    projects: Collection<Project>,
    telemetry: Arc<Handle>,
}

impl Tracker {
    pub fn new(store: Arc<dyn RemoteStore>, auth: Arc<dyn AuthProvider>) -> Self {
        let telemetry = Arc::new(Handle::new());
        Self {
            store,
            auth,
            items: Collection::new(CollectionKind::Items, telemetry.clone()),
            projects: Collection::new(CollectionKind::Projects, telemetry.clone()),
            telemetry,
        }
    }

    pub fn items(&self) -> Vec<Item> {
        self.items.records()
    }

    pub fn projects(&self) -> Vec<Project> {
        self.projects.records()
    }

    pub fn item_cache(&self) -> &Collection<Item> {
        &self.items
    }

    pub fn project_cache(&self) -> &Collection<Project> {
        &self.projects
    }

    pub fn telemetry(&self) -> &Handle {
        &self.telemetry
    }

    /// Forest over every cached item.
    pub fn forest(&self) -> ItemForest {
        build_forest(&self.items.records())
    }

    /// Forest over the cached items of one project bucket.
    pub fn forest_in(&self, scope: &ProjectScope) -> ItemForest {
        let items = self.items.records();
        build_forest(items.iter().filter(|item| scope.contains(item)))
    }

    pub async fn refresh(&self) -> Result<()> {
        self.refresh_projects().await?;
        self.refresh_items().await?;
        Ok(())
    }

    pub async fn refresh_items(&self) -> Result<RefetchOutcome> {
        let user = self.require_user().await?;
        self.items.refetch(self.store.list_items(&user.id)).await
    }

    pub async fn refresh_projects(&self) -> Result<RefetchOutcome> {
        let user = self.require_user().await?;
        self.projects.refetch(self.store.list_projects(&user.id)).await
    }

    async fn require_user(&self) -> Result<User, MutationError> {
        match self.auth.current_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(MutationError::Unauthenticated),
            Err(err) => {
                warn!(error = %err, "session lookup failed");
                Err(MutationError::Unauthenticated)
            }
        }
    }

    async fn settle_items(&self) {
        self.items.settle();
        self.refetch_after_settle(&self.items, self.refresh_items()).await
    }

    async fn settle_projects(&self) {
        self.projects.settle();
        self.refetch_after_settle(&self.projects, self.refresh_projects())
            .await
    }

    async fn refetch_after_settle<T, F>(&self, collection: &Collection<T>, refetch: F)
    where
        T: Record,
        F: std::future::Future<Output = Result<RefetchOutcome>>,
    {
        if collection.in_flight() > 0 {
            debug!(
                collection = collection.kind().as_str(),
                pending = collection.in_flight(),
                "settlement refetch deferred to the last pending write"
            );
            return;
        }
        if let Err(err) = refetch.await {
            warn!(
                collection = collection.kind().as_str(),
                error = %err,
                "settlement refetch failed; cache left stale"
            );
        }
    }
}

pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

fn temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Ulid::new())
}

fn normalize_title(title: &str) -> Result<String, MutationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(MutationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

fn replace_record<T: Record>(records: &mut [T], id: &str, record: &T) {
    if let Some(slot) = records.iter_mut().find(|existing| existing.id() == id) {
        *slot = record.clone();
    }
}

fn remote(collection: CollectionKind, action: &'static str) -> impl FnOnce(anyhow::Error) -> MutationError {
    move |source| MutationError::Remote {
        collection,
        action,
        source,
    }
}
