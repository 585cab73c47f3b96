use anyhow::Result;
use chrono::Utc;

use super::{normalize_title, remote, replace_record, temp_id, Tracker};
use crate::cache::{next_position, CollectionKind};
use crate::error::MutationError;
use crate::model::{Item, ItemPatch, NewItem};

impl Tracker {
    /// Cached item, or the remote copy if the cache does not have it.
    pub async fn item(&self, id: &str) -> Result<Option<Item>> {
        self.require_user().await?;
        if let Some(item) = self.items.get(id) {
            return Ok(Some(item));
        }
        self.store.get_item(id).await
    }

    /// Create an item. The cache shows a `temp-` record immediately; it is
    /// swapped for the stored record once the store answers.
    pub async fn create_item(&self, input: NewItem) -> Result<Item, MutationError> {
        let user = self.require_user().await?;
        let mut input = input;
        input.title = normalize_title(&input.title)?;

        let optimistic_id = temp_id();
        let placeholder_id = optimistic_id.clone();
        let optimistic_input = input.clone();
        let now = Utc::now();

        let result = self
            .items
            .mutate(
                "create",
                |records| {
                    let position = next_position(records);
                    records.push(optimistic_input.into_item(optimistic_id, &user.id, position, now));
                },
                self.store.create_item(&user.id, &input),
                |records, created: &Item| replace_record(records, &placeholder_id, created),
            )
            .await;
        self.settle_items().await;
        result.map_err(remote(CollectionKind::Items, "create"))
    }

    /// Apply `patch` to the item with `id`.
    pub async fn update_item(&self, id: &str, patch: ItemPatch) -> Result<Item, MutationError> {
        self.require_user().await?;
        let mut patch = patch;
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(normalize_title(title)?);
        }

        let now = Utc::now();
        let result = self
            .items
            .mutate(
                "update",
                |records| {
                    if let Some(item) = records.iter_mut().find(|item| item.id == id) {
                        patch.apply_to(item, now);
                    }
                },
                self.store.update_item(id, &patch),
                |records, updated: &Item| replace_record(records, id, updated),
            )
            .await;
        self.settle_items().await;
        result.map_err(remote(CollectionKind::Items, "update"))
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), MutationError> {
        self.require_user().await?;
        let result = self
            .items
            .mutate(
                "delete",
                |records| records.retain(|item| item.id != id),
                self.store.delete_item(id),
                |_, _| {},
            )
            .await;
        self.settle_items().await;
        result.map_err(remote(CollectionKind::Items, "delete"))
    }
}
