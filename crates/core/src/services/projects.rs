use anyhow::Result;
use chrono::Utc;

use super::{normalize_title, remote, replace_record, temp_id, Tracker};
use crate::cache::{next_position, CollectionKind};
use crate::error::MutationError;
use crate::model::{NewProject, Project, ProjectPatch};

impl Tracker {
    pub async fn project(&self, id: &str) -> Result<Option<Project>> {
        self.require_user().await?;
        if let Some(project) = self.projects.get(id) {
            return Ok(Some(project));
        }
        self.store.get_project(id).await
    }

    pub async fn create_project(&self, input: NewProject) -> Result<Project, MutationError> {
        let user = self.require_user().await?;
        let mut input = input;
        input.title = normalize_title(&input.title)?;

        let optimistic_id = temp_id();
        let placeholder_id = optimistic_id.clone();
        let optimistic_input = input.clone();
        let now = Utc::now();

        let result = self
            .projects
            .mutate(
                "create",
                |records| {
                    let position = next_position(records);
                    records.push(optimistic_input.into_project(
                        optimistic_id,
                        &user.id,
                        position,
                        now,
                    ));
                },
                self.store.create_project(&user.id, &input),
                |records, created: &Project| replace_record(records, &placeholder_id, created),
            )
            .await;
        self.settle_projects().await;
        result.map_err(remote(CollectionKind::Projects, "create"))
    }

    pub async fn update_project(
        &self,
        id: &str,
        patch: ProjectPatch,
    ) -> Result<Project, MutationError> {
        self.require_user().await?;
        let mut patch = patch;
        if let Some(title) = patch.title.as_deref() {
            patch.title = Some(normalize_title(title)?);
        }

        let now = Utc::now();
        let result = self
            .projects
            .mutate(
                "update",
                |records| {
                    if let Some(project) = records.iter_mut().find(|project| project.id == id) {
                        patch.apply_to(project, now);
                    }
                },
                self.store.update_project(id, &patch),
                |records, updated: &Project| replace_record(records, id, updated),
            )
            .await;
        self.settle_projects().await;
        result.map_err(remote(CollectionKind::Projects, "update"))
    }

    /// Delete a project. Its items are detached by the store, so the item
    /// collection is reloaded as well once the write succeeds.
    pub async fn delete_project(&self, id: &str) -> Result<(), MutationError> {
        self.require_user().await?;
        let result = self
            .projects
            .mutate(
                "delete",
                |records| records.retain(|project| project.id != id),
                self.store.delete_project(id),
                |_, _| {},
            )
            .await;
        self.settle_projects().await;
        if result.is_ok() {
            self.items.invalidate();
            self.settle_items_after_project_delete().await;
        }
        result.map_err(remote(CollectionKind::Projects, "delete"))
    }

    async fn settle_items_after_project_delete(&self) {
        if self.items.in_flight() > 0 {
            return;
        }
        if let Err(err) = self.refresh_items().await {
            tracing::warn!(error = %err, "item reload after project delete failed");
        }
    }
}
