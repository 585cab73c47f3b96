use thiserror::Error;

use crate::cache::CollectionKind;

/// Why a write through the tracker did not go through.
#[derive(Debug, Error)]
pub enum MutationError {
    /// Nobody is signed in; nothing was applied.
    #[error("Not authenticated")]
    Unauthenticated,

    /// The title was blank after trimming; nothing was applied.
    #[error("Title cannot be empty")]
    EmptyTitle,

    /// The remote store rejected the write; the cache was rolled back.
    #[error("Failed to {action} {collection}: {source}")]
    Remote {
        collection: CollectionKind,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl MutationError {
    pub fn is_remote(&self) -> bool {
        matches!(self, MutationError::Remote { .. })
    }
}
