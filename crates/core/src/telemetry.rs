//! Records the lifecycle of cache mutations and refetches so the optimistic
//! protocol can be observed from tests and debug logs.

#[cfg(feature = "telemetry")]
use parking_lot::Mutex;

use crate::cache::CollectionKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RefetchStarted(CollectionKind),
    RefetchCompleted { collection: CollectionKind, count: usize },
    RefetchCancelled(CollectionKind),
    RefetchFailed { collection: CollectionKind, error: String },
    MutationApplied { collection: CollectionKind, action: &'static str },
    MutationCommitted { collection: CollectionKind, action: &'static str },
    MutationRolledBack { collection: CollectionKind, action: &'static str, error: String },
}

#[derive(Debug, Default)]
pub struct Handle {
    #[cfg(feature = "telemetry")]
    events: Mutex<Vec<Event>>,
}

impl Handle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: Event) {
        #[cfg(feature = "telemetry")]
        {
            match &event {
                Event::RefetchStarted(collection) => {
                    tracing::debug!(collection = collection.as_str(), "refetch started")
                }
                Event::RefetchCompleted { collection, count } => tracing::debug!(
                    collection = collection.as_str(),
                    count,
                    "refetch completed"
                ),
                Event::RefetchCancelled(collection) => {
                    tracing::debug!(collection = collection.as_str(), "refetch cancelled")
                }
                Event::RefetchFailed { collection, error } => tracing::debug!(
                    collection = collection.as_str(),
                    error = %error,
                    "refetch failed"
                ),
                Event::MutationApplied { collection, action } => tracing::debug!(
                    collection = collection.as_str(),
                    action,
                    "optimistic mutation applied"
                ),
                Event::MutationCommitted { collection, action } => tracing::debug!(
                    collection = collection.as_str(),
                    action,
                    "mutation committed"
                ),
                Event::MutationRolledBack {
                    collection,
                    action,
                    error,
                } => tracing::debug!(
                    collection = collection.as_str(),
                    action,
                    error = %error,
                    "mutation rolled back"
                ),
            }
            self.events.lock().push(event);
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = event;
        }
    }

    /// Recorded events, oldest first. Empty when the feature is disabled.
    pub fn events(&self) -> Vec<Event> {
        #[cfg(feature = "telemetry")]
        {
            self.events.lock().clone()
        }
        #[cfg(not(feature = "telemetry"))]
        {
            Vec::new()
        }
    }

    pub fn is_enabled(&self) -> bool {
        cfg!(feature = "telemetry")
    }
}
