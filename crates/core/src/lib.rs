pub mod cache;
pub mod config;
pub mod error;
pub mod memory;
pub mod model;
pub mod records;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod tree;
pub mod views;

pub use cache::{Collection, CollectionKind, RefetchOutcome};
pub use config::AppConfig;
pub use error::MutationError;
pub use memory::MemoryStore;
pub use model::*;
pub use records::RecordSet;
pub use services::{is_temp_id, Tracker};
pub use store::{AuthProvider, RemoteStore, StaticAuth};
pub use tree::{build_forest, ItemForest, ItemNode};
