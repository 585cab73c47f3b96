pub use tracker_nav::cli;
pub use tracker_nav::commands;
pub use tracker_nav::config;
pub use tracker_nav::nav;
pub use tracker_nav::{init_tracing, AppConfig, Session};

pub use tracker_core as core;
pub use tracker_core::model;
pub use tracker_core::{MutationError, Tracker};
