pub mod cli;
pub mod commands;
pub mod config;
pub mod nav;
pub mod session;

use anyhow::Result;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

pub use tracker_core as core;
pub use tracker_core::model;
pub use tracker_core::AppConfig;

pub use session::Session;

/// Install the stderr subscriber. `RUST_LOG` refines the default directive.
pub fn init_tracing(filter: Option<String>) -> Result<()> {
    let filter = filter.unwrap_or_else(|| "warn".to_string());
    let directive: Directive = filter.parse()?;
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive)
        .from_env_lossy();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
    Ok(())
}
