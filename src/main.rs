use anyhow::{Context, Result};
use clap::Parser;

fn main() -> Result<()> {
    let cli = tracker::cli::Cli::parse();
    tracker::init_tracing(cli.log_filter.clone())?;

    let config = tracker::config::from_cli(&cli)?;
    let command = cli.command.clone().unwrap_or_default();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    runtime.block_on(tracker::commands::execute(&config, command, &mut handle))
}
