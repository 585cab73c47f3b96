use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tracker",
    version,
    about = "Nested items and projects with optimistic writes and keyboard navigation.",
    after_help = "Examples:\n  tracker                      Print the item outline (same as `tracker tree`)\n  tracker tree --unassigned\n  tracker board\n  tracker navigate --keys down,enter,down,s,text:buy milk,enter"
)]
pub struct Cli {
    /// Override the data directory (defaults to platform-specific app dir)
    #[arg(long, value_name = "PATH", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Act as this user (defaults to $TRACKER_USER, then "local")
    #[arg(long, value_name = "ID", global = true)]
    pub user: Option<String>,

    /// Tracing filter directive (e.g. "info", "tracker_core=debug")
    #[arg(long = "log", value_name = "DIRECTIVE", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
    /// Print the item forest as an indented outline (default command)
    Tree(TreeArgs),
    /// Print root items grouped into status columns
    Board,
    /// Print items grouped by due date
    Calendar,
    /// Replay keys through the project view and print where the cursor ends up
    Navigate(NavigateArgs),
}

impl Default for CliCommand {
    fn default() -> Self {
        CliCommand::Tree(TreeArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct TreeArgs {
    /// Only items of this project
    #[arg(long, value_name = "ID", conflicts_with = "unassigned")]
    pub project: Option<String>,

    /// Only items without a project
    #[arg(long)]
    pub unassigned: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct NavigateArgs {
    /// Comma-separated keys: up, down, left, right, enter, esc, tab,
    /// backspace, space, single characters, or `text:<chars>`
    #[arg(long, value_name = "KEYS", default_value = "")]
    pub keys: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["tracker", "tree", "--unassigned", "--user", "ana"]).unwrap();
        assert_eq!(cli.user.as_deref(), Some("ana"));
        assert!(matches!(
            cli.command,
            Some(CliCommand::Tree(TreeArgs {
                unassigned: true,
                ..
            }))
        ));
    }

    #[test]
    fn project_and_unassigned_conflict() {
        assert!(Cli::try_parse_from(["tracker", "tree", "--project", "p1", "--unassigned"]).is_err());
    }
}
