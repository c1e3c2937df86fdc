use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser)]
#[clap(
    version,
    about = "Compose Markdown drafts locally and publish them to a GitHub repository"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Path to the local drafts file
    #[clap(long, value_parser)]
    pub drafts_file: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the draftpress application
    #[clap(subcommand)]
    pub command: Commands,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RemoteCommands;

    #[test]
    fn parses_nested_remote_command() {
        let cli = Cli::parse_from(["draftpress", "remote", "show", "A.md", "--html"]);
        assert!(matches!(
            cli.command,
            Commands::Remote(RemoteCommands::Show { ref name, html: true }) if name == "A.md"
        ));
    }

    #[test]
    fn delete_without_id_targets_latest() {
        let cli = Cli::parse_from(["draftpress", "-v", "delete", "--force"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Delete { id: None, force: true }));
    }
}
