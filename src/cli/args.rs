use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "selkie")]
#[command(version = "0.1.0")]
#[command(about = "A local, privacy-preserving AI coding agent", long_about = None)]
pub struct Cli {
    /// Task to execute against the project
    #[arg(short, long)]
    pub task: Option<String>,

    /// Project directory (defaults to current directory)
    #[arg(short, long)]
    pub path: Option<PathBuf>,

    /// File of scripted model replies, separated by lines containing `---`
    ///
    /// The model transport is pluggable; the bundled backend replays a
    /// recorded script, which keeps runs deterministic and offline.
    #[arg(short, long)]
    pub replay: Option<PathBuf>,

    /// Approve all confirmation prompts without asking
    #[arg(short, long)]
    pub yes: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,
    /// List saved sessions for this project
    Sessions,
    /// Print a saved session's step history
    Show {
        /// Session id, as printed by `sessions`
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_invocation() {
        let cli = Cli::parse_from([
            "selkie",
            "--task",
            "rewrite the readme",
            "--replay",
            "replies.txt",
            "--yes",
        ]);

        assert_eq!(cli.task.as_deref(), Some("rewrite the readme"));
        assert!(cli.yes);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_sessions_subcommand() {
        let cli = Cli::parse_from(["selkie", "sessions"]);
        assert!(matches!(cli.command, Some(Commands::Sessions)));
    }
}
