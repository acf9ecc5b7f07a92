//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: start the worker daemon (the default when no subcommand is given)
//! - handshake: parse a handshake response blob and print a field summary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tunnlr - coordinated background workers for a circumvention client
#[derive(Parser, Debug)]
#[command(name = "tunnlr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the worker daemon until a stop signal arrives
    Run,

    /// Parse a handshake response from a file (or stdin) and print the
    /// extracted fields
    Handshake {
        /// File holding the response blob; reads stdin when omitted
        file: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_has_no_command() {
        let cli = Cli::try_parse_from(["tunnlr"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_run_command() {
        let cli = Cli::try_parse_from(["tunnlr", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run)));
    }

    #[test]
    fn test_handshake_with_file() {
        let cli = Cli::try_parse_from(["tunnlr", "handshake", "resp.txt"]).unwrap();
        match cli.command {
            Some(Commands::Handshake { file: Some(file) }) => {
                assert_eq!(file, PathBuf::from("resp.txt"));
            }
            other => panic!("unexpected parse: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["tunnlr", "-v", "-c", "custom.yml", "run"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("custom.yml")));
    }
}
