//! CLI command definitions for the `formflow` binary.
//!
//! Uses clap derive macros for argument parsing. Every command that talks to
//! the backend loads the form version first, so the draft it works on is
//! always the server's current state plus the edits given on the command line.

pub mod form;
pub mod render;
pub mod script;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use formflow_types::config::TransitionPolicy;

/// Edit, save and publish multi-stage form definitions.
#[derive(Parser)]
#[command(name = "formflow", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Print only what a command was asked for (and errors): no confirmations,
    /// warnings or extra listings. Also limits logs to errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Backend base URL, overriding `api.base_url` from config.toml.
    #[arg(long, global = true, env = "FORMFLOW_API_URL")]
    pub api_url: Option<String>,

    /// How to treat transitions that cannot be sent yet, overriding config.toml.
    #[arg(long, global = true, value_enum)]
    pub policy: Option<PolicyArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the stages, sections and transitions of a form version.
    Show {
        /// Form version id.
        id: i64,
    },

    /// Preview the save request for a form version file, without a backend.
    Plan {
        /// Form version JSON as returned by the backend.
        form_version: PathBuf,

        /// Edit script to apply before building the request.
        #[arg(long, short)]
        actions: Option<PathBuf>,
    },

    /// Apply an edit script to a form version and save it.
    Push {
        /// Form version id.
        id: i64,

        /// Edit script (JSON list of steps).
        actions: PathBuf,
    },

    /// Publish a form version.
    Publish {
        /// Form version id.
        id: i64,
    },

    /// Create a new draft version of a form.
    #[command(name = "new-version")]
    NewVersion {
        /// Form id.
        form_id: i64,

        /// Start from the form's current version instead of an empty one.
        #[arg(long)]
        copy_from_current: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyArg {
    /// Leave unsendable transitions out and keep the draft dirty.
    DropAndWarn,
    /// Refuse to save while any transition is unsendable.
    Reject,
}

impl From<PolicyArg> for TransitionPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::DropAndWarn => TransitionPolicy::DropAndWarn,
            PolicyArg::Reject => TransitionPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_push_with_global_flags() {
        let cli = Cli::try_parse_from([
            "formflow",
            "push",
            "12",
            "edits.json",
            "--json",
            "--policy",
            "reject",
            "--api-url",
            "http://forms.test/api",
        ])
        .unwrap();

        assert!(cli.json);
        assert_eq!(cli.policy.map(TransitionPolicy::from), Some(TransitionPolicy::Reject));
        assert_eq!(cli.api_url.as_deref(), Some("http://forms.test/api"));
        match cli.command {
            Commands::Push { id, actions } => {
                assert_eq!(id, 12);
                assert_eq!(actions, PathBuf::from("edits.json"));
            }
            _ => panic!("expected push"),
        }
    }

    #[test]
    fn test_new_version_flag() {
        let cli = Cli::try_parse_from(["formflow", "new-version", "3", "--copy-from-current"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::NewVersion {
                form_id: 3,
                copy_from_current: true
            }
        ));
    }
}
