//! CLI module for Rapport.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Rapport - Grounded question answering over indexed documents
///
/// Answers questions from a pre-built passage index through a chat completions
/// service, keeping conversation history and citing sources.
#[derive(Parser, Debug)]
#[command(name = "rapport")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check artifacts, dimensions and API keys
    Doctor,

    /// Ask a single question
    Ask {
        /// The question to ask
        question: String,

        /// Number of passages to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Generation model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Retrieve passages without generating an answer
    Search {
        /// Search query
        query: String,

        /// Number of passages to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Generation model to use
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Start HTTP API server exposing sessions
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_overrides() {
        let cli = Cli::parse_from(["rapport", "-vv", "ask", "Quel délai ?", "-k", "3", "-m", "mistral-large"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Ask {
                question,
                top_k,
                model,
            } => {
                assert_eq!(question, "Quel délai ?");
                assert_eq!(top_k, Some(3));
                assert_eq!(model.as_deref(), Some("mistral-large"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::parse_from(["rapport", "serve"]);
        match cli.command {
            Commands::Serve { host, port } => {
                assert_eq!(host, "127.0.0.1");
                assert_eq!(port, 3000);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["rapport", "search", "notice", "--config", "/tmp/r.toml"]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/r.toml"));
    }
}
