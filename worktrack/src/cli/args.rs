//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Worktrack - Track timed work sessions per user
#[derive(Parser, Debug)]
#[command(name = "worktrack")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the work service (overrides config and WORKTRACK_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List cards with their current state and elapsed time
    Cards,

    /// Start work on a card
    Start {
        /// Card number, id or user name
        card: String,

        /// What is being worked on
        #[arg(trailing_var_arg = true, required = true)]
        description: Vec<String>,
    },

    /// Complete the running session on a card
    Complete {
        /// Card number, id or user name
        card: String,

        /// Replace the description before stopping
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Change the description of a running session
    Describe {
        /// Card number, id or user name
        card: String,

        /// New description
        #[arg(trailing_var_arg = true, required = true)]
        text: Vec<String>,
    },

    /// Show a live timer for a card until Ctrl-C or the session stops
    Watch {
        /// Card number, id or user name
        card: String,
    },

    /// Show work history for a window
    History {
        /// Window to show
        #[arg(value_enum, default_value = "daily")]
        window: WindowArg,

        /// First day of a custom window (YYYY-MM-DD)
        #[arg(long, required_if_eq("window", "custom"))]
        start: Option<String>,

        /// Day after the last day of a custom window (YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// Run the reference work service
    Serve {
        /// Port to listen on (defaults to the configured port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Register a user when the store is empty (repeatable)
        #[arg(short, long = "user")]
        users: Vec<String>,

        /// Persist sessions to this JSON file
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

/// History windows selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WindowArg {
    /// Today
    Daily,
    /// The last seven days
    Weekly,
    /// The last month
    Monthly,
    /// Explicit --start and optional --end
    Custom,
}
