//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// Green Trail - hiking trail catalog with a knowledge-base chatbot
#[derive(Parser, Debug)]
#[command(name = "gt", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.greentrail/data/greentrail.db)
    #[arg(long, global = true, env = "GT_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "GT_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the Green Trail database
    Init {
        /// Recreate an existing database
        #[arg(long)]
        force: bool,
    },

    /// Print version information
    Version,

    /// Trail catalog
    Trail {
        #[command(subcommand)]
        command: TrailCommands,
    },

    /// Knowledge entries for the chatbot
    Knowledge {
        #[command(subcommand)]
        command: KnowledgeCommands,
    },

    /// Uploaded documents for the chatbot
    Document {
        #[command(subcommand)]
        command: DocumentCommands,
    },

    /// Knowledge-base sync with the vector index
    Sync {
        #[command(subcommand)]
        command: SyncCommands,
    },

    /// Ask the chatbot
    Chat {
        #[command(subcommand)]
        command: ChatCommands,
    },

    /// Interactive session; edits sync after the debounce delay
    Console {
        /// Drop syncs still pending on exit instead of running them
        #[arg(long)]
        discard_pending: bool,
    },

    /// Configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Trail Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TrailCommands {
    /// Add a trail
    Add(TrailAddArgs),

    /// Update a trail
    Update(TrailUpdateArgs),

    /// Delete a trail
    Delete {
        /// Trail ID
        id: i64,
    },

    /// List trails
    List {
        /// Maximum trails to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show one trail
    Show {
        /// Trail ID
        id: i64,
    },
}

#[derive(Args, Debug)]
pub struct TrailAddArgs {
    /// Trail name
    pub label: String,

    /// Path to the GPX file
    #[arg(long)]
    pub gpx: String,

    /// Description
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Difficulty (facil, moderado, dificil)
    #[arg(long, default_value = "moderado")]
    pub difficulty: String,

    /// Route type (ida_volta, ida, volta)
    #[arg(long, default_value = "ida_volta")]
    pub route_type: String,

    /// Total distance in meters
    #[arg(long)]
    pub distance: Option<f64>,

    /// Estimated duration in minutes
    #[arg(long)]
    pub duration: Option<u32>,

    /// Elevation gain in meters
    #[arg(long)]
    pub elevation: Option<f64>,
}

#[derive(Args, Debug)]
pub struct TrailUpdateArgs {
    /// Trail ID
    pub id: i64,

    /// New name
    #[arg(long)]
    pub label: Option<String>,

    /// New GPX file path
    #[arg(long)]
    pub gpx: Option<String>,

    /// New description
    #[arg(short, long)]
    pub description: Option<String>,

    /// New difficulty
    #[arg(long)]
    pub difficulty: Option<String>,

    /// New route type
    #[arg(long)]
    pub route_type: Option<String>,

    /// New distance in meters
    #[arg(long)]
    pub distance: Option<f64>,

    /// New duration in minutes
    #[arg(long)]
    pub duration: Option<u32>,

    /// New elevation gain in meters
    #[arg(long)]
    pub elevation: Option<f64>,
}

// ============================================================================
// Knowledge Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommands {
    /// Add a knowledge entry
    Add {
        /// Title
        title: String,

        /// Content (or use --file)
        #[arg(conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,

        /// Read content from a file
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Update a knowledge entry
    Update {
        /// Entry ID
        id: i64,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New content
        #[arg(long)]
        content: Option<String>,
    },

    /// Delete a knowledge entry
    Delete {
        /// Entry ID
        id: i64,
    },

    /// List knowledge entries
    List {
        /// Maximum entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

// ============================================================================
// Document Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum DocumentCommands {
    /// Register a document file
    Add {
        /// Path to the file
        path: PathBuf,

        /// Title (default: file name)
        #[arg(long)]
        title: Option<String>,

        /// Media type (default: guessed from the extension)
        #[arg(long)]
        media_type: Option<String>,
    },

    /// Delete a document
    Delete {
        /// Document ID
        id: i64,
    },

    /// List documents
    List {
        /// Maximum documents to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

// ============================================================================
// Sync Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum SyncCommands {
    /// Sync records now, skipping the debounce delay
    Force {
        /// Record kind (trail, knowledge, document)
        #[arg(required_unless_present = "all")]
        kind: Option<String>,

        /// Record IDs (default: every record of the kind)
        ids: Vec<i64>,

        /// Sync every record of every kind
        #[arg(long, conflicts_with_all = ["kind", "ids"])]
        all: bool,
    },

    /// Show index coverage and pending syncs
    Status {
        /// Recent sync events to show
        #[arg(long, default_value = "10")]
        events: u32,

        /// Also check that the embedding provider is reachable
        #[arg(long)]
        check: bool,
    },
}

// ============================================================================
// Chat Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ChatCommands {
    /// Ask a question
    Ask {
        /// The question
        question: String,

        /// Chat room
        #[arg(long, default_value = crate::chat::DEFAULT_ROOM)]
        room: String,

        /// Author name (default: the actor)
        #[arg(long)]
        user: Option<String>,
    },

    /// Show a room's messages
    History {
        /// Chat room
        #[arg(long, default_value = crate::chat::DEFAULT_ROOM)]
        room: String,

        /// Maximum messages to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

// ============================================================================
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings
    Show,
}
