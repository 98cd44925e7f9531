//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{CONFIG_ENV, FOLDER_ID_ENV, LOCAL_FOLDER_ENV, TOKEN_ENV};

pub mod commands;

/// CloudSaver - mirror a local folder with a Google Drive folder
#[derive(Parser, Debug)]
#[command(name = "cloudsaver", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ~/.cloudsaver/config.json)
    #[arg(long, global = true, env = CONFIG_ENV)]
    pub config: Option<PathBuf>,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
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
    /// Upload local changes to the remote folder
    Push(SyncArgs),

    /// Download remote changes into the local folder
    Pull(SyncArgs),

    /// Push, then pull
    Sync(SyncArgs),

    /// Check the local folder, credentials and remote folder without syncing
    Check(RootArgs),

    /// Print version information
    Version,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Where to sync and how to authenticate.
#[derive(Args, Debug, Clone, Default)]
pub struct RootArgs {
    /// Local folder to mirror
    #[arg(long, env = LOCAL_FOLDER_ENV)]
    pub local_folder: Option<PathBuf>,

    /// ID of the remote folder to mirror
    #[arg(long, env = FOLDER_ID_ENV)]
    pub folder_id: Option<String>,

    /// OAuth access token for the Drive API
    #[arg(long, env = TOKEN_ENV, hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    #[command(flatten)]
    pub root: RootArgs,

    /// Only sync paths containing this pattern, relative to the folder root (repeatable)
    #[arg(long = "only", value_name = "PATH")]
    pub only: Vec<String>,

    /// Maximum number of concurrent operations (default: 8)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Disable the live progress line
    #[arg(long)]
    pub no_progress: bool,
}
