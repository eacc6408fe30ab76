//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DownloadMode, ImageLayout, MarkMode, SyncMode, TagScope};

pub mod commands;

/// memos-sync - mirror Memos entries into SiYuan
#[derive(Parser, Debug)]
#[command(name = "memos-sync", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path (default: ~/.memos-sync/config.json)
    #[arg(long, global = true, env = "MEMOS_SYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

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
    /// Sync new and edited memos into SiYuan
    Sync {
        /// Detect and render changes without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Sync repeatedly at a fixed interval
    Watch {
        /// Seconds between runs
        #[arg(long, default_value = "300", value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,
    },

    /// Validate the configuration and the Memos access token
    Check,

    /// Show how many memos are waiting to be synced
    Status,

    /// List SiYuan notebooks
    Notebooks,

    /// View or edit the configuration
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

    /// Print version information
    Version,
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
// Config Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration (tokens masked)
    Show,

    /// Print the configuration file path
    Path,

    /// Update one or more settings
    Set(ConfigSetArgs),
}

#[derive(Args, Debug, Default)]
pub struct ConfigSetArgs {
    /// Memos server URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Memos access token
    #[arg(long)]
    pub access_token: Option<String>,

    /// SiYuan kernel URL
    #[arg(long)]
    pub siyuan_base_url: Option<String>,

    /// SiYuan API token
    #[arg(long)]
    pub siyuan_token: Option<String>,

    /// Checkpoint, `YYYY-MM-DD HH:MM:SS` local time
    #[arg(long)]
    pub last_sync_time: Option<String>,

    /// Where memos are written
    #[arg(long, value_enum)]
    pub sync_mode: Option<SyncMode>,

    /// Target notebook id
    #[arg(long)]
    pub notebook_id: Option<String>,

    /// Parent path (page mode) or document path (single-document mode)
    #[arg(long)]
    pub page_path: Option<String>,

    /// How memo relations are rendered
    #[arg(long, value_enum)]
    pub mark_mode: Option<MarkMode>,

    /// How consecutive images are laid out
    #[arg(long, value_enum)]
    pub image_layout: Option<ImageLayout>,

    /// Forced parent tag (empty string clears it)
    #[arg(long)]
    pub parent_tag: Option<String>,

    /// Resource field used for downloads
    #[arg(long, value_enum)]
    pub resource_download_mode: Option<DownloadMode>,

    /// Resolve `((name))` tokens to SiYuan documents
    #[arg(long)]
    pub bidirectional_links: Option<bool>,

    /// Parent path for documents created from `((name))` tokens
    #[arg(long)]
    pub subject_path: Option<String>,

    /// Render allowed videos as inline players
    #[arg(long)]
    pub video_optimization: Option<bool>,

    /// MIME subtypes played inline (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub video_extensions: Option<Vec<String>>,

    /// Log change sets and write steps at info level
    #[arg(long)]
    pub debug: Option<bool>,

    /// Advance the checkpoint even in debug mode
    #[arg(long)]
    pub update_checkpoint_in_debug: Option<bool>,

    /// Where tags are rewritten
    #[arg(long, value_enum)]
    pub tag_scope: Option<TagScope>,
}
