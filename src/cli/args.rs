//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Restorer - buildpack layer cache restoration
///
/// Reconciles the layers recorded by the previous build against the
/// layer cache and restores the ones that are still valid.
#[derive(Parser, Debug)]
#[command(name = "restorer")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "RESTORER_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Restore cached layers into the layers directory
    Restore(RestoreArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the restore command
#[derive(Parser, Debug, Default)]
pub struct RestoreArgs {
    /// Layers directory
    #[arg(long = "layers", env = "CNB_LAYERS_DIR")]
    pub layers_dir: Option<PathBuf>,

    /// Buildpack group file
    #[arg(long = "group", env = "CNB_GROUP_PATH")]
    pub group_path: Option<PathBuf>,

    /// Analyzed metadata file
    #[arg(long = "analyzed", env = "CNB_ANALYZED_PATH")]
    pub analyzed_path: Option<PathBuf>,

    /// Cache volume directory
    #[arg(long, env = "CNB_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Platform API version
    #[arg(long, env = "CNB_PLATFORM_API")]
    pub platform_api: Option<String>,

    /// Directory cached layer data is extracted beneath
    #[arg(long)]
    pub extract_root: Option<PathBuf>,

    /// Verify sha256 digests of cached layer data before extracting
    #[arg(long)]
    pub verify_digests: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}
