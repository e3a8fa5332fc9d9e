//! Command-line argument parsing for the globe viewer.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Diorama globe viewer command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "diorama", about = "Interactive diorama Earth viewer")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Skip building the post-processing chain and render directly.
    #[arg(long)]
    pub no_post_processing: bool,

    /// Start the localhost debug HTTP API.
    #[arg(long)]
    pub debug_api: bool,

    /// Port for the debug HTTP API.
    #[arg(long)]
    pub debug_port: Option<u16>,

    /// Directory containing the globe textures.
    #[arg(long)]
    pub assets: Option<PathBuf>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if args.no_post_processing {
            self.post_processing.enabled = false;
        }
        if args.debug_api {
            self.debug.debug_api = true;
        }
        if let Some(port) = args.debug_port {
            self.debug.debug_port = port;
        }
        if let Some(ref dir) = args.assets {
            self.assets.texture_dir = dir.clone();
        }
    }
}
