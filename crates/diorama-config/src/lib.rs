//! Configuration system for the diorama globe viewer.
//!
//! Settings persist to disk as a RON file, can be overridden from the command
//! line via clap. Every section is `#[serde(default)]` so older or partial
//! files keep loading.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AnimationConfig, AssetConfig, CameraConfig, Config, DebugConfig, EarthConfig, LightingConfig,
    CONFIG_FILE_NAME, PostProcessingConfig, StarsConfig, WindowConfig, rgb_from_hex,
};
pub use error::ConfigError;
