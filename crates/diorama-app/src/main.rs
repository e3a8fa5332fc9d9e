use std::process::ExitCode;

use clap::Parser;
use diorama_app::platform::{PlatformDirs, PlatformError};
use diorama_config::{CliArgs, Config};

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("diorama: {e}");
            ExitCode::FAILURE
        }
    }
}

fn try_main() -> Result<(), AppError> {
    let args = CliArgs::parse();

    let dirs = PlatformDirs::resolve(args.config.as_deref())?;
    dirs.create_dirs()?;

    // Logging needs the config, so a load failure is reported after init.
    let (mut config, load_error) = match Config::load_or_create(&dirs.config_dir) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    config.apply_cli_overrides(&args);

    diorama_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    if let Some(e) = load_error {
        tracing::warn!("Failed to load config: {e}, using defaults");
    }
    tracing::info!("Config directory: {}", dirs.config_dir.display());

    diorama_app::window::run(config)?;
    tracing::info!("Shut down cleanly");
    Ok(())
}
