//! Platform directory resolution.
//!
//! Config and logs live under the OS configuration directory (XDG on Linux,
//! Known Folders on Windows, Library on macOS).

use std::path::{Path, PathBuf};

/// Errors that can occur while resolving or creating directories.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("could not determine OS configuration directory")]
    NoConfigDir,
    #[error("platform I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// OS-specific directory paths for the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformDirs {
    /// `config.ron`.
    pub config_dir: PathBuf,
    pub log_dir: PathBuf,
}

const APP_NAME: &str = "diorama";

impl PlatformDirs {
    /// Resolve directories without creating them.
    ///
    /// `config_override` replaces the config directory; logs then live
    /// beside it.
    pub fn resolve(config_override: Option<&Path>) -> Result<Self, PlatformError> {
        if let Some(dir) = config_override {
            return Ok(Self {
                config_dir: dir.to_path_buf(),
                log_dir: dir.join("logs"),
            });
        }
        let base = dirs::config_dir().ok_or(PlatformError::NoConfigDir)?;
        Ok(Self::resolve_with_root(&base))
    }

    /// Directories rooted under `root`, for tests.
    pub fn resolve_with_root(root: &Path) -> Self {
        let app_dir = root.join(APP_NAME);
        Self {
            config_dir: app_dir.join("config"),
            log_dir: app_dir.join("logs"),
        }
    }

    pub fn create_dirs(&self) -> Result<(), PlatformError> {
        std::fs::create_dir_all(&self.config_dir)?;
        std::fs::create_dir_all(&self.log_dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_with_root() {
        let dirs = PlatformDirs::resolve_with_root(Path::new("/tmp/root"));
        assert_eq!(dirs.config_dir, Path::new("/tmp/root/diorama/config"));
        assert_eq!(dirs.log_dir, Path::new("/tmp/root/diorama/logs"));
    }

    #[test]
    fn test_override_keeps_logs_beside_config() {
        let dirs = PlatformDirs::resolve(Some(Path::new("/etc/diorama"))).unwrap();
        assert_eq!(dirs.config_dir, Path::new("/etc/diorama"));
        assert_eq!(dirs.log_dir, Path::new("/etc/diorama/logs"));
    }

    #[test]
    fn test_create_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dirs = PlatformDirs::resolve_with_root(tmp.path());
        dirs.create_dirs().unwrap();
        assert!(dirs.config_dir.is_dir());
        assert!(dirs.log_dir.is_dir());
    }
}
