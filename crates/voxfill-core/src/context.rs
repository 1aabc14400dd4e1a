//! Process-wide directories, resolved once at startup.

use std::path::{Path, PathBuf};

use crate::error::AppError;

const APP_DIR: &str = "voxfill";

/// Directories and flags shared by the resolution flow, the executor and the
/// provider client. Built once in `main` and passed down explicitly.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    /// User-editable files: `config.toml` and the `.debug` marker.
    pub user_files_dir: PathBuf,
    /// Downloads not yet registered with the media store.
    pub temp_dir: PathBuf,
    /// Hourly failure logs.
    pub log_dir: PathBuf,
    /// Set when `<user_files_dir>/.debug` exists.
    pub debug_mode: bool,
}

impl RuntimeContext {
    /// Lays out the standard directories below `root`.
    pub fn with_root(root: &Path) -> Self {
        let user_files_dir = root.join("user_files");
        let debug_mode = user_files_dir.join(".debug").is_file();
        Self {
            log_dir: user_files_dir.join("logs"),
            temp_dir: root.join("temp"),
            user_files_dir,
            debug_mode,
        }
    }

    /// Uses the platform config directory (e.g. `~/.config/voxfill`).
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` when the platform has no config dir.
    pub fn from_platform_dirs() -> Result<Self, AppError> {
        let root = default_root()
            .ok_or_else(|| AppError::ConfigError("no platform config directory".to_string()))?;
        Ok(Self::with_root(&root))
    }

    /// Creates every directory that does not exist yet.
    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [&self.temp_dir, &self.user_files_dir, &self.log_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.user_files_dir.join("config.toml")
    }
}

/// Default root directory: `<config_dir>/voxfill`.
pub fn default_root() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join(APP_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let ctx = RuntimeContext::with_root(Path::new("/tmp/vf"));
        assert_eq!(ctx.user_files_dir, Path::new("/tmp/vf/user_files"));
        assert_eq!(ctx.log_dir, Path::new("/tmp/vf/user_files/logs"));
        assert_eq!(ctx.temp_dir, Path::new("/tmp/vf/temp"));
        assert_eq!(ctx.config_path(), Path::new("/tmp/vf/user_files/config.toml"));
    }

    #[test]
    fn test_ensure_dirs_and_debug_marker() {
        let root = tempfile::tempdir().unwrap();
        let ctx = RuntimeContext::with_root(root.path());
        assert!(!ctx.debug_mode);

        ctx.ensure_dirs().unwrap();
        assert!(ctx.log_dir.is_dir());
        assert!(ctx.temp_dir.is_dir());

        std::fs::write(ctx.user_files_dir.join(".debug"), "").unwrap();
        assert!(RuntimeContext::with_root(root.path()).debug_mode);
    }
}
