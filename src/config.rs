//! Environment loading.
//!
//! The env file has to be read before the logger exists (it may set
//! `RUST_LOG`), so loading returns an [`EnvFile`] that is reported once
//! logging is up.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, warn};

/// Outcome of loading an env file.
#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    Missing,
    Invalid {
        path: Option<PathBuf>,
        error: dotenvy::Error,
    },
}

impl EnvFile {
    pub fn is_loaded(&self) -> bool {
        matches!(self, EnvFile::Loaded(_))
    }

    /// Writes the outcome to the log: debug when loaded, warn when invalid.
    pub fn report(&self) {
        match self {
            EnvFile::Loaded(path) => {
                debug!("Loaded environment variables from {}", path.display())
            }
            EnvFile::Missing => {}
            EnvFile::Invalid {
                path: Some(path),
                error,
            } => warn!("Failed to load {}: {}", path.display(), error),
            EnvFile::Invalid { path: None, error } => {
                warn!("Failed to load .env file: {}", error)
            }
        }
    }
}

/// Loads `.env` from the working directory or one of its parents.
///
/// A missing file is fine. A file that cannot be parsed is skipped.
/// Variables already present in the environment are kept.
pub fn load_env_file() -> EnvFile {
    match dotenvy::dotenv() {
        Ok(path) => EnvFile::Loaded(path),
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => EnvFile::Missing,
        Err(error) => EnvFile::Invalid { path: None, error },
    }
}

/// Loads a specific env file. Same rules as [`load_env_file`].
pub fn load_env_file_from(path: &Path) -> EnvFile {
    match dotenvy::from_path(path) {
        Ok(()) => EnvFile::Loaded(path.to_path_buf()),
        Err(dotenvy::Error::Io(e)) if e.kind() == ErrorKind::NotFound => EnvFile::Missing,
        Err(error) => EnvFile::Invalid {
            path: Some(path.to_path_buf()),
            error,
        },
    }
}
