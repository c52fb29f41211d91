//! Error types for roomtrack.
//!
//! Tracking itself never fails: every ambiguous or contradictory situation
//! degrades the tracker to a safer state. The only errors that reach callers
//! come from the infrastructure around the tracker (configuration, fixture
//! files, serialization). Match failures are modelled separately in
//! [`MatchError`] and are always handled inside the tracker.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::core::RoomId;

/// The main error type for roomtrack operations.
#[derive(Error, Debug)]
pub enum TrackError {
    /// I/O errors while reading or writing fixture and config files.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading or validation errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// A map or observation fixture is structurally invalid.
    #[error("invalid fixture: {message}")]
    Fixture { message: String },
}

/// A specialized Result type for roomtrack operations.
pub type Result<T> = std::result::Result<T, TrackError>;

impl TrackError {
    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fixture error.
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }
}

impl From<io::Error> for TrackError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Why a candidate lookup did not produce a usable room.
///
/// These are local outcomes: the tracker reacts by trying the next fallback
/// or by degrading its state. They never escape the tracker.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// More than one acceptable candidate was pushed.
    #[error("ambiguous match: {candidates} candidates accepted")]
    Ambiguous { candidates: usize },

    /// No candidate was acceptable.
    #[error("no acceptable candidates")]
    NoCandidates,

    /// A reported room no longer corresponds to any live hypothesis.
    #[error("stale reference to room {id}")]
    StaleReference { id: RoomId },
}

/// Trait for fail-open error handling.
///
/// Log the error and continue with a safe value instead of aborting.
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;

    /// Handle an error by logging a warning and returning the provided fallback.
    fn fail_open_with(self, context: &str, fallback: T) -> T;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }

    fn fail_open_with(self, context: &str, fallback: T) -> T {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using fallback)", context, err);
                fallback
            }
        }
    }
}

/// Exit codes for the roomtrack CLI.
pub mod exit_codes {
    /// The command completed.
    pub const SUCCESS: i32 = 0;

    /// The command failed (bad fixture, unreadable file).
    pub const ERROR: i32 = 1;

    /// The process panicked.
    pub const CRASH: i32 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display() {
        let err = TrackError::storage(
            "/tmp/map.json",
            io::Error::new(io::ErrorKind::NotFound, "file not found"),
        );
        assert!(err.to_string().contains("storage error"));
        assert!(err.to_string().contains("/tmp/map.json"));
    }

    #[test]
    fn test_serde_error_display() {
        let err = TrackError::serde("invalid JSON");
        assert_eq!(err.to_string(), "serialization error: invalid JSON");
    }

    #[test]
    fn test_config_error_display() {
        let err = TrackError::config("invalid TOML");
        assert_eq!(err.to_string(), "config error: invalid TOML");
    }

    #[test]
    fn test_fixture_error_display() {
        let err = TrackError::fixture("duplicate room id 4");
        assert_eq!(err.to_string(), "invalid fixture: duplicate room id 4");
    }

    #[test]
    fn test_match_error_display() {
        assert_eq!(
            MatchError::Ambiguous { candidates: 3 }.to_string(),
            "ambiguous match: 3 candidates accepted"
        );
        assert_eq!(
            MatchError::NoCandidates.to_string(),
            "no acceptable candidates"
        );
        assert_eq!(
            MatchError::StaleReference { id: RoomId(7) }.to_string(),
            "stale reference to room 7"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let err: TrackError = io_err.into();
        assert!(matches!(err, TrackError::Storage { .. }));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err: TrackError = json_err.into();
        assert!(matches!(err, TrackError::Serde { .. }));
    }

    #[test]
    fn test_fail_open_default() {
        let result: Result<Vec<String>> = Err(TrackError::config("test"));
        let value = result.fail_open_default("test context");
        assert!(value.is_empty());
    }

    #[test]
    fn test_fail_open_with() {
        let result: Result<i32> = Err(TrackError::fixture("test"));
        let value = result.fail_open_with("test context", 42);
        assert_eq!(value, 42);
    }

    #[test]
    fn test_fail_open_success() {
        let result: Result<i32> = Ok(100);
        let value = result.fail_open_default("test context");
        assert_eq!(value, 100);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_codes::SUCCESS, 0);
        assert_eq!(exit_codes::ERROR, 1);
        assert_eq!(exit_codes::CRASH, 3);
    }
}
