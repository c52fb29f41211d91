//! Configuration loading for roomtrack.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.roomtrack/config.toml`)
//! 3. User config (`~/.roomtrack/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The tracker runs with sensible defaults
//! when no config exists.

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, TrackError};

/// Main configuration struct for roomtrack.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Property matching bounds.
    pub matching: MatchingConfig,
    /// Hypothesis scoring and pruning.
    pub paths: PathConfig,
}

/// Property matching bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchingConfig {
    /// Maximum mismatched properties still counted as a match.
    pub tolerance: u32,
    /// Maximum skipped properties an observation may carry and still be used
    /// to resynchronize.
    pub max_skipped: u32,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            tolerance: 5,
            max_skipped: 1,
        }
    }
}

/// Hypothesis scoring and pruning parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathConfig {
    /// The best hypothesis wins outright when it is this many times as
    /// likely as the runner-up.
    pub accept_best_relative: f64,
    /// The best hypothesis wins outright when it exceeds the runner-up by
    /// this much.
    pub accept_best_absolute: f64,
    /// Divisor for candidates not linked by a recorded exit.
    pub new_room_penalty: f64,
    /// Extra divisor when the recorded exit leads somewhere else.
    pub multiple_connections_penalty: f64,
    /// Multiplier for candidates at exactly the expected coordinate.
    pub correct_position_bonus: f64,
    /// Give up (and resync) when more hypotheses than this are alive.
    pub max_paths: usize,
}

/// Minimum valid max_paths value.
pub const MIN_MAX_PATHS: usize = 1;

impl PathConfig {
    /// Check if a multiplier/divisor is valid (finite and at least 1.0).
    ///
    /// Values below 1.0 would invert the meaning of a bonus or penalty.
    pub fn is_valid_factor(value: f64) -> bool {
        value.is_finite() && value >= 1.0
    }

    /// Check if an absolute margin is valid (finite and non-negative).
    pub fn is_valid_margin(value: f64) -> bool {
        value.is_finite() && value >= 0.0
    }

    /// Check if max_paths is valid (must be >= 1).
    pub fn is_valid_max_paths(value: usize) -> bool {
        value >= MIN_MAX_PATHS
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            accept_best_relative: 10.0,
            accept_best_absolute: 3.0,
            new_room_penalty: 5.0,
            multiple_connections_penalty: 2.0,
            correct_position_bonus: 5.1,
            max_paths: 1000,
        }
    }
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.roomtrack/config.toml` in cwd)
    /// 3. User config (`~/.roomtrack/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load user config from `~/.roomtrack/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = roomtrack_home()?;
        let config_path = home.join("config.toml");
        Self::load_from_file(&config_path).ok()
    }

    /// Load project config from `.roomtrack/config.toml` in the given directory.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let config_path = cwd.join(".roomtrack").join("config.toml");
        if !config_path.exists() {
            return None;
        }
        match Self::load_from_file(&config_path) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %config_path.display(), error = %e, "ignoring project config");
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path).map_err(|e| TrackError::storage(path, e))?;
        toml::from_str(&content).map_err(|e| TrackError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("ROOMTRACK_TOLERANCE") {
            match val.parse::<u32>() {
                Ok(n) => self.matching.tolerance = n,
                Err(_) => tracing::warn!(
                    "Invalid ROOMTRACK_TOLERANCE value '{}'. Expected a non-negative integer. Using '{}'.",
                    val,
                    self.matching.tolerance
                ),
            }
        }

        if let Ok(val) = env::var("ROOMTRACK_MAX_SKIPPED") {
            match val.parse::<u32>() {
                Ok(n) => self.matching.max_skipped = n,
                Err(_) => tracing::warn!(
                    "Invalid ROOMTRACK_MAX_SKIPPED value '{}'. Expected a non-negative integer. Using '{}'.",
                    val,
                    self.matching.max_skipped
                ),
            }
        }

        if let Ok(val) = env::var("ROOMTRACK_MAX_PATHS") {
            match val.parse::<usize>() {
                Ok(n) if PathConfig::is_valid_max_paths(n) => self.paths.max_paths = n,
                Ok(n) => tracing::warn!(
                    "Invalid ROOMTRACK_MAX_PATHS value '{}'. Must be >= {}. Using '{}'.",
                    n,
                    MIN_MAX_PATHS,
                    self.paths.max_paths
                ),
                Err(_) => tracing::warn!(
                    "Invalid ROOMTRACK_MAX_PATHS value '{}'. Expected a positive integer. Using '{}'.",
                    val,
                    self.paths.max_paths
                ),
            }
        }

        if let Ok(val) = env::var("ROOMTRACK_ACCEPT_BEST_RELATIVE") {
            match val.parse::<f64>() {
                Ok(n) if PathConfig::is_valid_factor(n) => self.paths.accept_best_relative = n,
                _ => tracing::warn!(
                    "Invalid ROOMTRACK_ACCEPT_BEST_RELATIVE value '{}'. Must be a number >= 1.0. Using '{}'.",
                    val,
                    self.paths.accept_best_relative
                ),
            }
        }

        if let Ok(val) = env::var("ROOMTRACK_ACCEPT_BEST_ABSOLUTE") {
            match val.parse::<f64>() {
                Ok(n) if PathConfig::is_valid_margin(n) => self.paths.accept_best_absolute = n,
                _ => tracing::warn!(
                    "Invalid ROOMTRACK_ACCEPT_BEST_ABSOLUTE value '{}'. Must be a number >= 0.0. Using '{}'.",
                    val,
                    self.paths.accept_best_absolute
                ),
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// Every field of `other` that differs from the default wins. A layer
    /// cannot set a value back to its default to undo a lower layer.
    fn merge(mut self, other: Config) -> Self {
        let default_matching = MatchingConfig::default();
        if other.matching.tolerance != default_matching.tolerance {
            self.matching.tolerance = other.matching.tolerance;
        }
        if other.matching.max_skipped != default_matching.max_skipped {
            self.matching.max_skipped = other.matching.max_skipped;
        }

        let default_paths = PathConfig::default();
        if other.paths.accept_best_relative != default_paths.accept_best_relative {
            self.paths.accept_best_relative = other.paths.accept_best_relative;
        }
        if other.paths.accept_best_absolute != default_paths.accept_best_absolute {
            self.paths.accept_best_absolute = other.paths.accept_best_absolute;
        }
        if other.paths.new_room_penalty != default_paths.new_room_penalty {
            self.paths.new_room_penalty = other.paths.new_room_penalty;
        }
        if other.paths.multiple_connections_penalty != default_paths.multiple_connections_penalty
        {
            self.paths.multiple_connections_penalty = other.paths.multiple_connections_penalty;
        }
        if other.paths.correct_position_bonus != default_paths.correct_position_bonus {
            self.paths.correct_position_bonus = other.paths.correct_position_bonus;
        }
        if other.paths.max_paths != default_paths.max_paths {
            self.paths.max_paths = other.paths.max_paths;
        }

        self
    }

    /// List every invalid value, as `(key, problem)` pairs.
    pub fn validate(&self) -> Vec<(String, String)> {
        let mut problems = Vec::new();
        let factors = [
            ("paths.accept_best_relative", self.paths.accept_best_relative),
            ("paths.new_room_penalty", self.paths.new_room_penalty),
            (
                "paths.multiple_connections_penalty",
                self.paths.multiple_connections_penalty,
            ),
            (
                "paths.correct_position_bonus",
                self.paths.correct_position_bonus,
            ),
        ];
        for (key, value) in factors {
            if !PathConfig::is_valid_factor(value) {
                problems.push((key.to_string(), format!("{} must be >= 1.0", value)));
            }
        }
        if !PathConfig::is_valid_margin(self.paths.accept_best_absolute) {
            problems.push((
                "paths.accept_best_absolute".to_string(),
                format!("{} must be >= 0.0", self.paths.accept_best_absolute),
            ));
        }
        if !PathConfig::is_valid_max_paths(self.paths.max_paths) {
            problems.push((
                "paths.max_paths".to_string(),
                format!("{} must be >= {}", self.paths.max_paths, MIN_MAX_PATHS),
            ));
        }
        problems
    }

    /// Replace every invalid value with its default, warning for each.
    pub fn sanitized(mut self) -> Self {
        let defaults = PathConfig::default();
        for (key, problem) in self.validate() {
            tracing::warn!("config {}: {} (using default)", key, problem);
            match key.as_str() {
                "paths.accept_best_relative" => {
                    self.paths.accept_best_relative = defaults.accept_best_relative
                }
                "paths.accept_best_absolute" => {
                    self.paths.accept_best_absolute = defaults.accept_best_absolute
                }
                "paths.new_room_penalty" => {
                    self.paths.new_room_penalty = defaults.new_room_penalty
                }
                "paths.multiple_connections_penalty" => {
                    self.paths.multiple_connections_penalty =
                        defaults.multiple_connections_penalty
                }
                "paths.correct_position_bonus" => {
                    self.paths.correct_position_bonus = defaults.correct_position_bonus
                }
                "paths.max_paths" => self.paths.max_paths = defaults.max_paths,
                _ => {}
            }
        }
        self
    }

    /// Serialize to TOML for display.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| TrackError::config(e.to_string()))
    }
}

/// Get the roomtrack home directory.
///
/// Checks `ROOMTRACK_HOME` first, then falls back to `~/.roomtrack`.
/// An empty `ROOMTRACK_HOME` is ignored.
pub fn roomtrack_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("ROOMTRACK_HOME") {
        if home.is_empty() {
            tracing::warn!("ROOMTRACK_HOME is empty, using default");
        } else {
            return Some(PathBuf::from(home));
        }
    }

    dirs::home_dir().map(|home| home.join(".roomtrack"))
}
