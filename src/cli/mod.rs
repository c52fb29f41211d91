//! CLI commands for roomtrack.
//!
//! - **replay**: feed an observation stream through a tracker over a map
//! - **config**: show the effective configuration

pub mod config_cmd;
pub mod replay;

pub use config_cmd::ConfigCommand;
pub use replay::ReplayCommand;
