//! roomtrack - hypothesis tracking on a partially known room graph
//!
//! An agent moves through a map of rooms one step at a time and reports what
//! it sees. The [`Tracker`] keeps track of which room the agent is in: one
//! room when it is sure, a tree of competing hypotheses when it is not, and
//! nothing at all when the evidence contradicts everything it knows. It asks
//! the map owner for new rooms and exits through a signal channel instead of
//! writing to the map itself.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod map;
pub mod matching;

pub use config::{Config, MatchingConfig, PathConfig};
pub use core::{
    Coordinate, Direction, EventType, MapAction, Observation, Outbox, PathId, PathTree, Room,
    RoomId, SignalReceiver, TraceEvent, Tracker, TrackerSignal, TrackerState, TrackerStatus,
};
pub use error::{MatchError, Result, TrackError};
pub use map::{MapStore, MemoryMap, RoomVisitor};

// CLI commands
pub use cli::{ConfigCommand, ReplayCommand};
