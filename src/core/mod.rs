//! Core types and logic for roomtrack.
//!
//! This module contains the map-space value types, the hypothesis tree, the
//! tracker state machine, and the signals it emits.

pub mod coordinate;
pub mod direction;
pub mod path;
pub mod room;
pub mod signals;
pub mod state;
pub mod tracker;

pub use coordinate::Coordinate;
pub use direction::{Direction, NUM_KNOWN_DIRECTIONS};
pub use path::{PathId, PathNode, PathTree};
pub use room::{compare, Comparison, Exit, Observation, Room, RoomId};
pub use signals::{MapAction, Outbox, SignalReceiver, TrackerSignal};
pub use state::{EventType, TraceEvent, TraceLog, TrackerState, TrackerStatus, TRACE_CAPACITY};
pub use tracker::Tracker;
