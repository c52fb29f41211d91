//! Observation matching for roomtrack.
//!
//! Matchers are [`RoomVisitor`](crate::map::RoomVisitor)s that judge the
//! candidates a map query pushes; strategies decide which queries to issue.

pub mod approved;
pub mod experimenting;
pub mod scoring;
pub mod strategy;
pub mod syncing;

pub use approved::Approved;
pub use experimenting::Experimenting;
pub use scoring::fork_confidence;
pub use strategy::{approved, try_coordinate, try_exits, ApprovedMatch, ApprovedStep, Expansion};
pub use syncing::Syncing;
