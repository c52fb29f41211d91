//! Map storage for roomtrack.
//!
//! This module provides the map store contract the tracker queries, an
//! in-memory implementation, and JSON fixture loading.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::{load_map, load_observations, parse_map, parse_observations, save_map, MapFile};
pub use memory::MemoryMap;
pub use traits::{MapStore, RoomVisitor};
