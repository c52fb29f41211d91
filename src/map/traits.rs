//! Map store traits for roomtrack.
//!
//! The tracker never walks the map itself. It asks a [`MapStore`] for
//! candidate rooms and the store pushes them, one at a time, into a
//! [`RoomVisitor`]. The store decides the order; the visitor decides what
//! to keep.

use std::sync::Arc;

use crate::core::{Coordinate, Direction, Observation, Room, RoomId};

/// Receives candidate rooms pushed by a [`MapStore`] query.
pub trait RoomVisitor {
    /// Consider one candidate.
    fn visit(&mut self, room: &Room);
}

impl<F> RoomVisitor for F
where
    F: FnMut(&Room),
{
    fn visit(&mut self, room: &Room) {
        self(room)
    }
}

/// Trait for map store backends.
///
/// Every query is synchronous: all matching rooms are pushed before the call
/// returns. Rooms are pushed as snapshots, so a visitor may keep clones.
pub trait MapStore: Send + Sync {
    /// Snapshot of a room by id.
    ///
    /// Returns `None` if the room doesn't exist (any more).
    fn find(&self, id: RoomId) -> Option<Room>;

    /// Push the rooms connected to `from` through `direction`.
    ///
    /// With `outgoing` the rooms reached by leaving through that exit are
    /// pushed; otherwise the rooms that arrive through it. Directions without
    /// an exit slot push nothing.
    fn query_by_direction(
        &self,
        from: RoomId,
        direction: Direction,
        outgoing: bool,
        visitor: &mut dyn RoomVisitor,
    );

    /// Push every room located at `at`.
    fn query_by_coordinate(&self, at: Coordinate, visitor: &mut dyn RoomVisitor);

    /// Push every room that could plausibly match `event`, anywhere in the map.
    fn query_by_observation(&self, event: &Observation, visitor: &mut dyn RoomVisitor);

    /// Check if a room exists.
    fn contains(&self, id: RoomId) -> bool {
        self.find(id).is_some()
    }
}

/// Blanket implementation of MapStore for Arc-wrapped stores.
///
/// This lets the tracker hold an `Arc<T>` while the caller keeps another
/// handle to apply map actions.
impl<T: MapStore + ?Sized> MapStore for Arc<T> {
    fn find(&self, id: RoomId) -> Option<Room> {
        (**self).find(id)
    }

    fn query_by_direction(
        &self,
        from: RoomId,
        direction: Direction,
        outgoing: bool,
        visitor: &mut dyn RoomVisitor,
    ) {
        (**self).query_by_direction(from, direction, outgoing, visitor)
    }

    fn query_by_coordinate(&self, at: Coordinate, visitor: &mut dyn RoomVisitor) {
        (**self).query_by_coordinate(at, visitor)
    }

    fn query_by_observation(&self, event: &Observation, visitor: &mut dyn RoomVisitor) {
        (**self).query_by_observation(event, visitor)
    }

    fn contains(&self, id: RoomId) -> bool {
        (**self).contains(id)
    }
}
