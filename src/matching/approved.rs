//! Single-match accumulator.

use crate::core::{compare, Comparison, Observation, Room, RoomId};
use crate::error::MatchError;
use crate::map::RoomVisitor;

/// Accepts at most one distinct room; a second one makes the round ambiguous.
#[derive(Debug)]
pub struct Approved<'a> {
    event: &'a Observation,
    tolerance: u32,
    matched: Option<(Room, Comparison)>,
    /// Distinct accepted ids, in push order.
    accepted: Vec<RoomId>,
}

impl<'a> Approved<'a> {
    pub fn new(event: &'a Observation, tolerance: u32) -> Self {
        Self {
            event,
            tolerance,
            matched: None,
            accepted: Vec::new(),
        }
    }

    /// Forget everything accepted so far.
    pub fn reset(&mut self) {
        self.matched = None;
        self.accepted.clear();
    }

    /// The unique accepted room.
    pub fn one_match(&self) -> Result<&Room, MatchError> {
        match (&self.matched, self.accepted.len()) {
            (Some((room, _)), 1) => Ok(room),
            (_, 0) => Err(MatchError::NoCandidates),
            (_, candidates) => Err(MatchError::Ambiguous { candidates }),
        }
    }

    /// Whether the unique match only matched within tolerance while the
    /// observation was fully readable, so the stored properties are stale.
    pub fn needs_update(&self) -> bool {
        self.one_match().is_ok()
            && self.event.num_skipped() == 0
            && matches!(self.matched, Some((_, Comparison::Tolerance(_))))
    }
}

impl RoomVisitor for Approved<'_> {
    fn visit(&mut self, room: &Room) {
        if self.accepted.contains(&room.id) {
            return;
        }
        let comparison = compare(room, self.event, self.tolerance);
        if !comparison.is_match() {
            tracing::trace!(room = %room.id, "rejected candidate");
            return;
        }
        self.accepted.push(room.id);
        if self.matched.is_none() {
            self.matched = Some((room.clone(), comparison));
        }
    }
}
