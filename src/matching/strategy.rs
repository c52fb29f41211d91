//! Matching strategies.
//!
//! A strategy decides which map queries to issue for an observation and
//! which matcher collects the answers. [`approved`] is the deterministic
//! single-step chain used while one room is known; [`Expansion`] grows the
//! hypothesis tree while several are.

use std::collections::HashSet;

use crate::config::Config;
use crate::core::{Coordinate, Direction, Observation, Outbox, PathId, PathTree, Room, RoomId};
use crate::error::MatchError;
use crate::map::{MapStore, RoomVisitor};
use crate::matching::{Approved, Experimenting};

/// Push the rooms linked to `room` by the observed movement.
///
/// Known movements query that exit; `Unknown` queries every known exit;
/// `None` pushes `room` itself, freshly read from the store.
pub fn try_exits<M: MapStore + ?Sized>(
    map: &M,
    room: &Room,
    event: &Observation,
    outgoing: bool,
    visitor: &mut dyn RoomVisitor,
) {
    match event.movement {
        Direction::None => {
            if let Some(current) = map.find(room.id) {
                visitor.visit(&current);
            }
        }
        Direction::Unknown => {
            for direction in Direction::KNOWN {
                map.query_by_direction(room.id, direction, outgoing, visitor);
            }
        }
        direction => map.query_by_direction(room.id, direction, outgoing, visitor),
    }
}

/// Push the rooms where the observed movement should have landed.
///
/// `Unknown` tries every known offset; `None` the room's own position.
/// Offsets that would leave the coordinate range are skipped.
pub fn try_coordinate<M: MapStore + ?Sized>(
    map: &M,
    room: &Room,
    event: &Observation,
    visitor: &mut dyn RoomVisitor,
) {
    match event.movement {
        Direction::Unknown => {
            for direction in Direction::KNOWN {
                query_step(map, room.position, direction, visitor);
            }
        }
        direction => query_step(map, room.position, direction, visitor),
    }
}

fn query_step<M: MapStore + ?Sized>(
    map: &M,
    from: Coordinate,
    direction: Direction,
    visitor: &mut dyn RoomVisitor,
) {
    if let Some(at) = from.step(direction) {
        map.query_by_coordinate(at, visitor);
    }
}

/// One step of the deterministic chain, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovedStep {
    Outgoing,
    Incoming,
    Coordinate,
    Below,
    Above,
}

impl ApprovedStep {
    /// The steps to try for a movement with this offset. The level-change
    /// fallbacks only apply to moves that stay on one level.
    pub fn sequence(offset: Coordinate) -> &'static [ApprovedStep] {
        const LEVEL: &[ApprovedStep] = &[
            ApprovedStep::Outgoing,
            ApprovedStep::Incoming,
            ApprovedStep::Coordinate,
            ApprovedStep::Below,
            ApprovedStep::Above,
        ];
        if offset.is_level() {
            LEVEL
        } else {
            &LEVEL[..3]
        }
    }

    fn query<M: MapStore + ?Sized>(
        self,
        map: &M,
        current: &Room,
        event: &Observation,
        visitor: &mut dyn RoomVisitor,
    ) {
        let expected = current.position.step(event.movement);
        let level = match self {
            ApprovedStep::Outgoing => return try_exits(map, current, event, true, visitor),
            ApprovedStep::Incoming => return try_exits(map, current, event, false, visitor),
            ApprovedStep::Coordinate => return try_coordinate(map, current, event, visitor),
            ApprovedStep::Below => -1,
            ApprovedStep::Above => 1,
        };
        if let Some(at) = expected.and_then(|c| c.shifted_z(level)) {
            map.query_by_coordinate(at, visitor);
        }
    }
}

/// Result of the deterministic chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedMatch {
    pub room: Room,
    /// The stored properties should be refreshed from the observation.
    pub update: bool,
}

/// Find the single room a step from `current` led to.
///
/// Tries each [`ApprovedStep`] in order until one yields exactly one match.
/// On failure the error of the last step is returned.
pub fn approved<M: MapStore + ?Sized>(
    map: &M,
    current: &Room,
    event: &Observation,
    tolerance: u32,
) -> Result<ApprovedMatch, MatchError> {
    let mut matcher = Approved::new(event, tolerance);
    let mut last = MatchError::NoCandidates;

    for step in ApprovedStep::sequence(event.movement.offset()) {
        matcher.reset();
        step.query(map, current, event, &mut matcher);
        match matcher.one_match() {
            Ok(room) => {
                tracing::trace!(?step, room = %room.id, "approved match");
                return Ok(ApprovedMatch {
                    room: room.clone(),
                    update: matcher.needs_update(),
                });
            }
            Err(e) => {
                tracing::trace!(?step, error = %e, "approved step failed");
                last = e;
            }
        }
    }
    Err(last)
}

/// How to grow the hypothesis tree for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    /// Consider every matching room in the map under every leaf, creating
    /// a provisional room where the step should land. Scoring ranks linked
    /// and well-placed candidates above the rest.
    Crossover,
    /// Try every neighbour in every direction.
    OneByOne,
}

impl Expansion {
    /// Crossover needs a fully readable observation and a known movement.
    pub fn select(event: &Observation) -> Expansion {
        if event.num_skipped() == 0 && event.movement.is_known() {
            Expansion::Crossover
        } else {
            Expansion::OneByOne
        }
    }

    /// Extend every leaf in `leaves` and return the evaluated frontier.
    pub fn expand<M: MapStore + ?Sized>(
        self,
        map: &M,
        tree: &mut PathTree,
        leaves: &[PathId],
        event: &Observation,
        config: &Config,
        outbox: &Outbox,
    ) -> Vec<PathId> {
        let origins: Vec<(PathId, Room)> = leaves
            .iter()
            .filter_map(|id| tree.room(*id).map(|room| (*id, room.clone())))
            .collect();

        if self == Expansion::Crossover {
            let mut requested: HashSet<RoomId> = HashSet::new();
            for (_, room) in &origins {
                if !requested.insert(room.id) {
                    continue;
                }
                match room.position.step(event.movement) {
                    Some(at) => outbox.create_room(event, at),
                    None => tracing::debug!(room = %room.id, "step leaves the map bounds"),
                }
            }
        }

        let mut matcher =
            Experimenting::new(tree, event, config.matching.tolerance, &config.paths);
        for (id, room) in &origins {
            matcher.set_origin(*id);
            match self {
                Expansion::Crossover => map.query_by_observation(event, &mut matcher),
                Expansion::OneByOne => one_by_one(map, room, event, &mut matcher),
            }
        }
        matcher.evaluate(leaves)
    }
}

fn one_by_one<M: MapStore + ?Sized>(
    map: &M,
    room: &Room,
    event: &Observation,
    visitor: &mut dyn RoomVisitor,
) {
    for direction in Direction::KNOWN {
        map.query_by_direction(room.id, direction, true, visitor);
        map.query_by_direction(room.id, direction, false, visitor);
    }
    for direction in Direction::KNOWN {
        query_step(map, room.position, direction, visitor);
    }
    if event.movement == Direction::None {
        if let Some(current) = map.find(room.id) {
            visitor.visit(&current);
        }
    }
}
