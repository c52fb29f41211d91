//! Room snapshots, observations, and property comparison.
//!
//! A [`Room`] here is always a copy of what the map store held when it was
//! queried. The tracker never borrows into the store, so a hypothesis stays
//! valid even after the store changes underneath it.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::{Coordinate, Direction, NUM_KNOWN_DIRECTIONS};

/// Opaque room identifier assigned by the map store.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomId(pub u32);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Connections through one direction slot of a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exit {
    /// Rooms reached by leaving through this slot.
    pub outgoing: BTreeSet<RoomId>,
    /// Rooms that arrive here through this slot.
    pub incoming: BTreeSet<RoomId>,
}

impl Exit {
    /// Whether `id` is reached by leaving through this slot.
    pub fn contains_out(&self, id: RoomId) -> bool {
        self.outgoing.contains(&id)
    }

    /// Whether `id` arrives through this slot.
    pub fn contains_in(&self, id: RoomId) -> bool {
        self.incoming.contains(&id)
    }

    /// Whether no outgoing connection is recorded.
    pub fn out_is_empty(&self) -> bool {
        self.outgoing.is_empty()
    }

    /// Outgoing or incoming neighbours, depending on `outgoing`.
    pub fn neighbours(&self, outgoing: bool) -> &BTreeSet<RoomId> {
        if outgoing {
            &self.outgoing
        } else {
            &self.incoming
        }
    }
}

/// Snapshot of a map room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub position: Coordinate,
    /// Property values in evidence-slot order. Empty means not yet known.
    pub properties: Vec<String>,
    /// One exit per known direction, in [`Direction::KNOWN`] order.
    pub exits: Vec<Exit>,
}

impl Room {
    /// Create a room with no properties and no connections.
    pub fn new(id: RoomId, position: Coordinate) -> Self {
        Self {
            id,
            position,
            properties: Vec::new(),
            exits: vec![Exit::default(); NUM_KNOWN_DIRECTIONS],
        }
    }

    /// Set the property values.
    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    /// The exit slot for a known direction.
    pub fn exit(&self, direction: Direction) -> Option<&Exit> {
        direction.index().and_then(|i| self.exits.get(i))
    }

    /// Mutable exit slot for a known direction, growing the slot list if a
    /// deserialized room carried fewer slots.
    pub fn exit_mut(&mut self, direction: Direction) -> Option<&mut Exit> {
        let index = direction.index()?;
        if self.exits.len() < NUM_KNOWN_DIRECTIONS {
            self.exits.resize(NUM_KNOWN_DIRECTIONS, Exit::default());
        }
        self.exits.get_mut(index)
    }

    /// Whether leaving through `direction` is recorded to reach `target`.
    pub fn leads_to(&self, direction: Direction, target: RoomId) -> bool {
        self.exit(direction)
            .is_some_and(|exit| exit.contains_out(target))
    }

    /// Whether any outgoing exit reaches `target`.
    pub fn connects_to(&self, target: RoomId) -> bool {
        self.exits.iter().any(|exit| exit.contains_out(target))
    }

    /// Iterate the known directions with their exits.
    pub fn known_exits(&self) -> impl Iterator<Item = (Direction, &Exit)> {
        Direction::KNOWN.into_iter().zip(self.exits.iter())
    }
}

/// One unit of movement plus evidence.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Observation {
    /// The movement that preceded this observation.
    pub movement: Direction,
    /// Evidence slots. `None` marks a property the observer could not read.
    #[serde(default)]
    pub properties: Vec<Option<String>>,
}

impl Observation {
    /// Create an observation with no evidence.
    pub fn new(movement: Direction) -> Self {
        Self {
            movement,
            properties: Vec::new(),
        }
    }

    /// Append a known property value.
    pub fn with_property(mut self, value: impl Into<String>) -> Self {
        self.properties.push(Some(value.into()));
        self
    }

    /// Append a skipped property slot.
    pub fn with_skipped(mut self) -> Self {
        self.properties.push(None);
        self
    }

    /// Number of skipped evidence slots.
    pub fn num_skipped(&self) -> usize {
        self.properties.iter().filter(|p| p.is_none()).count()
    }

    /// Property values with skipped slots as empty strings, for creating rooms.
    pub fn property_values(&self) -> Vec<String> {
        self.properties
            .iter()
            .map(|p| p.clone().unwrap_or_default())
            .collect()
    }
}

/// Outcome of comparing a room against an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Every readable property matches.
    Equal,
    /// Matches with this many mismatched properties, within tolerance.
    Tolerance(u32),
    /// Too many mismatches.
    Different,
}

impl Comparison {
    /// Whether the room is acceptable at all.
    pub fn is_match(&self) -> bool {
        !matches!(self, Comparison::Different)
    }

    /// Number of tolerated mismatches, zero for exact matches.
    pub fn mismatches(&self) -> u32 {
        match self {
            Comparison::Tolerance(n) => *n,
            _ => 0,
        }
    }
}

/// Compare a room's properties with an observation's readable evidence.
///
/// A slot mismatches when the room has no value for it, an empty value, or a
/// different value. Skipped slots are ignored.
pub fn compare(room: &Room, event: &Observation, tolerance: u32) -> Comparison {
    let mut mismatches: u32 = 0;

    for (i, slot) in event.properties.iter().enumerate() {
        let Some(expected) = slot else {
            continue;
        };
        match room.properties.get(i) {
            Some(actual) if !actual.is_empty() && actual == expected => {}
            _ => mismatches = mismatches.saturating_add(1),
        }
    }

    if mismatches == 0 {
        Comparison::Equal
    } else if mismatches <= tolerance {
        Comparison::Tolerance(mismatches)
    } else {
        Comparison::Different
    }
}
