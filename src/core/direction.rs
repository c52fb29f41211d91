//! Movement direction vocabulary.
//!
//! Six directions are "known": they have an exit slot on every room and a unit
//! offset in map space. `Unknown` means the agent moved but the direction was
//! not recognised; `None` means the agent did not move at all. Both have the
//! zero offset and are searched exhaustively rather than by exit slot.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::Coordinate;

/// Number of directions with their own exit slot.
pub const NUM_KNOWN_DIRECTIONS: usize = 6;

/// A movement direction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[serde(alias = "n")]
    North,
    #[serde(alias = "s")]
    South,
    #[serde(alias = "e")]
    East,
    #[serde(alias = "w")]
    West,
    #[serde(alias = "u")]
    Up,
    #[serde(alias = "d")]
    Down,
    /// Moved, but in an unrecognised direction.
    #[default]
    #[serde(alias = "?")]
    Unknown,
    /// Did not move.
    #[serde(alias = "-")]
    None,
}

impl Direction {
    /// The known directions in exit-slot order.
    pub const KNOWN: [Direction; NUM_KNOWN_DIRECTIONS] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
    ];

    /// Whether this direction has its own exit slot.
    pub fn is_known(self) -> bool {
        self.index().is_some()
    }

    /// Exit slot index, for known directions only.
    pub fn index(self) -> Option<usize> {
        match self {
            Direction::North => Some(0),
            Direction::South => Some(1),
            Direction::East => Some(2),
            Direction::West => Some(3),
            Direction::Up => Some(4),
            Direction::Down => Some(5),
            Direction::Unknown | Direction::None => None,
        }
    }

    /// Direction for an exit slot index. Indexes past the known range are `Unknown`.
    pub fn from_index(index: usize) -> Direction {
        Self::KNOWN
            .get(index)
            .copied()
            .unwrap_or(Direction::Unknown)
    }

    /// Unit offset of a step in this direction.
    pub fn offset(self) -> Coordinate {
        match self {
            Direction::North => Coordinate::new(0, -1, 0),
            Direction::South => Coordinate::new(0, 1, 0),
            Direction::East => Coordinate::new(1, 0, 0),
            Direction::West => Coordinate::new(-1, 0, 0),
            Direction::Up => Coordinate::new(0, 0, 1),
            Direction::Down => Coordinate::new(0, 0, -1),
            Direction::Unknown | Direction::None => Coordinate::ORIGIN,
        }
    }

    /// The reverse direction. `Unknown` and `None` are their own opposites.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            other => other,
        }
    }

    /// Single-character code.
    pub fn as_char(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::East => 'e',
            Direction::West => 'w',
            Direction::Up => 'u',
            Direction::Down => 'd',
            Direction::Unknown => '?',
            Direction::None => '-',
        }
    }

    /// Parse a single-character code. Unrecognised characters are `Unknown`.
    pub fn from_char(c: char) -> Direction {
        match c.to_ascii_lowercase() {
            'n' => Direction::North,
            's' => Direction::South,
            'e' => Direction::East,
            'w' => Direction::West,
            'u' => Direction::Up,
            'd' => Direction::Down,
            '-' => Direction::None,
            _ => Direction::Unknown,
        }
    }

    /// Lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Unknown => "unknown",
            Direction::None => "none",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    /// Accepts full names or single-character codes; anything else is `Unknown`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        let direction = match lower.as_str() {
            "north" => Direction::North,
            "south" => Direction::South,
            "east" => Direction::East,
            "west" => Direction::West,
            "up" => Direction::Up,
            "down" => Direction::Down,
            "none" | "look" => Direction::None,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Direction::from_char(c),
                    _ => Direction::Unknown,
                }
            }
        };
        Ok(direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_directions() {
        for (i, dir) in Direction::KNOWN.iter().enumerate() {
            assert!(dir.is_known());
            assert_eq!(dir.index(), Some(i));
            assert_eq!(Direction::from_index(i), *dir);
        }
        assert!(!Direction::Unknown.is_known());
        assert!(!Direction::None.is_known());
    }

    #[test]
    fn test_from_index_out_of_range_is_unknown() {
        assert_eq!(Direction::from_index(6), Direction::Unknown);
        assert_eq!(Direction::from_index(usize::MAX), Direction::Unknown);
    }

    #[test]
    fn test_offsets_cancel_with_opposite() {
        for dir in Direction::KNOWN {
            assert_eq!(
                dir.offset().checked_add(dir.opposite().offset()),
                Some(Coordinate::ORIGIN)
            );
            assert_ne!(dir.offset(), Coordinate::ORIGIN);
        }
        assert_eq!(Direction::Unknown.offset(), Coordinate::ORIGIN);
        assert_eq!(Direction::None.offset(), Coordinate::ORIGIN);
    }

    #[test]
    fn test_only_up_down_are_vertical() {
        for dir in Direction::KNOWN {
            let vertical = matches!(dir, Direction::Up | Direction::Down);
            assert_eq!(!dir.offset().is_level(), vertical);
        }
    }

    #[test]
    fn test_char_codes() {
        for dir in Direction::KNOWN {
            assert_eq!(Direction::from_char(dir.as_char()), dir);
        }
        assert_eq!(Direction::from_char('-'), Direction::None);
        assert_eq!(Direction::from_char('x'), Direction::Unknown);
        assert_eq!(Direction::from_char('N'), Direction::North);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("north".parse::<Direction>().unwrap(), Direction::North);
        assert_eq!("D".parse::<Direction>().unwrap(), Direction::Down);
        assert_eq!("look".parse::<Direction>().unwrap(), Direction::None);
        assert_eq!("climb".parse::<Direction>().unwrap(), Direction::Unknown);
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Direction::West).unwrap();
        assert_eq!(json, "\"west\"");
        let parsed: Direction = serde_json::from_str("\"none\"").unwrap();
        assert_eq!(parsed, Direction::None);
        let parsed: Direction = serde_json::from_str("\"u\"").unwrap();
        assert_eq!(parsed, Direction::Up);
    }
}
