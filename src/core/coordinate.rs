//! Integer 3-D coordinates for room positions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::Direction;

/// A position in map space.
///
/// `z` is the vertical level. Ordering is lexicographic on `(x, y, z)` so
/// coordinates can key ordered indexes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coordinate {
    /// The zero offset.
    pub const ORIGIN: Coordinate = Coordinate::new(0, 0, 0);

    /// Create a coordinate.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum, or `None` if any component overflows.
    pub fn checked_add(self, rhs: Coordinate) -> Option<Coordinate> {
        Some(Coordinate::new(
            self.x.checked_add(rhs.x)?,
            self.y.checked_add(rhs.y)?,
            self.z.checked_add(rhs.z)?,
        ))
    }

    /// Where one step in `direction` lands. `Unknown` and `None` stay put.
    pub fn step(self, direction: Direction) -> Option<Coordinate> {
        self.checked_add(direction.offset())
    }

    /// Same position shifted by `dz` levels.
    pub fn shifted_z(self, dz: i32) -> Option<Coordinate> {
        Some(Coordinate::new(self.x, self.y, self.z.checked_add(dz)?))
    }

    /// Whether this offset stays on the same level.
    pub const fn is_level(&self) -> bool {
        self.z == 0
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_add() {
        let a = Coordinate::new(1, 2, 3);
        let b = Coordinate::new(-1, 0, 2);
        assert_eq!(a.checked_add(b), Some(Coordinate::new(0, 2, 5)));
        assert_eq!(
            Coordinate::new(i32::MAX, 0, 0).checked_add(Coordinate::new(1, 0, 0)),
            None
        );
    }

    #[test]
    fn test_step() {
        let c = Coordinate::new(4, 5, 0);
        assert_eq!(c.step(Direction::North), Some(Coordinate::new(4, 4, 0)));
        assert_eq!(c.step(Direction::Up), Some(Coordinate::new(4, 5, 1)));
        assert_eq!(c.step(Direction::None), Some(c));
        assert_eq!(c.step(Direction::Unknown), Some(c));
    }

    #[test]
    fn test_step_at_range_edge() {
        let east_edge = Coordinate::new(i32::MAX, 0, 0);
        assert_eq!(east_edge.step(Direction::East), None);
        assert_eq!(
            east_edge.step(Direction::West),
            Some(Coordinate::new(i32::MAX - 1, 0, 0))
        );
        assert_eq!(Coordinate::new(0, i32::MIN, 0).step(Direction::North), None);
        assert_eq!(Coordinate::new(0, 0, i32::MIN).step(Direction::Down), None);
    }

    #[test]
    fn test_shifted_z() {
        let c = Coordinate::new(4, 5, 0);
        assert_eq!(c.shifted_z(-1), Some(Coordinate::new(4, 5, -1)));
        assert_eq!(c.shifted_z(1), Some(Coordinate::new(4, 5, 1)));
        assert_eq!(Coordinate::new(0, 0, i32::MAX).shifted_z(1), None);
    }

    #[test]
    fn test_is_level() {
        assert!(Coordinate::new(1, 0, 0).is_level());
        assert!(!Coordinate::new(0, 0, 1).is_level());
    }

    #[test]
    fn test_display() {
        assert_eq!(Coordinate::new(1, -2, 3).to_string(), "(1, -2, 3)");
    }

    #[test]
    fn test_serialization() {
        let c = Coordinate::new(1, 2, -3);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"x":1,"y":2,"z":-3}"#);
    }
}
