//! Confidence scoring for forked hypotheses.
//!
//! A child starts from its parent's confidence and is adjusted by how well
//! the candidate room fits the step that produced it:
//! - Linked by the parent's recorded exit: unchanged
//! - Parent exit recorded but empty: divided by `new_room_penalty`
//! - Parent exit leads somewhere else: divided by
//!   `new_room_penalty * multiple_connections_penalty`
//! - At exactly the expected coordinate: multiplied by `correct_position_bonus`
//! - Finally divided by `1 + mismatches`
//!
//! Scores are relative. Only their ratios to each other matter.

use crate::config::PathConfig;
use crate::core::{Comparison, Coordinate, Direction, Room};

/// Score a candidate room reached from `parent` by `movement`.
pub fn fork_confidence(
    parent: &Room,
    parent_prob: f64,
    candidate: &Room,
    comparison: Comparison,
    movement: Direction,
    config: &PathConfig,
) -> f64 {
    let mut prob = parent_prob / link_penalty(parent, candidate, movement, config);

    if expected_position(parent, movement) == Some(candidate.position) {
        prob *= config.correct_position_bonus;
    }

    prob / (1.0 + f64::from(comparison.mismatches()))
}

/// Divisor for how the candidate is (or isn't) connected to the parent.
fn link_penalty(parent: &Room, candidate: &Room, movement: Direction, config: &PathConfig) -> f64 {
    match parent.exit(movement) {
        Some(exit) if exit.contains_out(candidate.id) => 1.0,
        Some(exit) if exit.out_is_empty() => config.new_room_penalty,
        Some(_) => config.new_room_penalty * config.multiple_connections_penalty,
        None => {
            let same_room = movement == Direction::None && candidate.id == parent.id;
            if same_room || parent.connects_to(candidate.id) {
                1.0
            } else {
                config.new_room_penalty
            }
        }
    }
}

/// Where a step from `parent` should land. Unknown steps have no
/// expectation, and neither do steps off the edge of the coordinate range.
pub fn expected_position(parent: &Room, movement: Direction) -> Option<Coordinate> {
    match movement {
        Direction::Unknown => None,
        other => parent.position.step(other),
    }
}
