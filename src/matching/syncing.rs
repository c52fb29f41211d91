//! Resync accumulator.
//!
//! Used when the tracker has no position at all. Every acceptable room in
//! the map becomes a root hypothesis.

use std::collections::HashSet;

use crate::core::{compare, Observation, PathId, PathTree, Room, RoomId};
use crate::map::RoomVisitor;

#[derive(Debug)]
pub struct Syncing<'a> {
    tree: &'a mut PathTree,
    event: &'a Observation,
    tolerance: u32,
    max_paths: usize,
    roots: Vec<PathId>,
    seen: HashSet<RoomId>,
}

impl<'a> Syncing<'a> {
    pub fn new(
        tree: &'a mut PathTree,
        event: &'a Observation,
        tolerance: u32,
        max_paths: usize,
    ) -> Self {
        Self {
            tree,
            event,
            tolerance,
            max_paths,
            roots: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Number of roots created so far.
    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The new frontier, best first and otherwise in push order.
    ///
    /// Too many roots means the evidence is too weak to be useful: all of
    /// them are denied and nothing is returned.
    pub fn evaluate(mut self) -> Vec<PathId> {
        let mut roots = self.roots;
        if roots.len() > self.max_paths {
            tracing::debug!(
                roots = roots.len(),
                max_paths = self.max_paths,
                "too many resync candidates, giving up"
            );
            for id in roots {
                self.tree.deny(id);
            }
            return Vec::new();
        }

        let mut best = 0;
        for (i, id) in roots.iter().enumerate() {
            if self.tree.prob(*id) > self.tree.prob(roots[best]) {
                best = i;
            }
        }
        if best > 0 {
            let id = roots.remove(best);
            roots.insert(0, id);
        }
        roots
    }
}

impl RoomVisitor for Syncing<'_> {
    fn visit(&mut self, room: &Room) {
        if self.seen.contains(&room.id) {
            return;
        }
        let comparison = compare(room, self.event, self.tolerance);
        if !comparison.is_match() {
            return;
        }
        self.seen.insert(room.id);
        let prob = 1.0 / (1.0 + f64::from(comparison.mismatches()));
        tracing::trace!(room = %room.id, prob, "resync candidate");
        self.roots.push(self.tree.root(room.clone(), prob));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Coordinate, Direction};

    fn room(id: u32, props: &[&str]) -> Room {
        Room::new(RoomId(id), Coordinate::new(id as i32, 0, 0)).with_properties(props.to_vec())
    }

    #[test]
    fn test_roots_for_every_match() {
        let mut tree = PathTree::new();
        let event = Observation::new(Direction::None).with_property("Hall");
        let mut syncing = Syncing::new(&mut tree, &event, 0, 10);

        syncing.visit(&room(1, &["Hall"]));
        syncing.visit(&room(2, &["Kitchen"]));
        syncing.visit(&room(3, &["Hall"]));
        syncing.visit(&room(1, &["Hall"]));
        assert_eq!(syncing.len(), 2);

        let roots = syncing.evaluate();
        let rooms: Vec<RoomId> = roots.iter().map(|id| tree.room_id(*id).unwrap()).collect();
        assert_eq!(rooms, vec![RoomId(1), RoomId(3)]);
        assert!(roots.iter().all(|id| tree.parent(*id).is_none()));
    }

    #[test]
    fn test_prob_from_mismatches_and_best_first() {
        let mut tree = PathTree::new();
        let event = Observation::new(Direction::None)
            .with_property("Hall")
            .with_property("Dusty.");
        let mut syncing = Syncing::new(&mut tree, &event, 1, 10);

        syncing.visit(&room(1, &["Hall", "Clean."]));
        syncing.visit(&room(2, &["Hall", "Dusty."]));
        let roots = syncing.evaluate();

        assert_eq!(tree.room_id(roots[0]), Some(RoomId(2)));
        assert!((tree.prob(roots[0]) - 1.0).abs() < f64::EPSILON);
        assert!((tree.prob(roots[1]) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_too_many_roots_denied() {
        let mut tree = PathTree::new();
        let event = Observation::new(Direction::None);
        let mut syncing = Syncing::new(&mut tree, &event, 0, 2);
        for id in 0..3 {
            syncing.visit(&room(id, &[]));
        }
        assert!(syncing.evaluate().is_empty());
        assert!(tree.is_empty());
    }
}
