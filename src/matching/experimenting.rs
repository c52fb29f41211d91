//! Exhaustive accumulator.
//!
//! Every acceptable candidate is forked as a child of whichever frontier node
//! proposed it ([`Experimenting::set_origin`]). [`Experimenting::evaluate`]
//! then prunes the new frontier down to something worth keeping.

use std::collections::{HashMap, HashSet};

use crate::config::PathConfig;
use crate::core::{compare, Observation, PathId, PathTree, Room, RoomId};
use crate::map::RoomVisitor;
use crate::matching::scoring::fork_confidence;

#[derive(Debug)]
pub struct Experimenting<'a> {
    tree: &'a mut PathTree,
    event: &'a Observation,
    tolerance: u32,
    config: &'a PathConfig,
    origin: Option<PathId>,
    children: Vec<PathId>,
    seen: HashSet<(PathId, RoomId)>,
}

impl<'a> Experimenting<'a> {
    pub fn new(
        tree: &'a mut PathTree,
        event: &'a Observation,
        tolerance: u32,
        config: &'a PathConfig,
    ) -> Self {
        Self {
            tree,
            event,
            tolerance,
            config,
            origin: None,
            children: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Attribute the following candidates to `origin`.
    pub fn set_origin(&mut self, origin: PathId) {
        self.origin = Some(origin);
    }

    /// Children forked so far, in push order.
    pub fn children(&self) -> &[PathId] {
        &self.children
    }

    /// Prune and rank the new frontier.
    ///
    /// `old_leaves` is the frontier the children were forked from. The
    /// result holds at most one node per room, best first; confidences are
    /// rescaled so the best is 1.0. An empty result means every hypothesis
    /// is gone.
    pub fn evaluate(self, old_leaves: &[PathId]) -> Vec<PathId> {
        let tree = self.tree;

        for leaf in old_leaves {
            if !tree.has_children(*leaf) {
                tree.deny(*leaf);
            }
        }

        let mut kept = dedup_by_room(tree, &self.children);

        let Some(best) = best_index(tree, &kept) else {
            return Vec::new();
        };
        let best_prob = tree.prob(kept[best]);
        let second_prob = kept
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != best)
            .map(|(_, id)| tree.prob(*id))
            .fold(None, |acc: Option<f64>, p| Some(acc.map_or(p, |a| a.max(p))));

        let accept = match second_prob {
            None => true,
            Some(second) => {
                best_prob > second * self.config.accept_best_relative
                    || best_prob > second + self.config.accept_best_absolute
            }
        };
        if accept {
            let winner = kept[best];
            for id in kept.iter().filter(|id| **id != winner) {
                tree.deny(*id);
            }
            kept = vec![winner];
        } else if kept.len() > self.config.max_paths {
            tracing::debug!(
                paths = kept.len(),
                max_paths = self.config.max_paths,
                "too many hypotheses, giving up"
            );
            for id in kept {
                tree.deny(id);
            }
            return Vec::new();
        }

        if best_prob > 0.0 {
            for id in &kept {
                tree.set_prob(*id, tree.prob(*id) / best_prob);
            }
        }

        let best = best_index(tree, &kept).unwrap_or(0);
        let winner = kept.remove(best);
        kept.insert(0, winner);
        kept
    }
}

/// Keep one node per room: the more confident one, the earlier on ties.
/// The survivor takes the slot of the room's first appearance.
pub(crate) fn dedup_by_room(tree: &mut PathTree, ids: &[PathId]) -> Vec<PathId> {
    let mut kept: Vec<PathId> = Vec::with_capacity(ids.len());
    let mut slot_of: HashMap<RoomId, usize> = HashMap::new();

    for id in ids {
        let Some(room) = tree.room_id(*id) else {
            continue;
        };
        match slot_of.get(&room) {
            None => {
                slot_of.insert(room, kept.len());
                kept.push(*id);
            }
            Some(&slot) => {
                let incumbent = kept[slot];
                if tree.prob(*id) > tree.prob(incumbent) {
                    tree.deny(incumbent);
                    kept[slot] = *id;
                } else {
                    tree.deny(*id);
                }
            }
        }
    }
    kept
}

/// Index of the most confident node, the earliest on ties.
fn best_index(tree: &PathTree, ids: &[PathId]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, id) in ids.iter().enumerate() {
        match best {
            Some(b) if tree.prob(*id) <= tree.prob(ids[b]) => {}
            _ => best = Some(i),
        }
    }
    best
}

impl RoomVisitor for Experimenting<'_> {
    fn visit(&mut self, room: &Room) {
        let Some(origin) = self.origin else {
            tracing::trace!(room = %room.id, "candidate without origin ignored");
            return;
        };
        if self.seen.contains(&(origin, room.id)) {
            return;
        }
        let comparison = compare(room, self.event, self.tolerance);
        if !comparison.is_match() {
            return;
        }
        let Some(parent) = self.tree.get(origin) else {
            return;
        };
        let prob = fork_confidence(
            parent.room(),
            parent.prob(),
            room,
            comparison,
            self.event.movement,
            self.config,
        );
        self.seen.insert((origin, room.id));
        if let Some(child) = self
            .tree
            .fork(origin, room.clone(), prob, self.event.movement)
        {
            tracing::trace!(room = %room.id, prob, "forked hypothesis");
            self.children.push(child);
        }
    }
}
