//! The hypothesis tree.
//!
//! Each candidate location the tracker is considering is a [`PathNode`]: a
//! room snapshot with a confidence score, a parent, and children. Nodes live
//! in a [`PathTree`] arena and are addressed by [`PathId`] handles that carry
//! a generation counter, so a handle to a denied node can never be confused
//! with whatever later reuses its slot.
//!
//! Denying a node removes it and its entire subtree and detaches it from its
//! parent. The parent itself is untouched, which is what lets retry fall back
//! to a parent after discarding the children.

use std::collections::HashSet;

use crate::core::{Direction, Room, RoomId};

/// Handle to a node in a [`PathTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PathId {
    index: u32,
    generation: u32,
}

/// One hypothesis: "the agent is in this room".
#[derive(Debug, Clone)]
pub struct PathNode {
    room: Room,
    prob: f64,
    direction: Direction,
    parent: Option<PathId>,
    children: Vec<PathId>,
}

impl PathNode {
    /// The hypothesised room.
    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Confidence score. Only meaningful relative to other live nodes.
    pub fn prob(&self) -> f64 {
        self.prob
    }

    /// The movement that produced this node from its parent.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The node this one was forked from, if any.
    pub fn parent(&self) -> Option<PathId> {
        self.parent
    }

    /// Live children.
    pub fn children(&self) -> &[PathId] {
        &self.children
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    node: Option<PathNode>,
}

/// Arena owning every live hypothesis node.
#[derive(Debug, Clone, Default)]
pub struct PathTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl PathTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// Whether no node is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Add a parentless node.
    pub fn root(&mut self, room: Room, prob: f64) -> PathId {
        self.alloc(PathNode {
            room,
            prob,
            direction: Direction::None,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Add a child under `parent`. Returns `None` if `parent` is not live.
    pub fn fork(
        &mut self,
        parent: PathId,
        room: Room,
        prob: f64,
        direction: Direction,
    ) -> Option<PathId> {
        if !self.is_live(parent) {
            return None;
        }
        let child = self.alloc(PathNode {
            room,
            prob,
            direction,
            parent: Some(parent),
            children: Vec::new(),
        });
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
        Some(child)
    }

    /// Whether `id` refers to a live node.
    pub fn is_live(&self, id: PathId) -> bool {
        self.get(id).is_some()
    }

    /// The node behind `id`, if live.
    pub fn get(&self, id: PathId) -> Option<&PathNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    /// The room of a live node.
    pub fn room(&self, id: PathId) -> Option<&Room> {
        self.get(id).map(PathNode::room)
    }

    /// The room id of a live node.
    pub fn room_id(&self, id: PathId) -> Option<RoomId> {
        self.room(id).map(|room| room.id)
    }

    /// Confidence of a live node, zero otherwise.
    pub fn prob(&self, id: PathId) -> f64 {
        self.get(id).map_or(0.0, PathNode::prob)
    }

    /// Overwrite the confidence of a live node.
    pub fn set_prob(&mut self, id: PathId, prob: f64) {
        if let Some(node) = self.node_mut(id) {
            node.prob = prob;
        }
    }

    /// Parent of a live node.
    pub fn parent(&self, id: PathId) -> Option<PathId> {
        self.get(id).and_then(PathNode::parent)
    }

    /// Whether a live node has any children.
    pub fn has_children(&self, id: PathId) -> bool {
        self.get(id).is_some_and(|node| !node.children.is_empty())
    }

    /// Number of ancestors above a live node.
    pub fn depth(&self, id: PathId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Cut a node loose from its parent. The node stays live as a root.
    pub fn detach(&mut self, id: PathId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|child| *child != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Remove a node and all of its descendants.
    ///
    /// Returns the number of nodes removed; zero if `id` was already dead.
    pub fn deny(&mut self, id: PathId) -> usize {
        if !self.is_live(id) {
            return 0;
        }
        self.detach(id);

        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.release(current) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// Drop every node that is neither in `keep` nor an ancestor of it.
    ///
    /// Children lists of the survivors are pruned to survivors. Returns the
    /// number of nodes removed.
    pub fn retain_ancestry(&mut self, keep: &[PathId]) -> usize {
        let mut wanted: HashSet<PathId> = HashSet::new();
        for id in keep {
            let mut current = Some(*id);
            while let Some(node_id) = current {
                if !self.is_live(node_id) || !wanted.insert(node_id) {
                    break;
                }
                current = self.parent(node_id);
            }
        }

        let doomed: Vec<PathId> = self
            .live_ids()
            .filter(|id| !wanted.contains(id))
            .collect();
        let removed = doomed.len();
        for id in doomed {
            self.release(id);
        }

        for id in &wanted {
            if let Some(node) = self.node_mut(*id) {
                node.children.retain(|child| wanted.contains(child));
            }
        }
        removed
    }

    /// Remove every node.
    pub fn clear(&mut self) {
        let ids: Vec<PathId> = self.live_ids().collect();
        for id in ids {
            self.release(id);
        }
    }

    /// Handles of all live nodes, in slot order.
    pub fn live_ids(&self) -> impl Iterator<Item = PathId> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|_| PathId {
                index: index as u32,
                generation: slot.generation,
            })
        })
    }

    fn node_mut(&mut self, id: PathId) -> Option<&mut PathNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    fn alloc(&mut self, node: PathNode) -> PathId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            return PathId {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        PathId {
            index,
            generation: 0,
        }
    }

    /// Tombstone one slot without touching relatives.
    fn release(&mut self, id: PathId) -> Option<PathNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Coordinate;

    fn room(id: u32) -> Room {
        Room::new(RoomId(id), Coordinate::new(id as i32, 0, 0))
    }

    #[test]
    fn test_root_and_fork() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        let child = tree.fork(root, room(2), 0.5, Direction::East).unwrap();

        assert_eq!(tree.len(), 2);
        assert_eq!(tree.parent(child), Some(root));
        assert_eq!(tree.get(root).unwrap().children(), &[child]);
        assert_eq!(tree.room_id(child), Some(RoomId(2)));
        assert_eq!(tree.get(child).unwrap().direction(), Direction::East);
        assert_eq!(tree.depth(child), 1);
        assert_eq!(tree.depth(root), 0);
    }

    #[test]
    fn test_fork_from_dead_parent_fails() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        tree.deny(root);
        assert!(tree.fork(root, room(2), 1.0, Direction::North).is_none());
        assert!(tree.is_empty());
    }

    #[test]
    fn test_deny_cascades_to_subtree() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        let a = tree.fork(root, room(2), 1.0, Direction::North).unwrap();
        let b = tree.fork(root, room(3), 1.0, Direction::South).unwrap();
        let a1 = tree.fork(a, room(4), 1.0, Direction::North).unwrap();
        let a2 = tree.fork(a1, room(5), 1.0, Direction::North).unwrap();

        assert_eq!(tree.deny(a), 3);
        assert!(!tree.is_live(a));
        assert!(!tree.is_live(a1));
        assert!(!tree.is_live(a2));
        assert!(tree.is_live(root));
        assert!(tree.is_live(b));
        assert_eq!(tree.get(root).unwrap().children(), &[b]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_deny_dead_node_is_noop() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        assert_eq!(tree.deny(root), 1);
        assert_eq!(tree.deny(root), 0);
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut tree = PathTree::new();
        let old = tree.root(room(1), 1.0);
        tree.deny(old);
        let new = tree.root(room(2), 1.0);

        assert!(!tree.is_live(old));
        assert!(tree.is_live(new));
        assert!(tree.room(old).is_none());
        assert_eq!(tree.room_id(new), Some(RoomId(2)));
    }

    #[test]
    fn test_detach_keeps_node_live() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        let child = tree.fork(root, room(2), 1.0, Direction::Up).unwrap();

        tree.detach(child);
        assert!(tree.is_live(child));
        assert_eq!(tree.parent(child), None);
        assert!(!tree.has_children(root));

        // denying the detached child leaves the old parent alone
        tree.deny(child);
        assert!(tree.is_live(root));
    }

    #[test]
    fn test_retain_ancestry() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        let a = tree.fork(root, room(2), 1.0, Direction::North).unwrap();
        let b = tree.fork(root, room(3), 1.0, Direction::South).unwrap();
        let a1 = tree.fork(a, room(4), 1.0, Direction::North).unwrap();
        let other = tree.root(room(9), 1.0);

        let removed = tree.retain_ancestry(&[a1]);

        assert_eq!(removed, 2);
        assert!(tree.is_live(root));
        assert!(tree.is_live(a));
        assert!(tree.is_live(a1));
        assert!(!tree.is_live(b));
        assert!(!tree.is_live(other));
        assert_eq!(tree.get(root).unwrap().children(), &[a]);
    }

    #[test]
    fn test_clear() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        tree.fork(root, room(2), 1.0, Direction::East).unwrap();
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.live_ids().count(), 0);
    }

    #[test]
    fn test_set_prob() {
        let mut tree = PathTree::new();
        let root = tree.root(room(1), 1.0);
        tree.set_prob(root, 0.25);
        assert!((tree.prob(root) - 0.25).abs() < f64::EPSILON);
        tree.deny(root);
        assert_eq!(tree.prob(root), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Property: after denying any node, no live node has a dead
            // ancestor and no live node lists a dead child.
            #[test]
            fn prop_deny_leaves_no_dangling_links(
                parents in prop::collection::vec(0usize..1000, 1..40),
                victim in 0usize..1000,
            ) {
                let mut tree = PathTree::new();
                let mut ids = vec![tree.root(room(0), 1.0)];
                for (i, p) in parents.iter().enumerate() {
                    let parent = ids[p % ids.len()];
                    let id = tree
                        .fork(parent, room(i as u32 + 1), 1.0, Direction::North)
                        .unwrap();
                    ids.push(id);
                }

                let victim = ids[victim % ids.len()];
                tree.deny(victim);
                prop_assert!(!tree.is_live(victim));

                for id in tree.live_ids().collect::<Vec<_>>() {
                    let node = tree.get(id).unwrap();
                    for child in node.children() {
                        prop_assert!(tree.is_live(*child));
                        prop_assert_eq!(tree.parent(*child), Some(id));
                    }
                    if let Some(parent) = node.parent() {
                        prop_assert!(tree.is_live(parent));
                    }
                }
                prop_assert_eq!(tree.len(), tree.live_ids().count());
            }
        }
    }
}
