//! In-memory map store.
//!
//! [`MemoryMap`] is the reference [`MapStore`]: rooms keyed by id with a
//! coordinate index, behind an `RwLock` so one handle can apply
//! [`MapAction`]s while the tracker queries through another.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Coordinate, Direction, MapAction, Observation, Room, RoomId};
use crate::map::{MapStore, RoomVisitor};

#[derive(Debug, Default)]
struct MapData {
    rooms: BTreeMap<RoomId, Room>,
    by_position: BTreeMap<Coordinate, Vec<RoomId>>,
    next_id: u32,
}

impl MapData {
    fn insert(&mut self, room: Room) {
        let id = room.id;
        if let Some(old) = self.rooms.remove(&id) {
            self.unindex(id, old.position);
        }
        self.by_position.entry(room.position).or_default().push(id);
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.rooms.insert(id, room);
    }

    fn unindex(&mut self, id: RoomId, position: Coordinate) {
        if let Some(ids) = self.by_position.get_mut(&position) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                self.by_position.remove(&position);
            }
        }
    }

    fn connect(&mut self, from: RoomId, direction: Direction, to: RoomId) -> bool {
        if !direction.is_known() || !self.rooms.contains_key(&to) {
            return false;
        }
        let Some(exit) = self
            .rooms
            .get_mut(&from)
            .and_then(|room| room.exit_mut(direction))
        else {
            return false;
        };
        let added = exit.outgoing.insert(to);
        // the link arrives through the opposite side of `to`
        let Some(exit) = self
            .rooms
            .get_mut(&to)
            .and_then(|room| room.exit_mut(direction.opposite()))
        else {
            return added;
        };
        exit.incoming.insert(from) || added
    }
}

/// In-memory map store.
///
/// Iteration is always in room id order, so identical maps answer identical
/// queries identically.
#[derive(Debug, Default)]
pub struct MemoryMap {
    data: RwLock<MapData>,
}

impl MemoryMap {
    /// Create a new empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from rooms whose outgoing exits are filled in.
    ///
    /// Incoming sets are derived from the outgoing ones; whatever incoming
    /// data the rooms carried is discarded. Exits to rooms that are not in
    /// the list are dropped.
    pub fn from_rooms(rooms: impl IntoIterator<Item = Room>) -> Self {
        let mut data = MapData::default();
        let mut links = Vec::new();
        for mut room in rooms {
            for (direction, exit) in Direction::KNOWN.into_iter().zip(room.exits.iter_mut()) {
                links.extend(exit.outgoing.iter().map(|to| (room.id, direction, *to)));
                exit.outgoing.clear();
                exit.incoming.clear();
            }
            data.insert(room);
        }
        for (from, direction, to) in links {
            if !data.connect(from, direction, to) {
                tracing::debug!(%from, %to, %direction, "dropping exit to missing room");
            }
        }
        Self {
            data: RwLock::new(data),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MapData> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MapData> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert (or replace) a room under its own id.
    pub fn insert_room(&self, room: Room) {
        self.write().insert(room);
    }

    /// Create a room at `position` with a fresh id.
    pub fn add_room<I, S>(&self, position: Coordinate, properties: I) -> RoomId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut data = self.write();
        let id = RoomId(data.next_id);
        data.insert(Room::new(id, position).with_properties(properties));
        id
    }

    /// Record that leaving `from` through `direction` reaches `to`.
    ///
    /// Returns whether anything changed.
    pub fn connect(&self, from: RoomId, direction: Direction, to: RoomId) -> bool {
        self.write().connect(from, direction, to)
    }

    /// Apply a map mutation requested by the tracker.
    ///
    /// Returns whether the map changed.
    pub fn apply(&self, action: &MapAction) -> bool {
        match action {
            MapAction::CreateRoom { near, at } => {
                let mut data = self.write();
                if data.by_position.contains_key(at) {
                    tracing::trace!(%at, "room already exists, not creating");
                    return false;
                }
                let id = RoomId(data.next_id);
                data.insert(Room::new(id, *at).with_properties(near.property_values()));
                tracing::debug!(%id, %at, "created room");
                true
            }
            MapAction::AddExit {
                from,
                to,
                direction,
            } => self.connect(*from, *direction, *to),
            MapAction::UpdateRoom { id, observation } => self.update_properties(*id, observation),
        }
    }

    /// Overwrite a room's properties with the readable evidence.
    fn update_properties(&self, id: RoomId, observation: &Observation) -> bool {
        let mut data = self.write();
        let Some(room) = data.rooms.get_mut(&id) else {
            return false;
        };
        let mut changed = false;
        for (i, slot) in observation.properties.iter().enumerate() {
            let Some(value) = slot else {
                continue;
            };
            if room.properties.len() <= i {
                room.properties.resize(i + 1, String::new());
            }
            if room.properties[i] != *value {
                room.properties[i] = value.clone();
                changed = true;
            }
        }
        changed
    }

    /// Remove a room and every exit that mentions it.
    pub fn remove_room(&self, id: RoomId) -> Option<Room> {
        let mut data = self.write();
        let removed = data.rooms.remove(&id)?;
        data.unindex(id, removed.position);
        for room in data.rooms.values_mut() {
            for exit in room.exits.iter_mut() {
                exit.outgoing.remove(&id);
                exit.incoming.remove(&id);
            }
        }
        Some(removed)
    }

    /// Ids of the rooms at `position`.
    pub fn rooms_at(&self, position: Coordinate) -> Vec<RoomId> {
        self.read()
            .by_position
            .get(&position)
            .cloned()
            .unwrap_or_default()
    }

    /// Snapshot of every room, in id order.
    pub fn rooms(&self) -> Vec<Room> {
        self.read().rooms.values().cloned().collect()
    }

    /// Get the number of rooms.
    pub fn len(&self) -> usize {
        self.read().rooms.len()
    }

    /// Check if the map has no rooms.
    pub fn is_empty(&self) -> bool {
        self.read().rooms.is_empty()
    }
}

impl MapStore for MemoryMap {
    fn find(&self, id: RoomId) -> Option<Room> {
        self.read().rooms.get(&id).cloned()
    }

    fn query_by_direction(
        &self,
        from: RoomId,
        direction: Direction,
        outgoing: bool,
        visitor: &mut dyn RoomVisitor,
    ) {
        let data = self.read();
        let Some(exit) = data.rooms.get(&from).and_then(|room| room.exit(direction)) else {
            return;
        };
        for id in exit.neighbours(outgoing) {
            if let Some(room) = data.rooms.get(id) {
                visitor.visit(room);
            }
        }
    }

    fn query_by_coordinate(&self, at: Coordinate, visitor: &mut dyn RoomVisitor) {
        let data = self.read();
        let Some(ids) = data.by_position.get(&at) else {
            return;
        };
        for id in ids {
            if let Some(room) = data.rooms.get(id) {
                visitor.visit(room);
            }
        }
    }

    fn query_by_observation(&self, _event: &Observation, visitor: &mut dyn RoomVisitor) {
        for room in self.read().rooms.values() {
            visitor.visit(room);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::traits::tests::{collect_ids, test_map_store_queries};
    use std::sync::Arc;

    fn two_rooms() -> MemoryMap {
        let map = MemoryMap::new();
        let a = map.add_room(Coordinate::ORIGIN, ["Hall"]);
        let b = map.add_room(Coordinate::new(1, 0, 0), ["Kitchen"]);
        assert_eq!((a, b), (RoomId(0), RoomId(1)));
        map
    }

    #[test]
    fn test_memory_map_queries() {
        let mut rooms = vec![
            Room::new(RoomId(1), Coordinate::ORIGIN),
            Room::new(RoomId(2), Coordinate::new(1, 0, 0)),
        ];
        rooms[0]
            .exit_mut(Direction::East)
            .unwrap()
            .outgoing
            .insert(RoomId(2));
        let map = MemoryMap::from_rooms(rooms);
        test_map_store_queries(&map);
        test_map_store_queries(&Arc::new(map));
    }

    #[test]
    fn test_new_map_is_empty() {
        let map = MemoryMap::new();
        assert!(map.is_empty());
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_from_rooms_derives_incoming_and_drops_dangling() {
        let mut hall = Room::new(RoomId(1), Coordinate::ORIGIN);
        hall.exit_mut(Direction::North)
            .unwrap()
            .outgoing
            .extend([RoomId(2), RoomId(7)]);
        hall.exit_mut(Direction::South)
            .unwrap()
            .incoming
            .insert(RoomId(9));
        let map = MemoryMap::from_rooms([hall, Room::new(RoomId(2), Coordinate::new(0, -1, 0))]);

        let hall = map.find(RoomId(1)).unwrap();
        assert!(hall.leads_to(Direction::North, RoomId(2)));
        assert!(!hall.leads_to(Direction::North, RoomId(7)));
        assert!(hall.exit(Direction::South).unwrap().incoming.is_empty());
        let north = map.find(RoomId(2)).unwrap();
        assert!(north.exit(Direction::South).unwrap().contains_in(RoomId(1)));
    }

    #[test]
    fn test_connect_is_idempotent() {
        let map = two_rooms();
        assert!(map.connect(RoomId(0), Direction::East, RoomId(1)));
        assert!(!map.connect(RoomId(0), Direction::East, RoomId(1)));
        assert!(!map.connect(RoomId(0), Direction::Unknown, RoomId(1)));
        assert!(!map.connect(RoomId(0), Direction::East, RoomId(42)));

        let a = map.find(RoomId(0)).unwrap();
        assert_eq!(a.exit(Direction::East).unwrap().outgoing.len(), 1);
    }

    #[test]
    fn test_create_room_is_idempotent() {
        let map = two_rooms();
        let action = MapAction::CreateRoom {
            near: Observation::new(Direction::North).with_property("Garden"),
            at: Coordinate::new(0, -1, 0),
        };

        assert!(map.apply(&action));
        assert!(!map.apply(&action));
        assert_eq!(map.len(), 3);
        assert_eq!(map.rooms_at(Coordinate::new(0, -1, 0)), vec![RoomId(2)]);
        assert_eq!(map.find(RoomId(2)).unwrap().properties, vec!["Garden"]);

        // occupied by a pre-existing room
        let occupied = MapAction::CreateRoom {
            near: Observation::default(),
            at: Coordinate::ORIGIN,
        };
        assert!(!map.apply(&occupied));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_add_exit_action() {
        let map = two_rooms();
        let action = MapAction::AddExit {
            from: RoomId(0),
            to: RoomId(1),
            direction: Direction::East,
        };
        assert!(map.apply(&action));
        assert!(!map.apply(&action));
        assert_eq!(
            collect_ids(|v| map.query_by_direction(RoomId(1), Direction::East, false, v)),
            vec![RoomId(0)]
        );
    }

    #[test]
    fn test_update_room_skips_unreadable_slots() {
        let map = two_rooms();
        let action = MapAction::UpdateRoom {
            id: RoomId(0),
            observation: Observation::new(Direction::None)
                .with_skipped()
                .with_property("A wide hall."),
        };
        assert!(map.apply(&action));
        assert!(!map.apply(&action));
        assert_eq!(
            map.find(RoomId(0)).unwrap().properties,
            vec!["Hall".to_string(), "A wide hall.".to_string()]
        );

        let missing = MapAction::UpdateRoom {
            id: RoomId(42),
            observation: Observation::default(),
        };
        assert!(!map.apply(&missing));
    }

    #[test]
    fn test_remove_room_scrubs_exits() {
        let map = two_rooms();
        map.connect(RoomId(0), Direction::East, RoomId(1));
        map.connect(RoomId(1), Direction::West, RoomId(0));

        let removed = map.remove_room(RoomId(1)).unwrap();
        assert_eq!(removed.id, RoomId(1));
        assert!(map.remove_room(RoomId(1)).is_none());
        assert!(map.rooms_at(Coordinate::new(1, 0, 0)).is_empty());

        let a = map.find(RoomId(0)).unwrap();
        assert!(!a.connects_to(RoomId(1)));
        assert!(a.exit(Direction::East).unwrap().incoming.is_empty());
    }

    #[test]
    fn test_connect_records_incoming_on_opposite_side() {
        let map = MemoryMap::new();
        let hall = map.add_room(Coordinate::ORIGIN, ["Hall"]);
        let cell = map.add_room(Coordinate::new(5, 5, 0), ["Cell"]);
        // one-way: a trapdoor from the cell drops south into the hall
        assert!(map.connect(cell, Direction::South, hall));

        let room = map.find(hall).unwrap();
        assert!(room.exit(Direction::North).unwrap().contains_in(cell));
        assert!(room.exit(Direction::South).unwrap().incoming.is_empty());
        assert!(room.exit(Direction::North).unwrap().out_is_empty());

        assert_eq!(
            collect_ids(|v| map.query_by_direction(hall, Direction::North, false, v)),
            vec![cell]
        );
        assert!(collect_ids(|v| map.query_by_direction(hall, Direction::South, false, v)).is_empty());
    }

    #[test]
    fn test_insert_room_replaces_and_reindexes() {
        let map = two_rooms();
        map.insert_room(Room::new(RoomId(1), Coordinate::new(3, 3, 0)));
        assert!(map.rooms_at(Coordinate::new(1, 0, 0)).is_empty());
        assert_eq!(map.rooms_at(Coordinate::new(3, 3, 0)), vec![RoomId(1)]);
        assert_eq!(map.len(), 2);

        // fresh ids continue past the highest inserted id
        map.insert_room(Room::new(RoomId(10), Coordinate::new(9, 9, 9)));
        assert_eq!(map.add_room(Coordinate::new(8, 8, 8), [""]), RoomId(11));
    }

    #[test]
    fn test_rooms_in_id_order() {
        let map = MemoryMap::new();
        map.insert_room(Room::new(RoomId(5), Coordinate::ORIGIN));
        map.insert_room(Room::new(RoomId(2), Coordinate::ORIGIN));
        let ids: Vec<RoomId> = map.rooms().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![RoomId(2), RoomId(5)]);
        assert_eq!(
            collect_ids(|v| map.query_by_observation(&Observation::default(), v)),
            vec![RoomId(2), RoomId(5)]
        );
    }
}
