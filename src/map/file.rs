//! JSON fixture files for maps and observation streams.
//!
//! A map file lists rooms with their outgoing exits only:
//!
//! ```json
//! { "rooms": [ { "id": 1, "position": { "x": 0, "y": 0, "z": 0 },
//!                "properties": ["Hall"], "exits": { "north": [2] } } ] }
//! ```
//!
//! Incoming sets are derived on load. Observation streams are JSON Lines,
//! one [`Observation`] per line. Saves are atomic via temp file + rename.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::{Coordinate, Direction, Observation, Room, RoomId};
use crate::error::{Result, TrackError};
use crate::map::MemoryMap;

/// On-disk form of a map.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapFile {
    pub rooms: Vec<RoomRecord>,
}

/// On-disk form of one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub position: Coordinate,
    #[serde(default)]
    pub properties: Vec<String>,
    /// Outgoing exits keyed by direction name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub exits: BTreeMap<String, Vec<RoomId>>,
}

impl RoomRecord {
    fn from_room(room: &Room) -> Self {
        let exits = room
            .known_exits()
            .filter(|(_, exit)| !exit.out_is_empty())
            .map(|(direction, exit)| {
                (
                    direction.name().to_string(),
                    exit.outgoing.iter().copied().collect(),
                )
            })
            .collect();
        Self {
            id: room.id,
            position: room.position,
            properties: room.properties.clone(),
            exits,
        }
    }

    fn into_room(self) -> Result<Room> {
        let mut room = Room::new(self.id, self.position).with_properties(self.properties);
        for (name, targets) in self.exits {
            let direction: Direction = name.parse().unwrap_or(Direction::Unknown);
            let Some(exit) = room.exit_mut(direction) else {
                return Err(TrackError::fixture(format!(
                    "room {}: '{}' is not a known direction",
                    self.id, name
                )));
            };
            exit.outgoing.extend(targets);
        }
        Ok(room)
    }
}

impl MapFile {
    /// Snapshot a map.
    pub fn from_map(map: &MemoryMap) -> Self {
        Self {
            rooms: map.rooms().iter().map(RoomRecord::from_room).collect(),
        }
    }

    /// Build a map, rejecting duplicate ids and exits to unlisted rooms.
    pub fn into_map(self) -> Result<MemoryMap> {
        let mut seen = BTreeSet::new();
        for record in &self.rooms {
            if !seen.insert(record.id) {
                return Err(TrackError::fixture(format!(
                    "duplicate room id {}",
                    record.id
                )));
            }
        }
        for record in &self.rooms {
            if let Some(missing) = record
                .exits
                .values()
                .flatten()
                .find(|target| !seen.contains(*target))
            {
                return Err(TrackError::fixture(format!(
                    "room {} has an exit to unknown room {}",
                    record.id, missing
                )));
            }
        }

        let rooms = self
            .rooms
            .into_iter()
            .map(RoomRecord::into_room)
            .collect::<Result<Vec<Room>>>()?;
        Ok(MemoryMap::from_rooms(rooms))
    }
}

/// Parse a map from JSON text.
pub fn parse_map(json: &str) -> Result<MemoryMap> {
    let file: MapFile = serde_json::from_str(json)?;
    file.into_map()
}

/// Load a map fixture.
pub fn load_map(path: &Path) -> Result<MemoryMap> {
    let content = fs::read_to_string(path).map_err(|e| TrackError::storage(path, e))?;
    parse_map(&content)
}

/// Save a map fixture atomically.
pub fn save_map(map: &MemoryMap, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&MapFile::from_map(map))?;
    let temp_path = temp_path(path);

    {
        let mut file = fs::File::create(&temp_path).map_err(|e| TrackError::storage(&temp_path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| TrackError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| TrackError::storage(&temp_path, e))?;
    }

    // Rename temp file to final path (atomic on POSIX)
    fs::rename(&temp_path, path).map_err(|e| TrackError::storage(path, e))?;

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "map.json".to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

/// Parse an observation stream, one JSON object per line.
///
/// Blank lines and lines starting with `#` are ignored.
pub fn parse_observations(text: &str) -> Result<Vec<Observation>> {
    let mut observations = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let observation = serde_json::from_str(line).map_err(|e| {
            TrackError::fixture(format!("observation line {}: {}", number + 1, e))
        })?;
        observations.push(observation);
    }
    Ok(observations)
}

/// Load an observation stream.
pub fn load_observations(path: &Path) -> Result<Vec<Observation>> {
    let content = fs::read_to_string(path).map_err(|e| TrackError::storage(path, e))?;
    parse_observations(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::MapStore;
    use tempfile::TempDir;

    const CORRIDOR: &str = r#"{
        "rooms": [
            { "id": 1, "position": { "x": 0, "y": 0, "z": 0 },
              "properties": ["Hall", "A wide hall."], "exits": { "north": [2] } },
            { "id": 2, "position": { "x": 0, "y": -1, "z": 0 },
              "properties": ["Corridor"], "exits": { "s": [1] } }
        ]
    }"#;

    #[test]
    fn test_parse_map() {
        let map = parse_map(CORRIDOR).unwrap();
        assert_eq!(map.len(), 2);

        let hall = map.find(RoomId(1)).unwrap();
        assert!(hall.leads_to(Direction::North, RoomId(2)));
        assert!(hall.exit(Direction::North).unwrap().contains_in(RoomId(2)));
        assert_eq!(hall.properties, vec!["Hall", "A wide hall."]);
    }

    #[test]
    fn test_unknown_direction_rejected() {
        let json = r#"{ "rooms": [ { "id": 1, "position": { "x": 0, "y": 0, "z": 0 },
                         "exits": { "sideways": [1] } } ] }"#;
        assert!(matches!(parse_map(json), Err(TrackError::Fixture { .. })));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let json = r#"{ "rooms": [
            { "id": 1, "position": { "x": 0, "y": 0, "z": 0 } },
            { "id": 1, "position": { "x": 1, "y": 0, "z": 0 } } ] }"#;
        let err = parse_map(json).unwrap_err();
        assert!(err.to_string().contains("duplicate room id 1"));
    }

    #[test]
    fn test_dangling_exit_rejected() {
        let json = r#"{ "rooms": [ { "id": 1, "position": { "x": 0, "y": 0, "z": 0 },
                         "exits": { "east": [4] } } ] }"#;
        let err = parse_map(json).unwrap_err();
        assert!(err.to_string().contains("unknown room 4"));
    }

    #[test]
    fn test_invalid_json_is_serde_error() {
        assert!(matches!(parse_map("{ nope"), Err(TrackError::Serde { .. })));
    }

    #[test]
    fn test_save_and_load_map() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("map.json");
        let map = parse_map(CORRIDOR).unwrap();

        save_map(&map, &path).unwrap();
        assert!(!dir.path().join(".map.json.tmp").exists());

        let loaded = load_map(&path).unwrap();
        assert_eq!(loaded.rooms(), map.rooms());
    }

    #[test]
    fn test_load_missing_map() {
        let result = load_map(Path::new("/nonexistent/map.json"));
        assert!(matches!(result, Err(TrackError::Storage { .. })));
    }

    #[test]
    fn test_parse_observations() {
        let text = r#"
# look around first
{"movement":"none","properties":["Hall","A wide hall."]}

{"movement":"north","properties":["Corridor",null]}
{"movement":"?"}
"#;
        let observations = parse_observations(text).unwrap();
        assert_eq!(observations.len(), 3);
        assert_eq!(observations[0].movement, Direction::None);
        assert_eq!(observations[1].num_skipped(), 1);
        assert_eq!(observations[2].movement, Direction::Unknown);
    }

    #[test]
    fn test_parse_observations_reports_line() {
        let text = "{\"movement\":\"north\"}\n{\"movement\":12}\n";
        let err = parse_observations(text).unwrap_err();
        assert!(err.to_string().contains("observation line 2"));
    }

    #[test]
    fn test_load_observations_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("walk.jsonl");
        fs::write(&path, "{\"movement\":\"e\",\"properties\":[\"Cellar\"]}\n").unwrap();

        let observations = load_observations(&path).unwrap();
        assert_eq!(
            observations,
            vec![Observation::new(Direction::East).with_property("Cellar")]
        );
    }
}
