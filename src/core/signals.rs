//! Outbound signals from the tracker.
//!
//! The tracker never touches the map store's data. Position updates and map
//! mutations are queued on an unbounded channel for whoever owns the map and
//! the display to apply at their own pace. Nothing here blocks.

use crossbeam_channel::{unbounded, Receiver, Sender, TryIter};
use serde::{Deserialize, Serialize};

use crate::core::{Coordinate, Direction, Observation, RoomId};

/// A requested change to the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum MapAction {
    /// Create a room at `at` from the evidence in `near`, unless one exists there.
    CreateRoom { near: Observation, at: Coordinate },
    /// Record that leaving `from` through `direction` reaches `to`.
    AddExit {
        from: RoomId,
        to: RoomId,
        direction: Direction,
    },
    /// Refresh a room's properties from the readable evidence.
    UpdateRoom { id: RoomId, observation: Observation },
}

/// Everything the tracker emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "snake_case")]
pub enum TrackerSignal {
    /// The best-guess position changed (advisory).
    PositionChanged { room: RoomId, position: Coordinate },
    /// A map mutation request.
    Map { action: MapAction },
}

/// Sending half held by the tracker.
#[derive(Debug, Clone)]
pub struct Outbox {
    tx: Sender<TrackerSignal>,
}

/// Receiving half held by the map owner / display.
#[derive(Debug, Clone)]
pub struct SignalReceiver {
    rx: Receiver<TrackerSignal>,
}

impl Outbox {
    /// Create a connected outbox and receiver.
    pub fn channel() -> (Outbox, SignalReceiver) {
        let (tx, rx) = unbounded();
        (Outbox { tx }, SignalReceiver { rx })
    }

    /// Announce a new best-guess position.
    pub fn position_changed(&self, room: RoomId, position: Coordinate) {
        self.send(TrackerSignal::PositionChanged { room, position });
    }

    /// Request a room at `at`.
    pub fn create_room(&self, near: &Observation, at: Coordinate) {
        self.map(MapAction::CreateRoom {
            near: near.clone(),
            at,
        });
    }

    /// Request an exit from `from` to `to`.
    pub fn add_exit(&self, from: RoomId, to: RoomId, direction: Direction) {
        self.map(MapAction::AddExit {
            from,
            to,
            direction,
        });
    }

    /// Request a property refresh of `id`.
    pub fn update_room(&self, id: RoomId, observation: &Observation) {
        self.map(MapAction::UpdateRoom {
            id,
            observation: observation.clone(),
        });
    }

    fn map(&self, action: MapAction) {
        self.send(TrackerSignal::Map { action });
    }

    fn send(&self, signal: TrackerSignal) {
        if self.tx.send(signal).is_err() {
            tracing::debug!("signal receiver dropped, discarding signal");
        }
    }
}

impl SignalReceiver {
    /// Take the next queued signal without waiting.
    pub fn try_recv(&self) -> Option<TrackerSignal> {
        self.rx.try_recv().ok()
    }

    /// Iterate over every signal queued right now.
    pub fn try_iter(&self) -> TryIter<'_, TrackerSignal> {
        self.rx.try_iter()
    }

    /// Collect every signal queued right now.
    pub fn drain(&self) -> Vec<TrackerSignal> {
        self.rx.try_iter().collect()
    }

    /// Number of queued signals.
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
