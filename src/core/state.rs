//! Tracker state types.
//!
//! [`TrackerState`] is what the tracker acts on; each variant carries exactly
//! the data that state needs. [`TrackerStatus`] is its plain, serializable
//! shadow for reporting. [`TraceEvent`]s record how the tracker moved between
//! states.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{PathId, Room};

/// Maximum number of trace events kept by a [`TraceLog`].
pub const TRACE_CAPACITY: usize = 128;

/// The tracker state machine.
#[derive(Debug, Clone, Default)]
pub enum TrackerState {
    /// No position known.
    #[default]
    Synchronized,
    /// Exactly one confident room.
    TrackingOne(Room),
    /// Competing hypotheses; index 0 is the best guess.
    TrackingMany(Vec<PathId>),
}

impl TrackerState {
    /// The reporting status for this state.
    pub fn status(&self) -> TrackerStatus {
        match self {
            TrackerState::Synchronized => TrackerStatus::Synchronized,
            TrackerState::TrackingOne(_) => TrackerStatus::TrackingOne,
            TrackerState::TrackingMany(_) => TrackerStatus::TrackingMany,
        }
    }
}

/// Tracker status enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackerStatus {
    /// No position known.
    #[default]
    Synchronized,
    /// One confident room.
    TrackingOne,
    /// Several hypotheses alive.
    TrackingMany,
}

impl TrackerStatus {
    /// Whether the tracker has any position at all.
    pub fn has_position(&self) -> bool {
        !matches!(self, TrackerStatus::Synchronized)
    }

    /// Lowercase name for display.
    pub fn name(&self) -> &'static str {
        match self {
            TrackerStatus::Synchronized => "synchronized",
            TrackerStatus::TrackingOne => "tracking_one",
            TrackerStatus::TrackingMany => "tracking_many",
        }
    }
}

/// A trace event for debugging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceEvent {
    /// Type of event.
    pub event_type: EventType,
    /// Status after the event.
    pub status: TrackerStatus,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Optional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl TraceEvent {
    /// Create a new trace event.
    pub fn new(event_type: EventType, status: TrackerStatus, details: Option<String>) -> Self {
        Self {
            event_type,
            status,
            timestamp: Utc::now(),
            details,
        }
    }
}

/// Types of trace events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Resync found one or more candidate rooms.
    Synced,
    /// Deterministic matching failed; hypotheses seeded at the last room.
    Diverged,
    /// Hypotheses collapsed to a single room.
    Collapsed,
    /// Every hypothesis was eliminated.
    Lost,
    /// The best guess was invalidated.
    Invalidated,
    /// The last step was undone.
    Retried,
    /// Every hypothesis was released on request.
    Released,
}

/// Bounded log of trace events; the oldest are dropped first.
#[derive(Debug, Clone)]
pub struct TraceLog {
    events: VecDeque<TraceEvent>,
    capacity: usize,
}

impl Default for TraceLog {
    fn default() -> Self {
        Self::with_capacity(TRACE_CAPACITY)
    }
}

impl TraceLog {
    /// Create a log holding at most `capacity` events.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity.min(TRACE_CAPACITY)),
            capacity,
        }
    }

    /// Append an event, evicting the oldest when full.
    pub fn push(&mut self, event: TraceEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Number of retained events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are retained.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Retained events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter()
    }

    /// The most recent event.
    pub fn last(&self) -> Option<&TraceEvent> {
        self.events.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Coordinate, RoomId};

    #[test]
    fn test_state_status() {
        assert_eq!(
            TrackerState::Synchronized.status(),
            TrackerStatus::Synchronized
        );
        let room = Room::new(RoomId(1), Coordinate::ORIGIN);
        assert_eq!(
            TrackerState::TrackingOne(room).status(),
            TrackerStatus::TrackingOne
        );
        assert_eq!(
            TrackerState::TrackingMany(Vec::new()).status(),
            TrackerStatus::TrackingMany
        );
        assert!(matches!(TrackerState::default(), TrackerState::Synchronized));
    }

    #[test]
    fn test_has_position() {
        assert!(!TrackerStatus::Synchronized.has_position());
        assert!(TrackerStatus::TrackingOne.has_position());
        assert!(TrackerStatus::TrackingMany.has_position());
    }

    #[test]
    fn test_status_serialization() {
        let statuses = vec![
            TrackerStatus::Synchronized,
            TrackerStatus::TrackingOne,
            TrackerStatus::TrackingMany,
        ];

        for status in statuses {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.name()));
            let deserialized: TrackerStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(status, deserialized);
        }
    }

    #[test]
    fn test_trace_event() {
        let event = TraceEvent::new(
            EventType::Synced,
            TrackerStatus::TrackingOne,
            Some("room 4".to_string()),
        );

        assert_eq!(event.event_type, EventType::Synced);
        assert_eq!(event.status, TrackerStatus::TrackingOne);
        assert_eq!(event.details, Some("room 4".to_string()));
    }

    #[test]
    fn test_event_type_serialization() {
        let json = serde_json::to_string(&EventType::Diverged).unwrap();
        assert_eq!(json, "\"diverged\"");
        let parsed: EventType = serde_json::from_str("\"collapsed\"").unwrap();
        assert_eq!(parsed, EventType::Collapsed);
    }

    #[test]
    fn test_trace_log_evicts_oldest() {
        let mut log = TraceLog::with_capacity(2);
        for event_type in [EventType::Synced, EventType::Diverged, EventType::Lost] {
            log.push(TraceEvent::new(event_type, TrackerStatus::Synchronized, None));
        }

        assert_eq!(log.len(), 2);
        let types: Vec<EventType> = log.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::Diverged, EventType::Lost]);
        assert_eq!(log.last().unwrap().event_type, EventType::Lost);
    }

    #[test]
    fn test_trace_log_zero_capacity() {
        let mut log = TraceLog::with_capacity(0);
        log.push(TraceEvent::new(
            EventType::Synced,
            TrackerStatus::TrackingOne,
            None,
        ));
        assert!(log.is_empty());
    }

    #[test]
    fn test_default_trace_log_capacity() {
        let mut log = TraceLog::default();
        for _ in 0..(TRACE_CAPACITY + 10) {
            log.push(TraceEvent::new(
                EventType::Collapsed,
                TrackerStatus::TrackingOne,
                None,
            ));
        }
        assert_eq!(log.len(), TRACE_CAPACITY);
    }
}
