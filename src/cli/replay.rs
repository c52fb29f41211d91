//! Replay command for roomtrack.
//!
//! Feeds an observation stream to a tracker over a map fixture, applying the
//! map mutations the tracker requests as it goes, and reports where the
//! tracker thought the agent was after every step.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::{
    Coordinate, Direction, MapAction, Observation, RoomId, TraceEvent, Tracker, TrackerSignal,
    TrackerStatus,
};
use crate::error::{FailOpen, TrackError};
use crate::map::{save_map, MemoryMap};

/// Options for the replay command.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Include the transition trace.
    pub trace: bool,
    /// Write the final map here.
    pub save: Option<PathBuf>,
}

/// Output format for the replay command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayOutput {
    /// Whether the command was successful.
    pub success: bool,
    /// One entry per observation.
    pub steps: Vec<ReplayStep>,
    /// Status after the last observation.
    pub final_status: TrackerStatus,
    /// Best guess after the last observation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_room: Option<RoomId>,
    /// Rooms in the map before and after the replay.
    pub rooms_before: usize,
    pub rooms_after: usize,
    /// Transition trace, when requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<TraceEventInfo>,
    /// Error message if command failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What happened on one observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayStep {
    /// Zero-based position in the stream.
    pub index: usize,
    pub movement: Direction,
    pub status: TrackerStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Coordinate>,
    /// Number of live hypotheses (zero unless tracking many).
    pub hypotheses: usize,
    /// Map mutations requested during this step, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<MapAction>,
}

/// Simplified trace event info for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEventInfo {
    /// Event timestamp.
    pub timestamp: String,
    /// Event type.
    pub event_type: String,
    /// Status after the event.
    pub status: String,
    /// Event details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&TraceEvent> for TraceEventInfo {
    fn from(event: &TraceEvent) -> Self {
        Self {
            timestamp: event.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            event_type: format!("{:?}", event.event_type),
            status: event.status.name().to_string(),
            details: event.details.clone(),
        }
    }
}

impl ReplayOutput {
    fn failure(rooms_before: usize, error: impl Into<String>) -> Self {
        Self {
            success: false,
            steps: Vec::new(),
            final_status: TrackerStatus::Synchronized,
            final_room: None,
            rooms_before,
            rooms_after: rooms_before,
            trace: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The replay command implementation.
pub struct ReplayCommand {
    map: Arc<MemoryMap>,
    config: Config,
}

impl ReplayCommand {
    /// Create a new replay command over `map`.
    pub fn new(map: MemoryMap, config: Config) -> Self {
        Self {
            map: Arc::new(map),
            config,
        }
    }

    /// The map, including every mutation applied so far.
    pub fn map(&self) -> &MemoryMap {
        &self.map
    }

    /// Run the replay command.
    pub fn run(&self, observations: &[Observation], options: &ReplayOptions) -> ReplayOutput {
        let rooms_before = self.map.len();
        let (mut tracker, receiver) =
            Tracker::with_channel(Arc::clone(&self.map), self.config.clone());

        let mut steps = Vec::with_capacity(observations.len());
        for (index, event) in observations.iter().enumerate() {
            tracker.event(event.clone());

            let mut actions = Vec::new();
            for signal in receiver.try_iter() {
                if let TrackerSignal::Map { action } = signal {
                    self.map.apply(&action);
                    actions.push(action);
                }
            }

            let best = tracker.best_guess();
            steps.push(ReplayStep {
                index,
                movement: event.movement,
                status: tracker.status(),
                room: best.map(|room| room.id),
                position: best.map(|room| room.position),
                hypotheses: tracker.frontier().len(),
                actions,
            });
        }

        if let Some(path) = &options.save {
            if let Err(e) = save_map(&self.map, path) {
                return ReplayOutput::failure(rooms_before, format!("Failed to save map: {}", e));
            }
        }

        let trace = if options.trace {
            tracker.trace().iter().map(TraceEventInfo::from).collect()
        } else {
            Vec::new()
        };

        ReplayOutput {
            success: true,
            steps,
            final_status: tracker.status(),
            final_room: tracker.best_guess().map(|room| room.id),
            rooms_before,
            rooms_after: self.map.len(),
            trace,
            error: None,
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &ReplayOutput, options: &ReplayOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output)
                .map_err(TrackError::from)
                .fail_open_with("serializing replay output", "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &ReplayOutput) -> String {
        if !output.success {
            return format!(
                "Replay failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        let mut lines = Vec::new();
        for step in &output.steps {
            let location = match (step.room, step.position) {
                (Some(room), Some(position)) => format!(" room {} at {}", room, position),
                _ => String::new(),
            };
            let hypotheses = if step.hypotheses > 0 {
                format!(" ({} hypotheses)", step.hypotheses)
            } else {
                String::new()
            };
            lines.push(format!(
                "[{}] {:<7} -> {}{}{}",
                step.index,
                step.movement.name(),
                step.status.name(),
                location,
                hypotheses
            ));
            for action in &step.actions {
                lines.push(format!("      {}", describe_action(action)));
            }
        }

        lines.push(String::new());
        let final_room = output
            .final_room
            .map(|room| format!(" in room {}", room))
            .unwrap_or_default();
        lines.push(format!(
            "Final: {}{} after {} observations",
            output.final_status.name(),
            final_room,
            output.steps.len()
        ));
        lines.push(format!(
            "Map: {} rooms ({} created)",
            output.rooms_after,
            output.rooms_after.saturating_sub(output.rooms_before)
        ));

        if !output.trace.is_empty() {
            lines.push(String::new());
            lines.push("Transitions:".to_string());
            for event in &output.trace {
                let details = event
                    .details
                    .as_ref()
                    .map(|d| format!(" - {}", d))
                    .unwrap_or_default();
                lines.push(format!(
                    "[{}] {} -> {}{}",
                    event.timestamp, event.event_type, event.status, details
                ));
            }
        }

        lines.join("\n") + "\n"
    }
}

fn describe_action(action: &MapAction) -> String {
    match action {
        MapAction::CreateRoom { at, .. } => format!("create room at {}", at),
        MapAction::AddExit {
            from,
            to,
            direction,
        } => format!("add exit {} {} -> {}", direction, from, to),
        MapAction::UpdateRoom { id, .. } => format!("update room {}", id),
    }
}
