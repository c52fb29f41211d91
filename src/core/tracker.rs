//! The tracking state machine.
//!
//! The tracker consumes one [`Observation`] at a time and keeps its idea of
//! where the agent is. While it knows nothing it resynchronizes against the
//! whole map; while it is sure of one room it follows single deterministic
//! steps; while several rooms are plausible it grows and prunes a tree of
//! hypotheses until one wins or all are gone. It never fails: contradictory
//! evidence only ever degrades it to a less certain state.
//!
//! The tracker reads the map through [`MapStore`] and never writes to it.
//! Position updates and map mutation requests go out through an [`Outbox`].

use std::mem;

use crate::config::Config;
use crate::core::state::{EventType, TraceEvent, TraceLog, TrackerState, TrackerStatus};
use crate::core::{Observation, Outbox, PathId, PathTree, Room, RoomId, SignalReceiver};
use crate::error::MatchError;
use crate::map::MapStore;
use crate::matching::experimenting::dedup_by_room;
use crate::matching::{approved, ApprovedMatch, Expansion, Syncing};

/// Tracking state machine.
///
/// All state mutations go through this struct.
#[derive(Debug)]
pub struct Tracker<M: MapStore> {
    map: M,
    config: Config,
    outbox: Outbox,
    tree: PathTree,
    state: TrackerState,
    last_event: Option<Observation>,
    trace: TraceLog,
}

impl<M: MapStore> Tracker<M> {
    /// Create a tracker. Invalid configuration values fall back to defaults.
    pub fn new(map: M, config: Config, outbox: Outbox) -> Self {
        Self {
            map,
            config: config.sanitized(),
            outbox,
            tree: PathTree::new(),
            state: TrackerState::Synchronized,
            last_event: None,
            trace: TraceLog::default(),
        }
    }

    /// Create a tracker together with the receiver for its signals.
    pub fn with_channel(map: M, config: Config) -> (Self, SignalReceiver) {
        let (outbox, receiver) = Outbox::channel();
        (Self::new(map, config, outbox), receiver)
    }

    /// Get the current status.
    pub fn status(&self) -> TrackerStatus {
        self.state.status()
    }

    /// The full state, including the current room or frontier.
    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// The room the agent is most likely in, if any.
    pub fn best_guess(&self) -> Option<&Room> {
        match &self.state {
            TrackerState::Synchronized => None,
            TrackerState::TrackingOne(room) => Some(room),
            TrackerState::TrackingMany(frontier) => {
                frontier.first().and_then(|id| self.tree.room(*id))
            }
        }
    }

    /// The live hypotheses, best first. Empty unless tracking many.
    pub fn frontier(&self) -> &[PathId] {
        match &self.state {
            TrackerState::TrackingMany(frontier) => frontier,
            _ => &[],
        }
    }

    /// The hypothesis arena. Empty unless tracking many.
    pub fn tree(&self) -> &PathTree {
        &self.tree
    }

    /// The map store the tracker reads from.
    pub fn map(&self) -> &M {
        &self.map
    }

    /// The effective configuration, after invalid values were replaced.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Recent state transitions, oldest first.
    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    /// The observation that would be replayed by [`Tracker::retry`].
    pub fn last_event(&self) -> Option<&Observation> {
        self.last_event.as_ref()
    }

    // =========================================================================
    // Observations
    // =========================================================================

    /// Process one observation.
    pub fn event(&mut self, event: Observation) {
        self.dispatch(&event);
        self.last_event = Some(event);
    }

    fn dispatch(&mut self, event: &Observation) {
        match mem::take(&mut self.state) {
            TrackerState::Synchronized => self.synchronize(event),
            TrackerState::TrackingOne(current) => self.track_one(current, event),
            TrackerState::TrackingMany(frontier) => {
                self.track_many(TrackerStatus::TrackingMany, &frontier, event)
            }
        }
    }

    fn synchronize(&mut self, event: &Observation) {
        let skipped = event.num_skipped();
        if skipped > self.config.matching.max_skipped as usize {
            tracing::trace!(skipped, "too much evidence missing to resync");
            return;
        }

        self.tree.clear();
        let mut syncing = Syncing::new(
            &mut self.tree,
            event,
            self.config.matching.tolerance,
            self.config.paths.max_paths,
        );
        self.map.query_by_observation(event, &mut syncing);
        let frontier = syncing.evaluate();
        self.settle(TrackerStatus::Synchronized, frontier, None);
    }

    fn track_one(&mut self, current: Room, event: &Observation) {
        let current = self.map.find(current.id).unwrap_or(current);

        match approved(&self.map, &current, event, self.config.matching.tolerance) {
            Ok(ApprovedMatch { room, update }) => {
                let movement = event.movement;
                if movement.is_known() && !current.leads_to(movement, room.id) {
                    self.outbox.add_exit(current.id, room.id, movement);
                }
                if update {
                    self.outbox.update_room(room.id, event);
                }
                self.outbox.position_changed(room.id, room.position);
                self.state = TrackerState::TrackingOne(room);
            }
            Err(e) => {
                tracing::debug!(room = %current.id, error = %e, "single step failed, exploring");
                self.tree.clear();
                let root = self.tree.root(current, 1.0);
                self.track_many(TrackerStatus::TrackingOne, &[root], event);
            }
        }
    }

    fn track_many(&mut self, previous: TrackerStatus, leaves: &[PathId], event: &Observation) {
        let expansion = Expansion::select(event);
        tracing::debug!(?expansion, leaves = leaves.len(), "expanding hypotheses");
        let frontier = expansion.expand(
            &self.map,
            &mut self.tree,
            leaves,
            event,
            &self.config,
            &self.outbox,
        );
        self.settle(previous, frontier, None);
    }

    /// Adopt `frontier` as the outcome of a cycle.
    ///
    /// `cause` is recorded in the trace if given; otherwise a trace event is
    /// only recorded when the status changes.
    fn settle(&mut self, previous: TrackerStatus, frontier: Vec<PathId>, cause: Option<EventType>) {
        let mut frontier = frontier;
        frontier.retain(|id| self.tree.is_live(*id));

        let details = match frontier.len() {
            0 => {
                self.tree.clear();
                self.state = TrackerState::Synchronized;
                None
            }
            1 => {
                let room = self.tree.room(frontier[0]).cloned();
                self.tree.clear();
                match room {
                    Some(room) => {
                        self.outbox.position_changed(room.id, room.position);
                        let details = format!("room {}", room.id);
                        self.state = TrackerState::TrackingOne(room);
                        Some(details)
                    }
                    None => {
                        self.state = TrackerState::Synchronized;
                        None
                    }
                }
            }
            n => {
                self.tree.retain_ancestry(&frontier);
                let details = self.tree.room(frontier[0]).map(|room| {
                    self.outbox.position_changed(room.id, room.position);
                    format!("{} hypotheses, best room {}", n, room.id)
                });
                self.state = TrackerState::TrackingMany(frontier);
                details
            }
        };

        let status = self.state.status();
        let event_type = cause.or(match (previous, status) {
            (p, s) if p == s => None,
            (_, TrackerStatus::Synchronized) => Some(EventType::Lost),
            (TrackerStatus::Synchronized, _) => Some(EventType::Synced),
            (TrackerStatus::TrackingOne, _) => Some(EventType::Diverged),
            (TrackerStatus::TrackingMany, _) => Some(EventType::Collapsed),
        });
        if let Some(event_type) = event_type {
            self.record(event_type, details);
        }
    }

    fn record(&mut self, event_type: EventType, details: Option<String>) {
        let status = self.state.status();
        tracing::debug!(
            event = ?event_type,
            status = status.name(),
            details = details.as_deref().unwrap_or(""),
            "tracker transition"
        );
        self.trace.push(TraceEvent::new(event_type, status, details));
    }

    // =========================================================================
    // Recovery
    // =========================================================================

    /// Undo the last step and process the last observation again.
    ///
    /// A single confident room is dropped entirely. Competing hypotheses fall
    /// back to their parents.
    pub fn retry(&mut self) {
        let previous = self.status();
        match mem::take(&mut self.state) {
            TrackerState::Synchronized => {}
            TrackerState::TrackingOne(_) => self.tree.clear(),
            TrackerState::TrackingMany(frontier) => {
                let parents = self.backtrack(&frontier);
                if parents.is_empty() {
                    self.tree.clear();
                } else {
                    self.state = TrackerState::TrackingMany(parents);
                }
            }
        }
        if previous.has_position() {
            self.record(EventType::Retried, None);
        }

        match self.last_event.clone() {
            Some(event) => self.dispatch(&event),
            None => {
                let frontier = self.frontier().to_vec();
                self.settle(self.status(), frontier, None);
            }
        }
    }

    /// Replace every leaf by its parent.
    ///
    /// Parents are kept in first-seen order without repeats. The leaves are
    /// denied; roots have no parent and simply vanish.
    pub(crate) fn backtrack(&mut self, frontier: &[PathId]) -> Vec<PathId> {
        let mut parents: Vec<PathId> = Vec::new();
        for leaf in frontier {
            if let Some(parent) = self.tree.parent(*leaf) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
            }
        }
        for leaf in frontier {
            self.tree.deny(*leaf);
        }
        parents
    }

    /// The best guess is known to be wrong.
    ///
    /// With competing hypotheses the rest take over; otherwise the tracker
    /// starts over.
    pub fn invalidate_best_guess(&mut self) {
        let previous = self.status();
        match mem::take(&mut self.state) {
            TrackerState::TrackingMany(frontier) => {
                let best_room = frontier.first().and_then(|id| self.tree.room_id(*id));
                let mut rest = Vec::with_capacity(frontier.len());
                for id in frontier {
                    if self.tree.room_id(id) == best_room {
                        self.tree.deny(id);
                    } else {
                        rest.push(id);
                    }
                }
                let rest = dedup_by_room(&mut self.tree, &rest);
                self.settle(previous, rest, Some(EventType::Invalidated));
            }
            _ => {
                self.tree.clear();
                self.settle(previous, Vec::new(), Some(EventType::Invalidated));
            }
        }
    }

    /// A room was deleted from the map.
    pub fn room_removed(&mut self, id: RoomId) {
        let previous = self.status();
        let stale = match &self.state {
            TrackerState::TrackingOne(room) if room.id == id => {
                self.invalidate_best_guess();
                false
            }
            TrackerState::TrackingMany(frontier)
                if frontier.first().and_then(|f| self.tree.room_id(*f)) == Some(id) =>
            {
                self.invalidate_best_guess();
                false
            }
            TrackerState::TrackingMany(frontier) => {
                let (hit, rest): (Vec<PathId>, Vec<PathId>) = frontier
                    .iter()
                    .copied()
                    .partition(|leaf| self.tree.room_id(*leaf) == Some(id));
                if hit.is_empty() {
                    true
                } else {
                    for leaf in hit {
                        self.tree.deny(leaf);
                    }
                    self.settle(previous, rest, Some(EventType::Invalidated));
                    false
                }
            }
            _ => true,
        };

        if stale {
            tracing::debug!(error = %MatchError::StaleReference { id }, "ignoring removed room");
        }
    }

    /// Drop every hypothesis and start over.
    pub fn release_all(&mut self) {
        self.tree.clear();
        self.state = TrackerState::Synchronized;
        self.record(EventType::Released, None);
    }
}
