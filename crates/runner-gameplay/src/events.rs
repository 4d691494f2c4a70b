//! Event bus for track and run notifications.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{bounded, Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::warn;

use runner_common::{PlacementId, SegmentId};
use runner_track::TurnState;

/// Events published by the game controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackEvent {
    /// A segment was accepted into the queue
    SegmentPlaced {
        /// Placement slot
        slot: PlacementId,
        /// Catalog ID
        id: SegmentId,
    },
    /// A candidate failed the clearance probe
    SegmentRejected {
        /// Catalog ID
        id: SegmentId,
    },
    /// A fork branch was taken
    ForkResolved {
        /// Catalog ID of the fork
        segment: SegmentId,
        /// Decision that resolved it
        turn: TurnState,
    },
    /// Rails were extended
    PathExtended {
        /// Points appended to the center rail
        points: usize,
    },
    /// Generation failed and the level was regenerated
    GenerationFailed {
        /// Error message
        reason: String,
    },
    /// All segments were removed
    LevelReset,
    /// The character died
    RunEnded {
        /// Final score
        score: i32,
        /// High score after the run
        high_score: i32,
        /// Whether the run set a new high score
        new_record: bool,
    },
}

/// Bounded event queue. Events are dropped, with a warning, when it is full.
#[derive(Debug)]
pub struct EventBus {
    sender: Sender<TrackEvent>,
    receiver: Receiver<TrackEvent>,
    capacity: usize,
    dropped: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl EventBus {
    /// Creates a new event bus with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self {
            sender,
            receiver,
            capacity,
            dropped: AtomicU64::new(0),
        }
    }

    /// Publishes an event to the bus.
    pub fn publish(&self, event: TrackEvent) {
        if let Err(e) = self.sender.try_send(event) {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            warn!(
                "Event bus full ({} pending), dropped {:?} ({dropped} dropped so far)",
                self.capacity,
                e.into_inner()
            );
        }
    }

    /// Events lost to a full bus since creation.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Drains all pending events.
    pub fn drain(&self) -> Vec<TrackEvent> {
        self.receiver.try_iter().collect()
    }

    /// Returns the number of pending events.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// Returns the channel capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Creates a new sender handle for publishing events.
    #[must_use]
    pub fn sender(&self) -> Sender<TrackEvent> {
        self.sender.clone()
    }
}
