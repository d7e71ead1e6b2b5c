//! Event types for the story playback event system
//!
//! Provides shared event definitions and EventBus for the playback crates.

mod playback_types;

pub use playback_types::{MediaAvailability, StateKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Story playback event types
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// forwarding to a UI process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StoryEvent {
    /// Playback state changed
    ///
    /// Emitted once per accepted transition, after the observer callback ran.
    PlaybackStateChanged {
        /// Controller session that produced the event
        session_id: Uuid,
        /// Story being played
        story_id: i32,
        /// State before change
        old_state: StateKind,
        /// State after change
        new_state: StateKind,
        /// When state changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Story reached its end (expiry timer fired or player reported the end)
    PlaybackFinished {
        session_id: Uuid,
        story_id: i32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// `play` was requested while media was not local; playback will start
    /// once the media status source reports local availability.
    PlayDeferred {
        session_id: Uuid,
        story_id: i32,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Media status source reported a new availability
    MediaAvailabilityChanged {
        session_id: Uuid,
        story_id: i32,
        availability: MediaAvailability,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl StoryEvent {
    /// Story the event refers to
    pub fn story_id(&self) -> i32 {
        match self {
            StoryEvent::PlaybackStateChanged { story_id, .. }
            | StoryEvent::PlaybackFinished { story_id, .. }
            | StoryEvent::PlayDeferred { story_id, .. }
            | StoryEvent::MediaAvailabilityChanged { story_id, .. } => *story_id,
        }
    }

    /// Controller session the event refers to
    pub fn session_id(&self) -> Uuid {
        match self {
            StoryEvent::PlaybackStateChanged { session_id, .. }
            | StoryEvent::PlaybackFinished { session_id, .. }
            | StoryEvent::PlayDeferred { session_id, .. }
            | StoryEvent::MediaAvailabilityChanged { session_id, .. } => *session_id,
        }
    }
}

/// One-to-many event broadcaster
///
/// Thin wrapper over `tokio::sync::broadcast`. Slow subscribers lose the
/// oldest events once `capacity` is exceeded.
#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<StoryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use story_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<StoryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: StoryEvent,
    ) -> Result<usize, broadcast::error::SendError<StoryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: StoryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
