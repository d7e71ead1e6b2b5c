//! Playback state and progress records

use story_common::events::StateKind;
use story_common::time::duration_to_secs;
use tokio::time::Instant;

/// Snapshot of playback position anchored to a monotonic instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    /// Instant the owning state was entered
    pub generation: Instant,
    /// Seconds of content consumed as of `generation`
    pub elapsed: f64,
    /// Total content length in seconds
    pub duration: f64,
}

impl Progress {
    pub fn new(generation: Instant, elapsed: f64, duration: f64) -> Self {
        Self {
            generation,
            elapsed,
            duration,
        }
    }

    /// Elapsed seconds extrapolated to `now`, assuming playback never stopped
    /// since `generation`.
    pub fn elapsed_at(&self, now: Instant) -> f64 {
        self.elapsed + duration_to_secs(now.saturating_duration_since(self.generation))
    }

    /// Seconds left before the content runs out, measured from `generation`
    pub fn remaining(&self) -> f64 {
        (self.duration - self.elapsed).max(0.0)
    }
}

/// Playback state of a single story
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaybackState {
    /// No timer active, no progress
    #[default]
    Waiting,
    /// Actively advancing
    Playing(Progress),
    /// Elapsed frozen at pause time
    Paused(Progress),
    /// Buffering (video only)
    Loading(Progress),
    /// Reached the end; stays here until reset to `Waiting`
    Finished,
}

impl PlaybackState {
    /// Progress record carried by the state, if any
    pub fn progress(&self) -> Option<&Progress> {
        match self {
            PlaybackState::Playing(p) | PlaybackState::Paused(p) | PlaybackState::Loading(p) => {
                Some(p)
            }
            PlaybackState::Waiting | PlaybackState::Finished => None,
        }
    }

    pub fn kind(&self) -> StateKind {
        match self {
            PlaybackState::Waiting => StateKind::Waiting,
            PlaybackState::Playing(_) => StateKind::Playing,
            PlaybackState::Paused(_) => StateKind::Paused,
            PlaybackState::Loading(_) => StateKind::Loading,
            PlaybackState::Finished => StateKind::Finished,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }

    /// Whether `self` may replace `current`
    ///
    /// A repeated `Playing` always wins so the expiry timer gets re-armed with
    /// fresh progress. Every other same-kind repeat is rejected. Kind-changing
    /// transitions are always accepted.
    pub fn supersedes(&self, current: &PlaybackState) -> bool {
        match (current, self) {
            (PlaybackState::Playing(_), PlaybackState::Playing(_)) => true,
            (current, new) => current.kind() != new.kind(),
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.progress() {
            Some(p) => write!(f, "{}({:.2}/{:.2}s)", self.kind(), p.elapsed, p.duration),
            None => write!(f, "{}", self.kind()),
        }
    }
}
