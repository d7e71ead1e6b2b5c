//! Playback-related type definitions
//!
//! Payload-free state kinds and media availability reports shared between the
//! playback core and event consumers.

use serde::{Deserialize, Serialize};

/// Playback state discriminant
///
/// Mirrors the variants of the player's `PlaybackState` without their
/// progress payload, so it can travel in serialized events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum StateKind {
    Waiting,
    Playing,
    Paused,
    Loading,
    Finished,
}

impl std::fmt::Display for StateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateKind::Waiting => write!(f, "waiting"),
            StateKind::Playing => write!(f, "playing"),
            StateKind::Paused => write!(f, "paused"),
            StateKind::Loading => write!(f, "loading"),
            StateKind::Finished => write!(f, "finished"),
        }
    }
}

/// Local availability of a story's media resource
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MediaAvailability {
    /// Fully present on this device
    Local,
    /// Download in flight; progress in `0.0..=1.0`
    Fetching { progress: f32 },
    /// Not present and not being fetched
    Remote,
}

impl MediaAvailability {
    pub fn is_local(&self) -> bool {
        matches!(self, MediaAvailability::Local)
    }
}

impl std::fmt::Display for MediaAvailability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaAvailability::Local => write!(f, "local"),
            MediaAvailability::Fetching { progress } => {
                write!(f, "fetching ({:.0}%)", progress * 100.0)
            }
            MediaAvailability::Remote => write!(f, "remote"),
        }
    }
}
