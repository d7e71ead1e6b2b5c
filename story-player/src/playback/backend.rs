//! Video player backend interface
//!
//! The backend owns decoding and its own playback clock. The controller only
//! issues commands and mirrors the status sequence the backend reports.

use futures::stream::BoxStream;
use tokio::time::Instant;

use super::state::Progress;
use super::story::StoryItem;

/// What the backend is currently doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerActivity {
    Playing,
    Paused,
    Buffering,
}

/// Status report from the backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStatus {
    pub activity: PlayerActivity,
    /// Instant the report was generated
    pub generation: Instant,
    /// Playback position in seconds
    pub timestamp: f64,
    /// Media duration in seconds as known to the backend
    pub duration: f64,
}

impl PlayerStatus {
    pub fn progress(&self) -> Progress {
        Progress::new(self.generation, self.timestamp, self.duration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerEvent {
    Status(PlayerStatus),
    /// Playback reached the end of the media
    Ended,
}

/// Controls of an external video player
pub trait PlayerBackend: Send {
    fn play(&mut self);

    fn pause(&mut self);

    fn seek(&mut self, timestamp: f64);

    /// Volume in `0.0..=1.0`
    fn set_volume(&mut self, volume: f32);

    /// Status sequence of the player
    ///
    /// Called once by the driver when it starts; later calls may return an
    /// empty stream.
    fn events(&mut self) -> BoxStream<'static, PlayerEvent>;
}

/// Creates one backend per video story
pub trait PlayerFactory: Send + Sync {
    fn create(&self, story: &StoryItem) -> Box<dyn PlayerBackend>;
}
