//! Story playback controller
//!
//! Synchronous state machine for a single displayed story. Every
//! time-dependent operation takes the current instant explicitly; the driver
//! in [`super::driver`] supplies it and turns the armed deadline into a real
//! timer.
//!
//! Image stories advance on a wall-clock timer and finish when it fires.
//! Video stories hand every command to a [`PlayerBackend`] and mirror the
//! status sequence it reports.

use std::sync::Arc;

use futures::stream::{self, BoxStream};
use story_common::config::PlaybackSettings;
use story_common::events::MediaAvailability;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::backend::{PlayerActivity, PlayerBackend, PlayerEvent, PlayerFactory};
use super::media_status::MediaStatusSource;
use super::state::{PlaybackState, Progress};
use super::story::{MediaKind, StoryId, StoryItem, StoryMedia};
use super::timer::ExpiryTimer;

const MUTED_VOLUME: f32 = 0.0;
const FULL_VOLUME: f32 = 1.0;

/// Callback invoked synchronously on every accepted transition
pub type StateObserver = Box<dyn FnMut(&PlaybackState) + Send>;

/// Services handed to every controller at construction
#[derive(Clone)]
pub struct PlaybackContext {
    pub settings: PlaybackSettings,
    pub media_status: Arc<dyn MediaStatusSource>,
    pub players: Arc<dyn PlayerFactory>,
}

/// Side effects the driver should publish after an operation
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    StateChanged {
        old: PlaybackState,
        new: PlaybackState,
    },
    /// `play` was recorded but postponed until the media is local
    PlayDeferred,
    /// A postponed `play` was released by a `Local` report
    DeferredPlayStarted,
}

/// Image playback: timer-driven, gated on local availability
pub struct ImageStrategy {
    duration: f64,
    availability: Option<MediaAvailability>,
    awaiting_play: bool,
}

impl ImageStrategy {
    fn new(settings: &PlaybackSettings) -> Self {
        Self {
            duration: settings.image_duration_secs,
            availability: None,
            awaiting_play: false,
        }
    }

    /// Playback must wait while the last report says the media is not local
    fn is_gated(&self) -> bool {
        self.availability.is_some_and(|a| !a.is_local())
    }
}

/// Video playback: delegated to the backend
pub struct VideoStrategy {
    backend: Box<dyn PlayerBackend>,
    metadata_duration: Option<f64>,
    fallback_duration: f64,
    min_duration: f64,
    last_activity: Option<PlayerActivity>,
}

/// Per-kind behavior, selected from the story media at construction
pub enum MediaStrategy {
    Image(ImageStrategy),
    Video(VideoStrategy),
}

pub struct StoryPlayback {
    story: StoryItem,
    state: PlaybackState,
    timer: ExpiryTimer,
    strategy: MediaStrategy,
    observer: Option<StateObserver>,
    notices: Vec<PlaybackNotice>,
}

impl StoryPlayback {
    /// Build the controller variant matching the story's media type
    pub fn for_story(
        story: StoryItem,
        context: &PlaybackContext,
        observer: Option<StateObserver>,
    ) -> Self {
        let strategy = match &story.media {
            StoryMedia::Image { .. } => MediaStrategy::Image(ImageStrategy::new(&context.settings)),
            StoryMedia::Video { duration, .. } => MediaStrategy::Video(VideoStrategy {
                backend: context.players.create(&story),
                metadata_duration: *duration,
                fallback_duration: context.settings.video_fallback_duration_secs,
                min_duration: context.settings.min_duration_secs,
                last_activity: None,
            }),
        };

        debug!(story_id = %story.id, kind = %story.kind(), "Created story playback");

        Self {
            story,
            state: PlaybackState::Waiting,
            timer: ExpiryTimer::default(),
            strategy,
            observer,
            notices: Vec::new(),
        }
    }

    pub fn story(&self) -> &StoryItem {
        &self.story
    }

    pub fn story_id(&self) -> StoryId {
        self.story.id
    }

    /// Whether this controller is showing `story_id`
    pub fn is_story(&self, story_id: StoryId) -> bool {
        self.story.id == story_id
    }

    pub fn media_kind(&self) -> MediaKind {
        self.story.kind()
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// Instant the expiry timer fires, if armed
    pub fn timer_deadline(&self) -> Option<Instant> {
        self.timer.deadline()
    }

    pub fn has_deferred_play(&self) -> bool {
        match &self.strategy {
            MediaStrategy::Image(image) => image.awaiting_play,
            MediaStrategy::Video(_) => false,
        }
    }

    /// Total content length in seconds
    pub fn duration(&self) -> f64 {
        match &self.strategy {
            MediaStrategy::Image(image) => image.duration,
            MediaStrategy::Video(video) => {
                let reported = self
                    .state
                    .progress()
                    .map(|p| p.duration)
                    .or(video.metadata_duration)
                    .unwrap_or(video.fallback_duration);
                reported.max(video.min_duration)
            }
        }
    }

    /// Seconds of content consumed at `now`
    pub fn current_timestamp(&self, now: Instant) -> f64 {
        let Some(progress) = self.state.progress() else {
            return 0.0;
        };
        match (&self.strategy, &self.state) {
            (MediaStrategy::Image(_), PlaybackState::Playing(p)) => p.elapsed_at(now),
            _ => progress.elapsed,
        }
    }

    pub fn play(&mut self, now: Instant) {
        match &mut self.strategy {
            MediaStrategy::Image(image) => {
                if image.is_gated() {
                    if !image.awaiting_play {
                        image.awaiting_play = true;
                        debug!(story_id = %self.story.id, "Media not local, deferring play");
                        self.notices.push(PlaybackNotice::PlayDeferred);
                    }
                    return;
                }
                let elapsed = match &self.state {
                    PlaybackState::Playing(p) => p.elapsed_at(now),
                    other => other.progress().map_or(0.0, |p| p.elapsed),
                };
                let duration = image.duration;
                self.set_state(PlaybackState::Playing(Progress::new(now, elapsed, duration)));
            }
            MediaStrategy::Video(video) => video.backend.play(),
        }
    }

    pub fn pause(&mut self, now: Instant) {
        match &mut self.strategy {
            MediaStrategy::Image(image) => {
                image.awaiting_play = false;
                let elapsed = self.state.progress().map_or(0.0, |p| p.elapsed_at(now));
                let duration = image.duration;
                self.set_state(PlaybackState::Paused(Progress::new(now, elapsed, duration)));
            }
            MediaStrategy::Video(video) => video.backend.pause(),
        }
    }

    /// Start over from the beginning
    pub fn restart(&mut self, now: Instant) {
        match &mut self.strategy {
            MediaStrategy::Image(image) => {
                let duration = image.duration;
                self.set_state(PlaybackState::Playing(Progress::new(now, 0.0, duration)));
            }
            MediaStrategy::Video(video) => video.backend.seek(0.0),
        }
    }

    /// Story became visible; does not start playback
    pub fn appear(&mut self, is_muted: bool) {
        match &mut self.strategy {
            MediaStrategy::Image(_) => {
                self.set_state(PlaybackState::Waiting);
            }
            MediaStrategy::Video(video) => video.backend.set_volume(if is_muted {
                MUTED_VOLUME
            } else {
                FULL_VOLUME
            }),
        }
    }

    /// Story left the screen
    pub fn disappear(&mut self) {
        match &mut self.strategy {
            MediaStrategy::Image(image) => {
                image.awaiting_play = false;
                self.timer.cancel();
                self.set_state(PlaybackState::Waiting);
            }
            MediaStrategy::Video(video) => {
                video.backend.pause();
                video.backend.seek(0.0);
            }
        }
    }

    pub fn mute(&mut self) {
        if let MediaStrategy::Video(video) = &mut self.strategy {
            video.backend.set_volume(MUTED_VOLUME);
        }
    }

    pub fn unmute(&mut self) {
        if let MediaStrategy::Video(video) = &mut self.strategy {
            video.backend.set_volume(FULL_VOLUME);
        }
    }

    /// Force `Finished` if the expiry deadline has passed at `now`
    pub fn fire_timer(&mut self, now: Instant) -> bool {
        if !self.timer.take_expired(now) {
            return false;
        }
        info!(story_id = %self.story.id, "Story display time elapsed");
        self.set_state(PlaybackState::Finished)
    }

    /// Record an availability report from the media status source
    pub fn apply_availability(&mut self, availability: MediaAvailability, now: Instant) {
        let MediaStrategy::Image(image) = &mut self.strategy else {
            return;
        };
        image.availability = Some(availability);
        if availability.is_local() && image.awaiting_play {
            image.awaiting_play = false;
            info!(story_id = %self.story.id, "Media is local, starting deferred play");
            self.notices.push(PlaybackNotice::DeferredPlayStarted);
            self.play(now);
        }
    }

    /// Mirror a report from the video backend
    pub fn apply_player_event(&mut self, event: PlayerEvent) {
        let MediaStrategy::Video(video) = &mut self.strategy else {
            trace!(story_id = %self.story.id, "Ignoring player event for image story");
            return;
        };
        let new = match event {
            PlayerEvent::Status(status) => {
                video.last_activity = Some(status.activity);
                match status.activity {
                    PlayerActivity::Playing => PlaybackState::Playing(status.progress()),
                    PlayerActivity::Paused => PlaybackState::Paused(status.progress()),
                    PlayerActivity::Buffering => PlaybackState::Loading(status.progress()),
                }
            }
            PlayerEvent::Ended => PlaybackState::Finished,
        };
        self.set_state(new);
    }

    /// Last activity reported by the video backend
    pub fn player_activity(&self) -> Option<PlayerActivity> {
        match &self.strategy {
            MediaStrategy::Video(video) => video.last_activity,
            MediaStrategy::Image(_) => None,
        }
    }

    /// Status sequence of the video backend; empty for images
    pub fn take_player_events(&mut self) -> BoxStream<'static, PlayerEvent> {
        match &mut self.strategy {
            MediaStrategy::Video(video) => video.backend.events(),
            MediaStrategy::Image(_) => Box::pin(stream::empty()),
        }
    }

    /// Drain notices produced since the last call
    pub fn take_notices(&mut self) -> Vec<PlaybackNotice> {
        std::mem::take(&mut self.notices)
    }

    fn set_state(&mut self, new: PlaybackState) -> bool {
        if self.state == new || !new.supersedes(&self.state) {
            trace!(story_id = %self.story.id, current = %self.state, rejected = %new, "State unchanged");
            return false;
        }

        let old = std::mem::replace(&mut self.state, new);

        match (&self.strategy, &new) {
            (MediaStrategy::Image(_), PlaybackState::Playing(p)) => {
                self.timer.arm(p.generation, p.remaining());
            }
            _ => self.timer.cancel(),
        }

        debug!(story_id = %self.story.id, from = %old, to = %new, "Playback state changed");

        if let Some(observer) = self.observer.as_mut() {
            observer(&new);
        }
        self.notices.push(PlaybackNotice::StateChanged { old, new });
        true
    }
}
