//! Simulated collaborators
//!
//! In-process stand-ins for the media status source and the video player,
//! used by the `story-player` binary to exercise the controller without a
//! real media stack.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_stream::stream;
use futures::stream::{self as fstream, BoxStream};
use story_common::events::MediaAvailability;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

use crate::playback::{
    MediaResourceId, MediaStatusSource, PlayerActivity, PlayerBackend, PlayerEvent, PlayerFactory,
    PlayerStatus, StoryItem, StoryMedia,
};

/// Number of `Fetching` reports emitted before `Local`
const FETCH_STEPS: u32 = 4;

/// Media source that reports every resource as remote, fetches it over
/// `fetch_delay`, then reports it local
pub struct SimulatedMediaSource {
    fetch_delay: Duration,
}

impl SimulatedMediaSource {
    pub fn new(fetch_delay: Duration) -> Self {
        Self { fetch_delay }
    }
}

impl MediaStatusSource for SimulatedMediaSource {
    fn resource_status(&self, resource: &MediaResourceId) -> BoxStream<'static, MediaAvailability> {
        let fetch_delay = self.fetch_delay;
        let resource = resource.clone();

        if fetch_delay.is_zero() {
            return Box::pin(fstream::iter([MediaAvailability::Local]));
        }

        Box::pin(stream! {
            trace!(%resource, "Simulated fetch started");
            yield MediaAvailability::Remote;
            let step = fetch_delay / FETCH_STEPS;
            for i in 0..FETCH_STEPS {
                yield MediaAvailability::Fetching { progress: i as f32 / FETCH_STEPS as f32 };
                sleep(step).await;
            }
            trace!(%resource, "Simulated fetch complete");
            yield MediaAvailability::Local;
        })
    }
}

#[derive(Debug)]
struct SimState {
    duration: f64,
    position: f64,
    /// Set while playing
    anchor: Option<Instant>,
    /// Bumped on every play/pause/seek to cancel stale end-of-media tasks
    epoch: u64,
    volume: f32,
    started: bool,
}

impl SimState {
    fn position_at(&self, now: Instant) -> f64 {
        match self.anchor {
            Some(anchor) => self.position + now.saturating_duration_since(anchor).as_secs_f64(),
            None => self.position,
        }
    }
}

/// Video player with a wall-clock playback position and no decoding
pub struct SimulatedPlayer {
    state: Arc<Mutex<SimState>>,
    tx: mpsc::UnboundedSender<PlayerEvent>,
    rx: Option<mpsc::UnboundedReceiver<PlayerEvent>>,
}

impl SimulatedPlayer {
    pub fn new(duration: f64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Arc::new(Mutex::new(SimState {
                duration,
                position: 0.0,
                anchor: None,
                epoch: 0,
                volume: 1.0,
                started: false,
            })),
            tx,
            rx: Some(rx),
        }
    }

    pub fn volume(&self) -> f32 {
        lock(&self.state).volume
    }

    fn report(&self, activity: PlayerActivity, state: &SimState, now: Instant) {
        let _ = self.tx.send(PlayerEvent::Status(PlayerStatus {
            activity,
            generation: now,
            timestamp: state.position_at(now),
            duration: state.duration,
        }));
    }

    /// Spawn the task that reports the end of media for the current epoch
    fn schedule_end(&self, state: &SimState) {
        let remaining = Duration::from_secs_f64((state.duration - state.position).max(0.0));
        let epoch = state.epoch;
        let shared = self.state.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            sleep(remaining).await;
            let mut state = lock(&shared);
            if state.epoch != epoch {
                return;
            }
            state.position = state.duration;
            state.anchor = None;
            debug!("Simulated player reached end of media");
            let _ = tx.send(PlayerEvent::Ended);
        });
    }
}

impl PlayerBackend for SimulatedPlayer {
    fn play(&mut self) {
        let now = Instant::now();
        let mut state = lock(&self.state);
        if state.anchor.is_some() {
            return;
        }
        if !state.started {
            state.started = true;
            self.report(PlayerActivity::Buffering, &state, now);
        }
        state.anchor = Some(now);
        state.epoch += 1;
        self.report(PlayerActivity::Playing, &state, now);
        self.schedule_end(&state);
    }

    fn pause(&mut self) {
        let now = Instant::now();
        let mut state = lock(&self.state);
        if state.anchor.is_some() {
            state.position = state.position_at(now);
            state.anchor = None;
        }
        state.epoch += 1;
        self.report(PlayerActivity::Paused, &state, now);
    }

    fn seek(&mut self, timestamp: f64) {
        let now = Instant::now();
        let mut state = lock(&self.state);
        state.position = timestamp.clamp(0.0, state.duration);
        state.epoch += 1;
        if state.anchor.is_some() {
            state.anchor = Some(now);
            self.report(PlayerActivity::Playing, &state, now);
            self.schedule_end(&state);
        } else {
            self.report(PlayerActivity::Paused, &state, now);
        }
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        debug!(volume, "Simulated player volume");
        lock(&self.state).volume = volume;
    }

    fn events(&mut self) -> BoxStream<'static, PlayerEvent> {
        match self.rx.take() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(fstream::empty()),
        }
    }
}

/// Creates a [`SimulatedPlayer`] sized from the story's metadata duration
pub struct SimulatedPlayerFactory {
    fallback_duration: f64,
}

impl SimulatedPlayerFactory {
    pub fn new(fallback_duration: f64) -> Self {
        Self { fallback_duration }
    }
}

impl PlayerFactory for SimulatedPlayerFactory {
    fn create(&self, story: &StoryItem) -> Box<dyn PlayerBackend> {
        let duration = match &story.media {
            StoryMedia::Video {
                duration: Some(duration),
                ..
            } => *duration,
            _ => self.fallback_duration,
        };
        Box::new(SimulatedPlayer::new(duration))
    }
}

fn lock(state: &Mutex<SimState>) -> MutexGuard<'_, SimState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
