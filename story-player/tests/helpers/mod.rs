//! Shared fakes for story-player integration tests
//!
//! Both collaborators are fed through unbounded channels so a test can push
//! availability reports and player status exactly when it wants them, and
//! can observe subscription release through `UnboundedSender::is_closed`.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::{self, BoxStream};
use story_common::config::PlaybackSettings;
use story_common::events::{MediaAvailability, StoryEvent};
use story_player::playback::{
    MediaResourceId, MediaStatusSource, PlaybackContext, PlayerBackend, PlayerEvent,
    PlayerFactory, StoryItem,
};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::UnboundedReceiverStream;

pub struct FakeMediaSource {
    rx: Mutex<Option<mpsc::UnboundedReceiver<MediaAvailability>>>,
}

impl FakeMediaSource {
    pub fn new() -> (Self, mpsc::UnboundedSender<MediaAvailability>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                rx: Mutex::new(Some(rx)),
            },
            tx,
        )
    }
}

impl MediaStatusSource for FakeMediaSource {
    fn resource_status(&self, _resource: &MediaResourceId) -> BoxStream<'static, MediaAvailability> {
        match self.rx.lock().unwrap().take() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(stream::empty()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
}

pub struct FakeBackend {
    calls: Arc<Mutex<Vec<Call>>>,
    rx: Option<mpsc::UnboundedReceiver<PlayerEvent>>,
}

impl PlayerBackend for FakeBackend {
    fn play(&mut self) {
        self.calls.lock().unwrap().push(Call::Play);
    }

    fn pause(&mut self) {
        self.calls.lock().unwrap().push(Call::Pause);
    }

    fn seek(&mut self, timestamp: f64) {
        self.calls.lock().unwrap().push(Call::Seek(timestamp));
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.lock().unwrap().push(Call::Volume(volume));
    }

    fn events(&mut self) -> BoxStream<'static, PlayerEvent> {
        match self.rx.take() {
            Some(rx) => Box::pin(UnboundedReceiverStream::new(rx)),
            None => Box::pin(stream::empty()),
        }
    }
}

/// Test-side view of the backend the factory handed out
pub struct PlayerControl {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub events: mpsc::UnboundedSender<PlayerEvent>,
}

impl PlayerControl {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct FakePlayerFactory {
    calls: Arc<Mutex<Vec<Call>>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<PlayerEvent>>>,
}

impl FakePlayerFactory {
    pub fn new() -> (Self, PlayerControl) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                calls: calls.clone(),
                rx: Mutex::new(Some(rx)),
            },
            PlayerControl { calls, events: tx },
        )
    }
}

impl PlayerFactory for FakePlayerFactory {
    fn create(&self, _story: &StoryItem) -> Box<dyn PlayerBackend> {
        Box::new(FakeBackend {
            calls: self.calls.clone(),
            rx: self.rx.lock().unwrap().take(),
        })
    }
}

pub fn context(media: FakeMediaSource, players: FakePlayerFactory) -> PlaybackContext {
    PlaybackContext {
        settings: PlaybackSettings::default(),
        media_status: Arc::new(media),
        players: Arc::new(players),
    }
}

/// Wait for the first event matching `predicate`, skipping others
pub async fn wait_for_event<F>(rx: &mut broadcast::Receiver<StoryEvent>, predicate: F) -> StoryEvent
where
    F: Fn(&StoryEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.expect("event bus closed");
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for event")
}

/// Drain everything currently buffered on the receiver
pub fn drain_events(rx: &mut broadcast::Receiver<StoryEvent>) -> Vec<StoryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
