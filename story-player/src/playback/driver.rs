//! Async driver for a story playback controller
//!
//! Each displayed story gets one driver task owning its [`StoryPlayback`].
//! All mutation happens on that task: commands from the handle, media status
//! reports, player status reports and timer expiry are multiplexed with
//! `tokio::select!` and applied one at a time.
//!
//! Dropping the handle (or calling [`StoryPlayerHandle::shutdown`]) ends the
//! task, which drops the media status and player subscriptions with it.

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use story_common::events::{EventBus, MediaAvailability, StoryEvent};
use story_common::time::millis_to_duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::PlayerEvent;
use super::controller::{PlaybackContext, PlaybackNotice, StateObserver, StoryPlayback};
use super::media_status::combined_video_availability;
use super::state::PlaybackState;
use super::story::{MediaKind, StoryId, StoryItem};
use crate::error::{Error, Result};

/// Requests sent from the handle to the driver task
#[derive(Debug)]
enum Command {
    Play,
    Pause,
    Restart,
    Appear { is_muted: bool },
    Disappear,
    Mute,
    Unmute,
    CurrentTimestamp(oneshot::Sender<f64>),
    Duration(oneshot::Sender<f64>),
    State(oneshot::Sender<PlaybackState>),
    DeferredPlay(oneshot::Sender<bool>),
    Shutdown,
}

/// Driver task state
pub struct StoryPlayer {
    playback: StoryPlayback,
    session_id: Uuid,
    event_bus: Arc<EventBus>,
    commands: mpsc::UnboundedReceiver<Command>,
    ready: watch::Sender<bool>,
    media_status: BoxStream<'static, MediaAvailability>,
    player_events: BoxStream<'static, PlayerEvent>,
    ready_fallback: std::time::Duration,
    /// Latest report from the media status source
    last_resource: Option<MediaAvailability>,
    /// Last availability published on the event bus
    last_published: Option<MediaAvailability>,
}

impl StoryPlayer {
    /// Create the controller for `story` and start its driver task
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        story: StoryItem,
        context: &PlaybackContext,
        event_bus: Arc<EventBus>,
        observer: Option<StateObserver>,
    ) -> StoryPlayerHandle {
        let session_id = Uuid::new_v4();
        let story_id = story.id;
        let kind = story.kind();

        let media_status = match story.resource() {
            Some(resource) => context.media_status.resource_status(resource),
            None => Box::pin(stream::empty()),
        };

        let mut playback = StoryPlayback::for_story(story, context, observer);
        let player_events = playback.take_player_events();

        let (tx, commands) = mpsc::unbounded_channel();
        let (ready, ready_rx) = watch::channel(false);

        let player = StoryPlayer {
            playback,
            session_id,
            event_bus,
            commands,
            ready,
            media_status,
            player_events,
            ready_fallback: millis_to_duration(context.settings.ready_fallback_ms),
            last_resource: None,
            last_published: None,
        };

        info!(%session_id, %story_id, %kind, "Starting story player");
        let task = tokio::spawn(player.run());

        StoryPlayerHandle {
            tx,
            story_id,
            kind,
            session_id,
            ready: ready_rx,
            task,
        }
    }

    async fn run(mut self) {
        let ready_fallback = sleep(self.ready_fallback);
        tokio::pin!(ready_fallback);

        let mut media_open = true;
        let mut player_open = true;

        loop {
            let deadline = self.playback.timer_deadline();
            let awaiting_ready = !*self.ready.borrow();

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle_command(command),
                },
                report = self.media_status.next(), if media_open => match report {
                    Some(availability) => self.handle_availability(availability),
                    None => {
                        debug!(session_id = %self.session_id, "Media status stream ended");
                        media_open = false;
                    }
                },
                event = self.player_events.next(), if player_open => match event {
                    Some(event) => {
                        let status = matches!(event, PlayerEvent::Status(_));
                        self.playback.apply_player_event(event);
                        if status {
                            self.publish_availability();
                        }
                    }
                    None => {
                        debug!(session_id = %self.session_id, "Player event stream ended");
                        player_open = false;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.playback.fire_timer(Instant::now());
                }
                _ = &mut ready_fallback, if awaiting_ready => {
                    debug!(session_id = %self.session_id, "Ready fallback elapsed");
                    self.mark_ready();
                }
            }

            self.publish();
        }

        info!(
            session_id = %self.session_id,
            story_id = %self.playback.story_id(),
            "Story player stopped"
        );
    }

    fn handle_command(&mut self, command: Command) {
        let now = Instant::now();
        match command {
            Command::Play => self.playback.play(now),
            Command::Pause => self.playback.pause(now),
            Command::Restart => self.playback.restart(now),
            Command::Appear { is_muted } => self.playback.appear(is_muted),
            Command::Disappear => self.playback.disappear(),
            Command::Mute => self.playback.mute(),
            Command::Unmute => self.playback.unmute(),
            Command::CurrentTimestamp(reply) => {
                let _ = reply.send(self.playback.current_timestamp(now));
            }
            Command::Duration(reply) => {
                let _ = reply.send(self.playback.duration());
            }
            Command::State(reply) => {
                let _ = reply.send(*self.playback.state());
            }
            Command::DeferredPlay(reply) => {
                let _ = reply.send(self.playback.has_deferred_play());
            }
            Command::Shutdown => {}
        }
    }

    fn handle_availability(&mut self, availability: MediaAvailability) {
        self.last_resource = Some(availability);
        self.publish_availability();
        self.playback.apply_availability(availability, Instant::now());
    }

    /// Publish the viewer-facing availability if it changed
    ///
    /// Video stories combine the resource report with the player's activity
    /// and stay silent until both halves are known.
    fn publish_availability(&mut self) {
        let Some(resource) = self.last_resource else {
            return;
        };
        let reported = match self.playback.media_kind() {
            MediaKind::Image => Some(resource),
            MediaKind::Video => {
                combined_video_availability(resource, self.playback.player_activity())
            }
        };
        let Some(reported) = reported else {
            return;
        };
        if self.last_published == Some(reported) {
            return;
        }
        self.last_published = Some(reported);

        if reported.is_local() {
            self.mark_ready();
        }
        self.event_bus.emit_lossy(StoryEvent::MediaAvailabilityChanged {
            session_id: self.session_id,
            story_id: self.playback.story_id().0,
            availability: reported,
            timestamp: story_common::time::now(),
        });
    }

    fn mark_ready(&self) {
        self.ready.send_if_modified(|ready| !std::mem::replace(ready, true));
    }

    /// Forward controller notices to the event bus
    fn publish(&mut self) {
        let story_id = self.playback.story_id().0;
        for notice in self.playback.take_notices() {
            match notice {
                PlaybackNotice::StateChanged { old, new } => {
                    self.event_bus.emit_lossy(StoryEvent::PlaybackStateChanged {
                        session_id: self.session_id,
                        story_id,
                        old_state: old.kind(),
                        new_state: new.kind(),
                        timestamp: story_common::time::now(),
                    });
                    if new == PlaybackState::Finished {
                        let finished = StoryEvent::PlaybackFinished {
                            session_id: self.session_id,
                            story_id,
                            timestamp: story_common::time::now(),
                        };
                        if self.event_bus.emit(finished).is_err() {
                            warn!(
                                session_id = %self.session_id,
                                %story_id,
                                "Story finished with no event subscribers"
                            );
                        }
                    }
                }
                PlaybackNotice::PlayDeferred => {
                    self.event_bus.emit_lossy(StoryEvent::PlayDeferred {
                        session_id: self.session_id,
                        story_id,
                        timestamp: story_common::time::now(),
                    });
                }
                PlaybackNotice::DeferredPlayStarted => {
                    debug!(session_id = %self.session_id, "Deferred play released");
                }
            }
        }
    }
}

/// Control surface for a running story player
///
/// Commands are applied in the order they are sent.
pub struct StoryPlayerHandle {
    tx: mpsc::UnboundedSender<Command>,
    story_id: StoryId,
    kind: MediaKind,
    session_id: Uuid,
    ready: watch::Receiver<bool>,
    task: JoinHandle<()>,
}

impl StoryPlayerHandle {
    pub fn story_id(&self) -> StoryId {
        self.story_id
    }

    pub fn is_story(&self, story_id: StoryId) -> bool {
        self.story_id == story_id
    }

    pub fn media_kind(&self) -> MediaKind {
        self.kind
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn play(&self) -> Result<()> {
        self.send(Command::Play)
    }

    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn restart(&self) -> Result<()> {
        self.send(Command::Restart)
    }

    pub fn appear(&self, is_muted: bool) -> Result<()> {
        self.send(Command::Appear { is_muted })
    }

    pub fn disappear(&self) -> Result<()> {
        self.send(Command::Disappear)
    }

    pub fn mute(&self) -> Result<()> {
        self.send(Command::Mute)
    }

    pub fn unmute(&self) -> Result<()> {
        self.send(Command::Unmute)
    }

    pub async fn current_timestamp(&self) -> Result<f64> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::CurrentTimestamp(tx))?;
        Ok(rx.await?)
    }

    pub async fn duration(&self) -> Result<f64> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Duration(tx))?;
        Ok(rx.await?)
    }

    pub async fn state(&self) -> Result<PlaybackState> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::State(tx))?;
        Ok(rx.await?)
    }

    pub async fn has_deferred_play(&self) -> Result<bool> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::DeferredPlay(tx))?;
        Ok(rx.await?)
    }

    /// Resolves once the story's media is local or the ready fallback elapsed
    pub async fn wait_ready(&self) -> Result<()> {
        let mut ready = self.ready.clone();
        ready
            .wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| Error::ControllerClosed)
    }

    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Stop the driver task and wait for it to release its subscriptions
    pub async fn shutdown(self) -> Result<()> {
        if self.tx.send(Command::Shutdown).is_err() {
            warn!(session_id = %self.session_id, "Story player already stopped");
        }
        self.task
            .await
            .map_err(|e| Error::Playback(format!("Driver task failed: {}", e)))
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command)?;
        Ok(())
    }
}
