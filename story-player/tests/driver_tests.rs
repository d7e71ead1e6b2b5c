//! Story player driver integration tests
//!
//! All timing tests run on tokio's paused clock, so sleeps advance virtual
//! time instantly and deadlines are exact.

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use helpers::{context, drain_events, wait_for_event, Call, FakeMediaSource, FakePlayerFactory};
use story_common::events::{EventBus, MediaAvailability, StateKind, StoryEvent};
use story_player::playback::{
    MediaResourceId, PlaybackState, PlayerActivity, PlayerEvent, PlayerStatus, StoryId, StoryItem,
};
use story_player::StoryPlayer;
use tokio::time::{sleep, Instant};

fn image_story() -> StoryItem {
    StoryItem::image(10, Some(MediaResourceId::new("photo")))
}

fn video_story() -> StoryItem {
    StoryItem::video(20, MediaResourceId::new("clip"), Some(12.0))
}

fn is_state_change_to(kind: StateKind) -> impl Fn(&StoryEvent) -> bool {
    move |event: &StoryEvent| {
        matches!(event, StoryEvent::PlaybackStateChanged { new_state, .. } if *new_state == kind)
    }
}

#[tokio::test(start_paused = true)]
async fn test_image_story_finishes_after_display_time() {
    let (media, _media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus.clone(), None);
    player.play().unwrap();
    assert!(player.state().await.unwrap().is_playing());

    sleep(Duration::from_millis(6900)).await;
    assert!(player.state().await.unwrap().is_playing());

    sleep(Duration::from_millis(200)).await;
    assert_eq!(player.state().await.unwrap(), PlaybackState::Finished);

    wait_for_event(&mut events, is_state_change_to(StateKind::Finished)).await;
    wait_for_event(&mut events, |e| {
        matches!(e, StoryEvent::PlaybackFinished { story_id: 10, .. })
    })
    .await;

    player.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_pause_and_resume_reschedules_expiry() {
    let (media, _media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus, None);
    let t0 = Instant::now();
    player.play().unwrap();

    sleep(Duration::from_secs(3)).await;
    player.pause().unwrap();
    match player.state().await.unwrap() {
        PlaybackState::Paused(progress) => assert_eq!(progress.elapsed, 3.0),
        other => panic!("expected paused, got {}", other),
    }

    sleep(Duration::from_secs(2)).await;
    assert_eq!(player.current_timestamp().await.unwrap(), 3.0);

    player.play().unwrap();
    assert_eq!(player.current_timestamp().await.unwrap(), 3.0);
    assert_eq!(Instant::now() - t0, Duration::from_secs(5));

    // Expiry moves to t=9 (5 + (7 - 3))
    sleep(Duration::from_millis(3900)).await;
    assert!(player.state().await.unwrap().is_playing());
    sleep(Duration::from_millis(200)).await;
    assert_eq!(player.state().await.unwrap(), PlaybackState::Finished);
}

#[tokio::test(start_paused = true)]
async fn test_double_pause_emits_single_transition() {
    let (media, _media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus.clone(), None);
    player.play().unwrap();
    sleep(Duration::from_secs(1)).await;
    player.pause().unwrap();
    let first = player.state().await.unwrap();

    sleep(Duration::from_secs(1)).await;
    player.pause().unwrap();
    assert_eq!(player.state().await.unwrap(), first);

    let paused_changes = drain_events(&mut events)
        .into_iter()
        .filter(|e| is_state_change_to(StateKind::Paused)(e))
        .count();
    assert_eq!(paused_changes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_deferred_until_media_is_local() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus.clone(), None);

    media_tx.send(MediaAvailability::Remote).unwrap();
    wait_for_event(&mut events, |e| {
        matches!(
            e,
            StoryEvent::MediaAvailabilityChanged {
                availability: MediaAvailability::Remote,
                ..
            }
        )
    })
    .await;

    player.play().unwrap();
    assert_eq!(player.state().await.unwrap(), PlaybackState::Waiting);
    assert!(player.has_deferred_play().await.unwrap());
    wait_for_event(&mut events, |e| matches!(e, StoryEvent::PlayDeferred { .. })).await;

    media_tx.send(MediaAvailability::Local).unwrap();
    wait_for_event(&mut events, is_state_change_to(StateKind::Playing)).await;
    assert!(!player.has_deferred_play().await.unwrap());

    // A second Local report does not start playback again, nor is it republished
    media_tx.send(MediaAvailability::Local).unwrap();
    sleep(Duration::from_millis(1)).await;
    assert!(player.state().await.unwrap().is_playing());
    let replays = drain_events(&mut events)
        .into_iter()
        .filter(|e| {
            is_state_change_to(StateKind::Playing)(e)
                || matches!(e, StoryEvent::MediaAvailabilityChanged { .. })
        })
        .count();
    assert_eq!(replays, 0);
}

#[tokio::test(start_paused = true)]
async fn test_disappear_returns_to_waiting() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus.clone(), None);
    player.play().unwrap();
    sleep(Duration::from_secs(2)).await;
    player.disappear().unwrap();
    assert_eq!(player.state().await.unwrap(), PlaybackState::Waiting);

    // No expiry after disappearing
    sleep(Duration::from_secs(10)).await;
    assert_eq!(player.state().await.unwrap(), PlaybackState::Waiting);

    // Deferred intent is dropped too
    media_tx.send(MediaAvailability::Remote).unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, StoryEvent::MediaAvailabilityChanged { .. })
    })
    .await;
    player.play().unwrap();
    player.disappear().unwrap();
    assert!(!player.has_deferred_play().await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_video_story_follows_backend() {
    let (media, _media_tx) = FakeMediaSource::new();
    let (players, control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(video_story(), &context(media, players), bus.clone(), None);
    player.appear(false).unwrap();
    player.play().unwrap();
    assert_eq!(player.duration().await.unwrap(), 12.0);
    assert_eq!(control.calls(), vec![Call::Volume(1.0), Call::Play]);

    let now = Instant::now();
    control
        .events
        .send(PlayerEvent::Status(PlayerStatus {
            activity: PlayerActivity::Buffering,
            generation: now,
            timestamp: 0.0,
            duration: 12.0,
        }))
        .unwrap();
    wait_for_event(&mut events, is_state_change_to(StateKind::Loading)).await;

    control
        .events
        .send(PlayerEvent::Status(PlayerStatus {
            activity: PlayerActivity::Playing,
            generation: now,
            timestamp: 0.5,
            duration: 12.0,
        }))
        .unwrap();
    wait_for_event(&mut events, is_state_change_to(StateKind::Playing)).await;
    assert_eq!(player.current_timestamp().await.unwrap(), 0.5);

    // Video stories never expire on the controller's own timer
    sleep(Duration::from_secs(30)).await;
    assert!(player.state().await.unwrap().is_playing());

    control.events.send(PlayerEvent::Ended).unwrap();
    wait_for_event(&mut events, |e| {
        matches!(e, StoryEvent::PlaybackFinished { story_id: 20, .. })
    })
    .await;

    player.disappear().unwrap();
    player.mute().unwrap();
    player.state().await.unwrap();
    assert_eq!(
        control.calls()[2..],
        [Call::Pause, Call::Seek(0.0), Call::Volume(0.0)]
    );
}

fn is_availability(expected: MediaAvailability) -> impl Fn(&StoryEvent) -> bool {
    move |event: &StoryEvent| {
        matches!(event, StoryEvent::MediaAvailabilityChanged { availability, .. } if *availability == expected)
    }
}

fn status(activity: PlayerActivity, generation: Instant) -> PlayerEvent {
    PlayerEvent::Status(PlayerStatus {
        activity,
        generation,
        timestamp: 0.0,
        duration: 12.0,
    })
}

#[tokio::test(start_paused = true)]
async fn test_streamed_video_availability_follows_player() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let mut events = bus.subscribe();

    let player = StoryPlayer::spawn(video_story(), &context(media, players), bus.clone(), None);

    // Remote resource alone says nothing about what the viewer sees
    media_tx.send(MediaAvailability::Remote).unwrap();
    sleep(Duration::from_millis(1)).await;
    assert!(!player.is_ready());
    assert!(drain_events(&mut events).is_empty());

    let now = Instant::now();
    control
        .events
        .send(status(PlayerActivity::Buffering, now))
        .unwrap();
    wait_for_event(
        &mut events,
        is_availability(MediaAvailability::Fetching { progress: 0.0 }),
    )
    .await;
    assert!(!player.is_ready());

    // Repeated buffering reports are not republished
    control
        .events
        .send(status(PlayerActivity::Buffering, now))
        .unwrap();
    sleep(Duration::from_millis(1)).await;
    assert!(drain_events(&mut events)
        .iter()
        .all(|e| !matches!(e, StoryEvent::MediaAvailabilityChanged { .. })));

    control
        .events
        .send(status(PlayerActivity::Playing, now))
        .unwrap();
    wait_for_event(&mut events, is_availability(MediaAvailability::Local)).await;
    assert!(player.is_ready());

    player.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_observer_runs_for_each_transition() {
    let (media, _media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();

    let player = StoryPlayer::spawn(
        image_story(),
        &context(media, players),
        bus,
        Some(Box::new(move |state: &PlaybackState| {
            sink.lock().unwrap().push(state.kind());
        })),
    );

    player.play().unwrap();
    sleep(Duration::from_secs(1)).await;
    player.restart().unwrap();
    sleep(Duration::from_secs(8)).await;
    player.appear(false).unwrap();
    player.state().await.unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            StateKind::Playing,
            StateKind::Playing,
            StateKind::Finished,
            StateKind::Waiting,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_ready_on_local_or_fallback() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus, None);
    assert!(!player.is_ready());
    media_tx.send(MediaAvailability::Local).unwrap();
    player.wait_ready().await.unwrap();
    assert!(player.is_ready());

    let (media, _media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let player = StoryPlayer::spawn(
        image_story(),
        &context(media, players),
        Arc::new(EventBus::new(10)),
        None,
    );
    let start = Instant::now();
    player.wait_ready().await.unwrap();
    assert_eq!(Instant::now() - start, Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_releases_subscriptions() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));

    let player = StoryPlayer::spawn(video_story(), &context(media, players), bus, None);
    assert!(player.is_story(StoryId(20)));
    assert!(!media_tx.is_closed());

    player.shutdown().await.unwrap();
    assert!(media_tx.is_closed());
    assert!(control.events.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_driver() {
    let (media, media_tx) = FakeMediaSource::new();
    let (players, _control) = FakePlayerFactory::new();
    let bus = Arc::new(EventBus::new(100));

    let player = StoryPlayer::spawn(image_story(), &context(media, players), bus, None);
    player.play().unwrap();
    drop(player);

    tokio::time::timeout(Duration::from_secs(1), async {
        while !media_tx.is_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("driver did not release media subscription");
}
