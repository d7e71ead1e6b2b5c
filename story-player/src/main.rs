//! Story Player (story-player) - Main entry point
//!
//! Plays a single simulated story through the playback controller and prints
//! the resulting event stream. Useful for checking timing behavior without a
//! real media stack.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use story_common::config::load_config;
use story_common::events::{EventBus, StoryEvent};
use story_player::playback::{MediaResourceId, PlaybackContext, PlaybackState, StoryItem};
use story_player::sim::{SimulatedMediaSource, SimulatedPlayerFactory};
use story_player::StoryPlayer;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Image,
    Video,
}

/// Command-line arguments for story-player
#[derive(Parser, Debug)]
#[command(name = "story-player")]
#[command(about = "Plays a simulated story through the playback controller")]
#[command(version)]
struct Args {
    /// Path to TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Media kind of the simulated story
    #[arg(short, long, value_enum, default_value = "image")]
    kind: Kind,

    /// Story identifier
    #[arg(long, default_value = "1")]
    story_id: i32,

    /// Video duration from metadata, in seconds
    #[arg(long)]
    video_duration: Option<f64>,

    /// Simulated time until media becomes local
    #[arg(long, default_value = "500", env = "STORY_PLAYER_FETCH_DELAY_MS")]
    fetch_delay_ms: u64,

    /// Pause this long after playback starts
    #[arg(long)]
    pause_at_ms: Option<u64>,

    /// Resume this long after pausing
    #[arg(long, default_value = "1000")]
    resume_after_ms: u64,

    /// Start muted
    #[arg(long)]
    muted: bool,

    /// Print events as JSON lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("story_player={0},story_common={0}", config.logging.level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let story = match args.kind {
        Kind::Image => StoryItem::image(args.story_id, Some(MediaResourceId::new("image-full"))),
        Kind::Video => StoryItem::video(
            args.story_id,
            MediaResourceId::new("video-file"),
            args.video_duration,
        ),
    };

    info!(story_id = args.story_id, kind = ?args.kind, "Starting story playback");

    let context = PlaybackContext {
        settings: config.playback.clone(),
        media_status: Arc::new(SimulatedMediaSource::new(Duration::from_millis(
            args.fetch_delay_ms,
        ))),
        players: Arc::new(SimulatedPlayerFactory::new(
            config.playback.video_fallback_duration_secs,
        )),
    };

    let event_bus = Arc::new(EventBus::new(config.event_bus_capacity));
    let mut events = event_bus.subscribe();

    let player = StoryPlayer::spawn(
        story,
        &context,
        event_bus.clone(),
        Some(Box::new(|state: &PlaybackState| info!(%state, "Observer"))),
    );

    player.appear(args.muted)?;
    player.wait_ready().await?;
    player.play()?;

    if let Some(pause_at_ms) = args.pause_at_ms {
        tokio::time::sleep(Duration::from_millis(pause_at_ms)).await;
        player.pause()?;
        info!(
            timestamp = player.current_timestamp().await?,
            "Paused"
        );
        tokio::time::sleep(Duration::from_millis(args.resume_after_ms)).await;
        player.play()?;
    }

    let session_id = player.session_id();
    let json = args.json;
    let finished = async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    print_event(&event, json)?;
                    if matches!(event, StoryEvent::PlaybackFinished { .. })
                        && event.session_id() == session_id
                    {
                        return Ok::<_, anyhow::Error>(());
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
            }
        }
    };

    tokio::select! {
        result = finished => result?,
        _ = shutdown_signal() => info!("Interrupted"),
    }

    player.shutdown().await?;
    info!("Story playback complete");
    Ok(())
}

fn print_event(event: &StoryEvent, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(event).context("Failed to serialize event")?);
    } else {
        println!("{:?}", event);
    }
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
