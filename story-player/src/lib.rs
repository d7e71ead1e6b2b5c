//! # Story Player Library (story-player)
//!
//! Playback controller for timed story media.
//!
//! **Purpose:** Track playback progress of one displayed story (image or
//! video), expire image stories after their display time, defer playback
//! until media is local, and notify observers of every state transition.
//!
//! **Architecture:** Synchronous state machine (`playback::controller`)
//! driven by one tokio task per story (`playback::driver`), publishing on the
//! shared `EventBus`.

pub mod error;
pub mod playback;
pub mod sim;

pub use error::{Error, Result};
pub use playback::{PlaybackContext, PlaybackState, StoryPlayer, StoryPlayerHandle};
