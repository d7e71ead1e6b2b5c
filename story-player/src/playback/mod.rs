//! Story playback
//!
//! - `state`: playback states, progress records and the transition rule
//! - `controller`: synchronous state machine for one story
//! - `driver`: tokio task running a controller and its subscriptions
//! - `backend` / `media_status`: collaborator interfaces

pub mod backend;
pub mod controller;
pub mod driver;
pub mod media_status;
pub mod state;
pub mod story;
pub mod timer;

pub use backend::{PlayerActivity, PlayerBackend, PlayerEvent, PlayerFactory, PlayerStatus};
pub use controller::{PlaybackContext, PlaybackNotice, StateObserver, StoryPlayback};
pub use driver::{StoryPlayer, StoryPlayerHandle};
pub use media_status::{combined_video_availability, MediaStatusSource};
pub use state::{PlaybackState, Progress};
pub use story::{MediaKind, MediaResourceId, StoryId, StoryItem, StoryMedia};
