//! # Story Common Library
//!
//! Shared code for the story playback crates including:
//! - Error types
//! - Event types (StoryEvent enum) and the EventBus
//! - Configuration loading
//! - Time helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
