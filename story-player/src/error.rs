//! Error types for story-player
//!
//! Playback itself is infallible; errors arise only from configuration and
//! from talking to a driver task that has already exited or failed.

use thiserror::Error;

/// Main error type for story-player
#[derive(Error, Debug)]
pub enum Error {
    /// Playback driver errors
    #[error("Playback error: {0}")]
    Playback(String),

    /// The driver task is gone (handle used after shutdown)
    #[error("Playback controller closed")]
    ControllerClosed,

    /// Errors bubbled up from story-common
    #[error(transparent)]
    Common(#[from] story_common::Error),
}

/// Convenience Result type using story-player Error
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for Error {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Error::ControllerClosed
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for Error {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Error::ControllerClosed
    }
}
