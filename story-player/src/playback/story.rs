//! Story identity and media description

use serde::{Deserialize, Serialize};

/// Story identifier, unique within a peer's story list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoryId(pub i32);

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque handle naming a media resource for the status source and player
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaResourceId(pub String);

impl MediaResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for MediaResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoryMedia {
    /// Still image; `resource` is the full-size representation, when known
    Image { resource: Option<MediaResourceId> },
    /// Video file; `duration` comes from file metadata
    Video {
        resource: MediaResourceId,
        duration: Option<f64>,
    },
}

/// Media kind without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryItem {
    pub id: StoryId,
    pub media: StoryMedia,
}

impl StoryItem {
    pub fn image(id: i32, resource: Option<MediaResourceId>) -> Self {
        Self {
            id: StoryId(id),
            media: StoryMedia::Image { resource },
        }
    }

    pub fn video(id: i32, resource: MediaResourceId, duration: Option<f64>) -> Self {
        Self {
            id: StoryId(id),
            media: StoryMedia::Video { resource, duration },
        }
    }

    pub fn kind(&self) -> MediaKind {
        match self.media {
            StoryMedia::Image { .. } => MediaKind::Image,
            StoryMedia::Video { .. } => MediaKind::Video,
        }
    }

    /// Resource whose availability gates or describes playback
    pub fn resource(&self) -> Option<&MediaResourceId> {
        match &self.media {
            StoryMedia::Image { resource } => resource.as_ref(),
            StoryMedia::Video { resource, .. } => Some(resource),
        }
    }
}
