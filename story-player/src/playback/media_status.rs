//! Media availability source

use futures::stream::BoxStream;
use story_common::events::MediaAvailability;

use super::backend::PlayerActivity;
use super::story::MediaResourceId;

/// Resolves whether a media resource is present locally
pub trait MediaStatusSource: Send + Sync {
    /// Lazy, unbounded sequence of availability reports for `resource`
    ///
    /// Each call starts a fresh subscription; dropping the stream releases it.
    fn resource_status(&self, resource: &MediaResourceId) -> BoxStream<'static, MediaAvailability>;
}

/// Availability of a video story as seen by the viewer
///
/// A locally stored file is always `Local`. A streamed file counts as local
/// unless the player is stalled on buffering, and is unknown (`None`) until
/// the player has reported at least once.
pub fn combined_video_availability(
    resource: MediaAvailability,
    player: Option<PlayerActivity>,
) -> Option<MediaAvailability> {
    match (resource, player) {
        (MediaAvailability::Local, _) => Some(MediaAvailability::Local),
        (_, None) => None,
        (_, Some(PlayerActivity::Buffering)) => Some(MediaAvailability::Fetching { progress: 0.0 }),
        (_, Some(_)) => Some(MediaAvailability::Local),
    }
}
