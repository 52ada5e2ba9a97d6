//! Avatars on the stage: composition, playback control and the shared
//! stage context they live in.

pub mod avatar;
pub mod composer;
pub mod controller;
pub mod events;
pub mod manifest;
pub mod stage;

use thiserror::Error;

use crate::assets::LoadError;

pub use avatar::{
    Avatar, AvatarHandle, AvatarId, AvatarPart, AvatarSnapshot, IdleControl, PartRole,
    PartSnapshot, PlaybackState,
};
pub use composer::AvatarComposer;
pub use controller::AnimationController;
pub use events::{StageEvent, StageEventKind};
pub use manifest::{AnimationManifest, AvatarManifest, Gesture, ManifestFile};
pub use stage::{StageContext, StageState};

/// Failure to build one avatar. Other avatars on the stage are unaffected.
#[derive(Debug, Clone, Error)]
pub enum CompositionError {
    #[error("avatar '{avatar}': {role} part failed to load: {source}")]
    Part {
        avatar: String,
        role: PartRole,
        #[source]
        source: LoadError,
    },

    #[error("avatar '{avatar}': idle clip failed to load: {source}")]
    IdleClip {
        avatar: String,
        #[source]
        source: LoadError,
    },

    #[error("avatar build cancelled by stage shutdown")]
    Cancelled,
}

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("cannot play on avatar {avatar}: {reason}")]
    Precondition { avatar: AvatarId, reason: String },

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("playback of '{clip}' superseded by a newer request")]
    Superseded { clip: String },

    #[error("playback cancelled by stage shutdown")]
    Cancelled,
}

impl PlaybackError {
    pub(crate) fn precondition(avatar: AvatarId, reason: impl Into<String>) -> Self {
        Self::Precondition {
            avatar,
            reason: reason.into(),
        }
    }
}
