use std::time::SystemTime;

use super::avatar::AvatarId;

/// Events published by the stage to anyone subscribed through
/// [`StageContext::subscribe`](super::StageContext::subscribe).
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub kind: StageEventKind,
    pub timestamp: SystemTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageEventKind {
    /// Composition committed and idle started.
    AvatarBuilt {
        avatar: AvatarId,
        name: String,
        parts: usize,
    },
    AvatarBuildFailed { name: String, reason: String },
    AvatarRemoved { avatar: AvatarId },
    OneShotStarted { avatar: AvatarId, clip: String },
    OneShotFinished { avatar: AvatarId, clip: String },
    /// A pending one-shot was replaced or cancelled before it finished.
    OneShotPreempted { avatar: AvatarId, clip: String },
    IdleResumed { avatar: AvatarId },
    PlaybackStopped { avatar: AvatarId },
}

impl StageEvent {
    pub fn new(kind: StageEventKind) -> Self {
        Self {
            kind,
            timestamp: SystemTime::now(),
        }
    }
}
