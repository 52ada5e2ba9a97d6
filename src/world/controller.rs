use std::sync::Arc;
use tracing::{debug, info, warn};

use super::avatar::{AvatarId, PlaybackState};
use super::events::StageEventKind;
use super::manifest::{AnimationManifest, Gesture};
use super::stage::StageContext;
use super::PlaybackError;
use crate::assets::LoadError;

/// Transport controls for avatars on the stage.
///
/// Overlapping requests preempt: the latest call on an avatar wins, and a
/// call whose load finishes after a newer call began is dropped.
#[derive(Clone)]
pub struct AnimationController {
    context: Arc<StageContext>,
    gestures: AnimationManifest,
}

impl AnimationController {
    pub fn new(context: Arc<StageContext>, gestures: AnimationManifest) -> Self {
        Self { context, gestures }
    }

    /// Interrupts idle, plays the clip at `path` once on every part, then
    /// resumes idle when the body finishes it.
    pub async fn play_once(&self, avatar: AvatarId, path: &str) -> Result<(), PlaybackError> {
        let token = self.begin_request(avatar).await?;

        let handle = self
            .context
            .guard(self.context.loader().load(path))
            .await
            .ok_or(PlaybackError::Cancelled)??;
        let clip = handle
            .first_clip()
            .cloned()
            .ok_or_else(|| LoadError::parse(path, "no animation clip"))?;

        let mut state = self.context.lock().await;
        if self.context.is_closed() {
            return Err(PlaybackError::Cancelled);
        }
        let entry = state
            .avatars
            .get_mut(&avatar)
            .ok_or_else(|| PlaybackError::precondition(avatar, "avatar was removed during load"))?;
        if !entry.is_current(token) {
            debug!("Dropping stale request {} for '{}' on {}", token, path, avatar);
            return Err(PlaybackError::Superseded {
                clip: path.to_string(),
            });
        }

        entry.preempt_pending(&self.context);
        entry.stop_idle();
        if !entry.begin_one_shot(token, &clip) {
            return Err(PlaybackError::precondition(avatar, "avatar has no mixers"));
        }

        info!("Avatar {} playing '{}' once ({:.2}s)", entry.name(), clip.name(), clip.duration());
        self.context.emit(StageEventKind::OneShotStarted {
            avatar,
            clip: clip.name().to_string(),
        });
        Ok(())
    }

    /// Cancels any pending one-shot and plays idle.
    pub async fn play_idle(&self, avatar: AvatarId) -> Result<(), PlaybackError> {
        let mut state = self.context.lock().await;
        let entry = state
            .avatars
            .get_mut(&avatar)
            .ok_or_else(|| PlaybackError::precondition(avatar, "avatar is not registered"))?;

        entry.resume_idle(&self.context);
        Ok(())
    }

    /// Cancels any pending one-shot and stops idle.
    pub async fn stop(&self, avatar: AvatarId) -> Result<(), PlaybackError> {
        let mut state = self.context.lock().await;
        let entry = state
            .avatars
            .get_mut(&avatar)
            .ok_or_else(|| PlaybackError::precondition(avatar, "avatar is not registered"))?;

        entry.halt(&self.context);
        Ok(())
    }

    /// Plays a named gesture. Idle-style gestures replace the looping idle clip.
    pub async fn play_gesture(
        &self,
        avatar: AvatarId,
        gesture: Gesture,
    ) -> Result<(), PlaybackError> {
        let path = self.gestures.path(gesture).to_string();
        if !gesture.is_idle_style() {
            return self.play_once(avatar, &path).await;
        }

        let token = self.begin_request(avatar).await?;
        let clip = self
            .context
            .guard(self.context.clips().get_or_load(&path))
            .await
            .ok_or(PlaybackError::Cancelled)??;

        let mut state = self.context.lock().await;
        if self.context.is_closed() {
            return Err(PlaybackError::Cancelled);
        }
        let entry = state
            .avatars
            .get_mut(&avatar)
            .ok_or_else(|| PlaybackError::precondition(avatar, "avatar was removed during load"))?;
        if !entry.is_current(token) {
            return Err(PlaybackError::Superseded { clip: path });
        }

        entry.preempt_pending(&self.context);
        entry.stop_idle();
        entry.swap_idle(clip);
        entry.start_idle();
        debug!("Avatar {} idling on {}", entry.name(), gesture);
        self.context.emit(StageEventKind::IdleResumed { avatar });
        Ok(())
    }

    pub async fn state(&self, avatar: AvatarId) -> Option<PlaybackState> {
        let state = self.context.lock().await;
        state.avatars.get(&avatar).map(|entry| entry.state().clone())
    }

    /// Checks the avatar can play and claims a new request token.
    async fn begin_request(&self, avatar: AvatarId) -> Result<u64, PlaybackError> {
        let mut state = self.context.lock().await;
        let Some(entry) = state.avatars.get_mut(&avatar) else {
            warn!("Playback requested for unknown avatar {}", avatar);
            return Err(PlaybackError::precondition(avatar, "avatar is not registered"));
        };
        if entry.mixer_count() == 0 {
            return Err(PlaybackError::precondition(avatar, "avatar has no mixers"));
        }
        Ok(entry.next_generation())
    }
}
