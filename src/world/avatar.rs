use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use super::events::StageEventKind;
use super::stage::StageContext;
use crate::animation::{AnimationClip, ClipId, ListenerId, LoopMode, PartMixer};
use crate::rendering::scene::{NodeId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AvatarId(Uuid);

impl AvatarId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AvatarId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AvatarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PartRole {
    Body,
    Head,
    Hair,
}

impl fmt::Display for PartRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartRole::Body => "body",
            PartRole::Head => "head",
            PartRole::Hair => "hair",
        };
        f.write_str(name)
    }
}

/// One loaded part and the mixer that animates it.
#[derive(Debug)]
pub struct AvatarPart {
    pub role: PartRole,
    pub node: NodeId,
    pub mixer: PartMixer,
    /// Static parts (no embedded clips) ignore idle start/stop.
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "clip", rename_all = "lowercase")]
pub enum PlaybackState {
    Idle,
    Playing(String),
    Stopped,
}

/// The one-shot currently waiting for its finished event.
#[derive(Debug, Clone)]
pub(crate) struct PendingCompletion {
    pub token: u64,
    pub listener: ListenerId,
    pub clip: ClipId,
    pub clip_name: String,
}

#[derive(Debug)]
pub struct Avatar {
    id: AvatarId,
    name: String,
    root: NodeId,
    parts: Vec<AvatarPart>,
    idle: Arc<AnimationClip>,
    state: PlaybackState,
    pending: Option<PendingCompletion>,
    generation: u64,
}

impl Avatar {
    /// `parts[0]` is the primary (body) part.
    pub fn new(
        name: impl Into<String>,
        root: NodeId,
        parts: Vec<AvatarPart>,
        idle: Arc<AnimationClip>,
    ) -> Self {
        Self {
            id: AvatarId::new(),
            name: name.into(),
            root,
            parts,
            idle,
            state: PlaybackState::Stopped,
            pending: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> AvatarId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn parts(&self) -> &[AvatarPart] {
        &self.parts
    }

    pub fn part(&self, role: PartRole) -> Option<&AvatarPart> {
        self.parts.iter().find(|part| part.role == role)
    }

    pub fn mixer_count(&self) -> usize {
        self.parts.len()
    }

    pub fn idle_clip(&self) -> &Arc<AnimationClip> {
        &self.idle
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Listeners registered across all of this avatar's mixers.
    pub fn listener_count(&self) -> usize {
        self.parts.iter().map(|part| part.mixer.listener_count()).sum()
    }

    /// Starts a new playback request; older in-flight requests become stale.
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn is_current(&self, token: u64) -> bool {
        self.generation == token
    }

    /// Plays the idle clip on every animated part. Idempotent.
    pub(crate) fn start_idle(&mut self) {
        let idle = Arc::clone(&self.idle);
        for part in self.parts.iter_mut().filter(|part| part.animated) {
            part.mixer.clip_action(&idle).set_loop(LoopMode::RepeatForever).play();
        }
        self.state = PlaybackState::Idle;
    }

    pub(crate) fn stop_idle(&mut self) {
        let idle = self.idle.id();
        for part in self.parts.iter_mut().filter(|part| part.animated) {
            if let Some(action) = part.mixer.existing_action_mut(idle) {
                action.stop();
            }
        }
    }

    /// Replaces the idle clip, dropping the old idle actions.
    pub(crate) fn swap_idle(&mut self, clip: Arc<AnimationClip>) {
        if clip.id() == self.idle.id() {
            return;
        }
        let old = self.idle.id();
        for part in &mut self.parts {
            part.mixer.uncache_action(old);
        }
        self.idle = clip;
    }

    /// Drops the pending one-shot, its listener and its actions.
    pub(crate) fn cancel_pending(&mut self) -> Option<PendingCompletion> {
        let pending = self.pending.take()?;
        if let Some(primary) = self.parts.first_mut() {
            primary.mixer.remove_listener(pending.listener);
        }
        for part in &mut self.parts {
            part.mixer.uncache_action(pending.clip);
        }
        debug!("Avatar {} dropped pending one-shot '{}'", self.name, pending.clip_name);
        Some(pending)
    }

    /// Drops the pending one-shot and reports it as preempted.
    pub(crate) fn preempt_pending(&mut self, context: &StageContext) {
        if let Some(previous) = self.cancel_pending() {
            context.emit(StageEventKind::OneShotPreempted {
                avatar: self.id,
                clip: previous.clip_name,
            });
        }
    }

    /// Supersedes in-flight requests and the pending one-shot, then loops idle.
    pub(crate) fn resume_idle(&mut self, context: &StageContext) {
        self.next_generation();
        self.preempt_pending(context);
        self.start_idle();
        context.emit(StageEventKind::IdleResumed { avatar: self.id });
    }

    /// Supersedes in-flight requests and the pending one-shot, then stops idle.
    pub(crate) fn halt(&mut self, context: &StageContext) {
        self.next_generation();
        self.preempt_pending(context);
        self.stop_idle();
        self.set_stopped();
        context.emit(StageEventKind::PlaybackStopped { avatar: self.id });
    }

    /// Plays `clip` once on every mixer and waits on the primary mixer for it to finish.
    pub(crate) fn begin_one_shot(&mut self, token: u64, clip: &Arc<AnimationClip>) -> bool {
        let Some(primary) = self.parts.first_mut() else {
            return false;
        };
        let listener = primary.mixer.once_finished(clip.id());
        for part in &mut self.parts {
            part.mixer.clip_action(clip).set_loop(LoopMode::Repeat(1)).play();
        }
        self.pending = Some(PendingCompletion {
            token,
            listener,
            clip: clip.id(),
            clip_name: clip.name().to_string(),
        });
        self.state = PlaybackState::Playing(clip.name().to_string());
        true
    }

    pub(crate) fn set_stopped(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Advances every mixer and resolves a finished one-shot.
    pub(crate) fn update(&mut self, delta: f32, scene: &mut SceneGraph) -> Vec<StageEventKind> {
        for part in &mut self.parts {
            part.mixer.update(delta, scene);
        }

        let fired: Vec<ListenerId> = self
            .parts
            .iter_mut()
            .flat_map(|part| part.mixer.take_fired())
            .collect();

        let mut events = Vec::new();
        let completed = match &self.pending {
            Some(pending) => fired.contains(&pending.listener),
            None => false,
        };
        if completed {
            if let Some(pending) = self.pending.take() {
                debug!(
                    "Avatar {} finished one-shot '{}' (request {})",
                    self.name, pending.clip_name, pending.token
                );
                for part in &mut self.parts {
                    part.mixer.uncache_action(pending.clip);
                }
                self.start_idle();
                events.push(StageEventKind::OneShotFinished {
                    avatar: self.id,
                    clip: pending.clip_name,
                });
                events.push(StageEventKind::IdleResumed { avatar: self.id });
            }
        }
        events
    }

    pub(crate) fn cleanup(&mut self) {
        self.cancel_pending();
        for part in &mut self.parts {
            part.mixer.stop_all();
        }
    }

    pub fn snapshot(&self) -> AvatarSnapshot {
        AvatarSnapshot {
            id: self.id,
            name: self.name.clone(),
            state: self.state.clone(),
            parts: self
                .parts
                .iter()
                .map(|part| {
                    let mut playing: Vec<String> = part
                        .mixer
                        .actions()
                        .filter(|action| action.is_playing())
                        .map(|action| action.clip().name().to_string())
                        .collect();
                    playing.sort();
                    PartSnapshot {
                        role: part.role,
                        animated: part.animated,
                        playing,
                    }
                })
                .collect(),
        }
    }
}

/// Point-in-time view of an avatar's playback, for status output and comparisons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvatarSnapshot {
    pub id: AvatarId,
    pub name: String,
    pub state: PlaybackState,
    pub parts: Vec<PartSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartSnapshot {
    pub role: PartRole,
    pub animated: bool,
    /// Names of the clips whose actions are playing.
    pub playing: Vec<String>,
}

/// Host-facing reference to a composed avatar.
#[derive(Clone)]
pub struct AvatarHandle {
    id: AvatarId,
    context: Arc<StageContext>,
}

impl AvatarHandle {
    pub(crate) fn new(id: AvatarId, context: Arc<StageContext>) -> Self {
        Self { id, context }
    }

    pub fn id(&self) -> AvatarId {
        self.id
    }

    /// Idle transport control fanning out to every part.
    pub fn idle(&self) -> IdleControl<'_> {
        IdleControl { handle: self }
    }

    pub async fn state(&self) -> Option<PlaybackState> {
        let state = self.context.lock().await;
        state.avatars.get(&self.id).map(|avatar| avatar.state().clone())
    }

    pub async fn mixer_count(&self) -> usize {
        let state = self.context.lock().await;
        state.avatars.get(&self.id).map_or(0, Avatar::mixer_count)
    }

    pub async fn snapshot(&self) -> Option<AvatarSnapshot> {
        let state = self.context.lock().await;
        state.avatars.get(&self.id).map(Avatar::snapshot)
    }

    /// Removes the avatar and its nodes from the stage.
    pub async fn remove(&self) -> bool {
        self.context.remove_avatar(self.id).await
    }
}

impl fmt::Debug for AvatarHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarHandle").field("id", &self.id).finish()
    }
}

pub struct IdleControl<'a> {
    handle: &'a AvatarHandle,
}

impl IdleControl<'_> {
    /// Loops idle on every animated part, preempting any one-shot.
    /// Returns false if the avatar is gone.
    pub async fn start(&self) -> bool {
        let context = &self.handle.context;
        let mut state = context.lock().await;
        let Some(avatar) = state.avatars.get_mut(&self.handle.id) else {
            return false;
        };
        avatar.resume_idle(context);
        true
    }

    /// Stops idle and any one-shot. Returns false if the avatar is gone.
    pub async fn stop(&self) -> bool {
        let context = &self.handle.context;
        let mut state = context.lock().await;
        let Some(avatar) = state.avatars.get_mut(&self.handle.id) else {
            return false;
        };
        avatar.halt(context);
        true
    }
}
