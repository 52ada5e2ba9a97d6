//! Per-part animation mixer.
//!
//! A mixer owns the actions for one avatar part, advances them on every
//! frame tick, blends their samples into the part's joint transforms, and
//! reports clips that ran out of repetitions.

use glam::{Quat, Vec3};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use super::clip::{AnimationClip, ClipId, SampledValue};
use crate::rendering::scene::{NodeId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    RepeatForever,
    /// Play the clip this many times, then stop and report completion.
    Repeat(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Stopped,
    Playing,
}

/// Playback instance of one clip on one mixer.
#[derive(Debug, Clone)]
pub struct Action {
    clip: Arc<AnimationClip>,
    state: ActionState,
    loop_mode: LoopMode,
    weight: f32,
    time: f32,
}

impl Action {
    fn new(clip: Arc<AnimationClip>) -> Self {
        Self {
            clip,
            state: ActionState::Stopped,
            loop_mode: LoopMode::RepeatForever,
            weight: 1.0,
            time: 0.0,
        }
    }

    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == ActionState::Playing
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Starts from the beginning. Playing an already playing action is a no-op.
    pub fn play(&mut self) -> &mut Self {
        if self.state == ActionState::Stopped {
            self.time = 0.0;
            self.state = ActionState::Playing;
        }
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.state = ActionState::Stopped;
        self.time = 0.0;
        self
    }

    pub fn set_loop(&mut self, mode: LoopMode) -> &mut Self {
        self.loop_mode = mode;
        self
    }

    pub fn set_weight(&mut self, weight: f32) -> &mut Self {
        self.weight = weight.max(0.0);
        self
    }

    /// Advances playback; returns true when this step used up the last repetition.
    fn advance(&mut self, delta: f32) -> bool {
        if !self.is_playing() {
            return false;
        }
        self.time += delta;
        match self.loop_mode {
            LoopMode::RepeatForever => false,
            LoopMode::Repeat(count) => {
                let end = self.clip.duration() * count as f32;
                if self.time >= end {
                    self.time = end;
                    self.state = ActionState::Stopped;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn clip_time(&self) -> f32 {
        let duration = self.clip.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        self.time % duration
    }
}

/// Emitted by [`PartMixer::update`].
#[derive(Debug, Clone, PartialEq)]
pub enum MixerEvent {
    Finished { clip: ClipId, clip_name: String },
}

/// Handle for a one-time finished listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct PoseAccumulator {
    translation: Vec3,
    translation_weight: f32,
    rotation: Option<Quat>,
    rotation_weight: f32,
    scale: Vec3,
    scale_weight: f32,
}

impl PoseAccumulator {
    fn add(&mut self, value: SampledValue, weight: f32) {
        match value {
            SampledValue::Translation(t) => {
                self.translation += t * weight;
                self.translation_weight += weight;
            }
            SampledValue::Rotation(q) => {
                let acc = self.rotation.unwrap_or(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
                // keep contributions in the same hemisphere before summing
                let q = if acc.dot(q) < 0.0 { -q } else { q };
                self.rotation = Some(acc + q * weight);
                self.rotation_weight += weight;
            }
            SampledValue::Scale(s) => {
                self.scale += s * weight;
                self.scale_weight += weight;
            }
        }
    }
}

/// Animation state for one part node.
#[derive(Debug)]
pub struct PartMixer {
    root: NodeId,
    bindings: HashMap<String, NodeId>,
    actions: HashMap<ClipId, Action>,
    listeners: HashMap<ListenerId, ClipId>,
    fired: Vec<ListenerId>,
    next_listener: u64,
    time: f32,
}

impl PartMixer {
    pub fn new(root: NodeId, bindings: HashMap<String, NodeId>) -> Self {
        Self {
            root,
            bindings,
            actions: HashMap::new(),
            listeners: HashMap::new(),
            fired: Vec::new(),
            next_listener: 0,
            time: 0.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total time this mixer has been advanced.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Returns the action for `clip`, creating a stopped one on first use.
    pub fn clip_action(&mut self, clip: &Arc<AnimationClip>) -> &mut Action {
        self.actions
            .entry(clip.id())
            .or_insert_with(|| Action::new(Arc::clone(clip)))
    }

    pub fn existing_action(&self, clip: ClipId) -> Option<&Action> {
        self.actions.get(&clip)
    }

    pub fn existing_action_mut(&mut self, clip: ClipId) -> Option<&mut Action> {
        self.actions.get_mut(&clip)
    }

    /// Forgets the action for `clip`; it is stopped first.
    pub fn uncache_action(&mut self, clip: ClipId) -> Option<Action> {
        self.actions.remove(&clip).map(|mut action| {
            action.stop();
            action
        })
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.actions.values()
    }

    pub fn playing_count(&self) -> usize {
        self.actions.values().filter(|a| a.is_playing()).count()
    }

    pub fn stop_all(&mut self) {
        self.actions.values_mut().for_each(|action| {
            action.stop();
        });
    }

    /// Registers a one-time listener for the finish of `clip`.
    pub fn once_finished(&mut self, clip: ClipId) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.insert(id, clip);
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners that fired since the last call, in registration order.
    pub fn take_fired(&mut self) -> Vec<ListenerId> {
        let mut fired = std::mem::take(&mut self.fired);
        fired.sort();
        fired
    }

    /// Advances every playing action by `delta` seconds and writes the blended
    /// pose into the bound scene nodes.
    pub fn update(&mut self, delta: f32, scene: &mut SceneGraph) -> Vec<MixerEvent> {
        let delta = delta.max(0.0);
        self.time += delta;

        let mut events = Vec::new();
        for action in self.actions.values_mut() {
            if action.advance(delta) {
                events.push(MixerEvent::Finished {
                    clip: action.clip.id(),
                    clip_name: action.clip.name().to_string(),
                });
            }
        }

        for event in &events {
            let MixerEvent::Finished { clip, .. } = event;
            let matching: Vec<ListenerId> = self
                .listeners
                .iter()
                .filter(|(_, target)| *target == clip)
                .map(|(id, _)| *id)
                .collect();
            for id in matching {
                self.listeners.remove(&id);
                self.fired.push(id);
            }
        }

        self.apply_pose(scene);
        events
    }

    fn apply_pose(&self, scene: &mut SceneGraph) {
        let mut pose: HashMap<&str, PoseAccumulator> = HashMap::new();
        for action in self.actions.values().filter(|a| a.is_playing() && a.weight > 0.0) {
            let t = action.clip_time();
            for track in action.clip.tracks() {
                if !self.bindings.contains_key(track.target()) {
                    continue;
                }
                pose.entry(track.target())
                    .or_default()
                    .add(track.sample(t), action.weight);
            }
        }

        for (joint, acc) in pose {
            let Some(&node) = self.bindings.get(joint) else { continue };
            let Some(current) = scene.get(node).map(|n| n.transform) else {
                trace!("Mixer binding for {} points at a removed node", joint);
                continue;
            };

            let mut transform = current;
            if acc.translation_weight > 0.0 {
                transform.translation = acc.translation / acc.translation_weight;
            }
            if let Some(rotation) = acc.rotation.filter(|_| acc.rotation_weight > 0.0) {
                transform.rotation = rotation.normalize();
            }
            if acc.scale_weight > 0.0 {
                transform.scale = acc.scale / acc.scale_weight;
            }
            scene.set_local_transform(node, transform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Interpolation, Track, TrackValues};
    use crate::assets::{FragmentNode, SceneFragment};

    fn clip(name: &str, duration: f32) -> Arc<AnimationClip> {
        let track = Track::new(
            "hips",
            vec![0.0, duration],
            TrackValues::Translation(vec![Vec3::ZERO, Vec3::new(0.0, duration, 0.0)]),
            Interpolation::Linear,
        )
        .unwrap();
        Arc::new(AnimationClip::new(name, vec![track]))
    }

    fn mixer(scene: &mut SceneGraph) -> (PartMixer, NodeId) {
        let mut root = FragmentNode::named("body");
        root.children = vec![1];
        let fragment = SceneFragment::new(vec![root, FragmentNode::named("hips")]);
        let inst = scene.instantiate(&fragment);
        let hips = inst.by_name["hips"];
        (PartMixer::new(inst.root, inst.by_name), hips)
    }

    #[test]
    fn test_clip_action_is_shared_per_clip() {
        let mut scene = SceneGraph::new();
        let (mut mixer, _) = mixer(&mut scene);
        let idle = clip("idle", 1.0);

        mixer.clip_action(&idle).play();
        mixer.clip_action(&idle).play();
        assert_eq!(mixer.actions().count(), 1);
        assert_eq!(mixer.playing_count(), 1);
    }

    #[test]
    fn test_repeat_once_finishes_and_fires_listener() {
        let mut scene = SceneGraph::new();
        let (mut mixer, _) = mixer(&mut scene);
        let cheer = clip("cheer", 1.0);

        mixer.clip_action(&cheer).set_loop(LoopMode::Repeat(1)).play();
        let listener = mixer.once_finished(cheer.id());
        assert_eq!(mixer.listener_count(), 1);

        assert!(mixer.update(0.6, &mut scene).is_empty());
        let events = mixer.update(0.6, &mut scene);
        assert_eq!(events.len(), 1);
        assert_eq!(mixer.take_fired(), vec![listener]);
        assert_eq!(mixer.listener_count(), 0);
        assert!(!mixer.existing_action(cheer.id()).unwrap().is_playing());

        // the listener is one-time
        mixer.clip_action(&cheer).play();
        mixer.update(2.0, &mut scene);
        assert!(mixer.take_fired().is_empty());
    }

    #[test]
    fn test_removed_listener_never_fires() {
        let mut scene = SceneGraph::new();
        let (mut mixer, _) = mixer(&mut scene);
        let cheer = clip("cheer", 0.5);

        mixer.clip_action(&cheer).set_loop(LoopMode::Repeat(1)).play();
        let listener = mixer.once_finished(cheer.id());
        assert!(mixer.remove_listener(listener));
        mixer.update(1.0, &mut scene);
        assert!(mixer.take_fired().is_empty());
    }

    #[test]
    fn test_update_writes_bound_joint() {
        let mut scene = SceneGraph::new();
        let (mut mixer, hips) = mixer(&mut scene);
        let walk = clip("walk", 2.0);

        mixer.clip_action(&walk).play();
        mixer.update(1.0, &mut scene);
        let t = scene.get(hips).unwrap().transform.translation;
        assert!((t.y - 1.0).abs() < 1e-5);

        // wraps while repeating forever
        mixer.update(2.0, &mut scene);
        let t = scene.get(hips).unwrap().transform.translation;
        assert!((t.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_stopped_actions_do_not_advance() {
        let mut scene = SceneGraph::new();
        let (mut mixer, _) = mixer(&mut scene);
        let idle = clip("idle", 1.0);

        mixer.clip_action(&idle).play();
        mixer.update(0.25, &mut scene);
        mixer.clip_action(&idle).stop();
        mixer.update(0.25, &mut scene);
        assert_eq!(mixer.existing_action(idle.id()).unwrap().time(), 0.0);
        assert_eq!(mixer.time(), 0.5);
    }

    #[test]
    fn test_weights_blend_and_zero_weight_is_silent() {
        let mut scene = SceneGraph::new();
        let (mut mixer, hips) = mixer(&mut scene);
        let walk = clip("walk", 2.0);
        let lift = Arc::new(AnimationClip::new(
            "lift",
            vec![Track::new(
                "hips",
                vec![0.0, 2.0],
                TrackValues::Translation(vec![Vec3::new(0.0, 5.0, 0.0); 2]),
                Interpolation::Step,
            )
            .unwrap()],
        ));

        mixer.clip_action(&walk).set_weight(0.0).play();
        mixer.update(1.0, &mut scene);
        assert_eq!(scene.get(hips).unwrap().transform.translation, Vec3::ZERO);

        mixer.clip_action(&walk).set_weight(1.0);
        mixer.clip_action(&lift).set_weight(3.0).play();
        mixer.update(0.0, &mut scene);
        let t = scene.get(hips).unwrap().transform.translation;
        assert!((t.y - 4.0).abs() < 1e-5, "got {}", t.y);
    }
}
