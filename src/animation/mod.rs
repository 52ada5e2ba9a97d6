//! Skeletal animation runtime: clips, actions and per-part mixers.

pub mod clip;
pub mod mixer;

pub use clip::{AnimationClip, ClipId, Interpolation, SampledValue, Track, TrackValues};
pub use mixer::{Action, ActionState, ListenerId, LoopMode, MixerEvent, PartMixer};
