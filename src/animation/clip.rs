use glam::{Quat, Vec3};
use std::fmt;
use uuid::Uuid;

/// Identity of a decoded clip. Two decodes of the same file are distinct clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipId(Uuid);

impl ClipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClipId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TrackValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

impl TrackValues {
    pub fn len(&self) -> usize {
        match self {
            TrackValues::Translation(v) => v.len(),
            TrackValues::Rotation(v) => v.len(),
            TrackValues::Scale(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keeps every `n`th key starting at `offset`.
    pub fn every_nth(self, n: usize, offset: usize) -> Self {
        fn pick<T: Copy>(values: Vec<T>, n: usize, offset: usize) -> Vec<T> {
            values.into_iter().skip(offset).step_by(n.max(1)).collect()
        }
        match self {
            TrackValues::Translation(v) => TrackValues::Translation(pick(v, n, offset)),
            TrackValues::Rotation(v) => TrackValues::Rotation(pick(v, n, offset)),
            TrackValues::Scale(v) => TrackValues::Scale(pick(v, n, offset)),
        }
    }
}

/// A single sampled value produced by a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampledValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

/// Keyframes for one property of one joint, addressed by joint name.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    target: String,
    times: Vec<f32>,
    values: TrackValues,
    interpolation: Interpolation,
}

impl Track {
    pub fn new(
        target: impl Into<String>,
        times: Vec<f32>,
        values: TrackValues,
        interpolation: Interpolation,
    ) -> Result<Self, String> {
        let target = target.into();
        if times.is_empty() {
            return Err(format!("track for '{}' has no keyframes", target));
        }
        if times.len() != values.len() {
            return Err(format!(
                "track for '{}' has {} times but {} values",
                target,
                times.len(),
                values.len()
            ));
        }
        if times.windows(2).any(|w| w[1] < w[0]) || times.iter().any(|t| !t.is_finite()) {
            return Err(format!("track for '{}' has unordered keyframe times", target));
        }
        Ok(Self {
            target,
            times,
            values,
            interpolation,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn values(&self) -> &TrackValues {
        &self.values
    }

    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Samples the track at `time`, clamping outside the keyed range.
    pub fn sample(&self, time: f32) -> SampledValue {
        let (a, b, alpha) = self.segment(time);
        let alpha = match self.interpolation {
            Interpolation::Linear => alpha,
            Interpolation::Step => 0.0,
        };
        match &self.values {
            TrackValues::Translation(v) => SampledValue::Translation(v[a].lerp(v[b], alpha)),
            TrackValues::Rotation(v) => SampledValue::Rotation(v[a].slerp(v[b], alpha).normalize()),
            TrackValues::Scale(v) => SampledValue::Scale(v[a].lerp(v[b], alpha)),
        }
    }

    fn segment(&self, time: f32) -> (usize, usize, f32) {
        let last = self.times.len() - 1;
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return (0, 0, 0.0);
        }
        if next > last {
            return (last, last, 0.0);
        }
        let (a, b) = (next - 1, next);
        let span = self.times[b] - self.times[a];
        let alpha = if span > 0.0 { (time - self.times[a]) / span } else { 0.0 };
        (a, b, alpha.clamp(0.0, 1.0))
    }
}

/// A named, fixed-duration skeletal animation.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    id: ClipId,
    name: String,
    duration: f32,
    tracks: Vec<Track>,
}

impl AnimationClip {
    /// Duration is the last keyframe time across all tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0f32, f32::max);
        Self {
            id: ClipId::new(),
            name: name.into(),
            duration,
            tracks,
        }
    }

    pub fn id(&self) -> ClipId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(Track::target)
    }
}
