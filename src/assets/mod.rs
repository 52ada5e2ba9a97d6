//! Asset pipeline: byte sources, glTF parsing, and the shared clip cache.
//!
//! Everything that crosses the load boundary is validated into an
//! [`AssetHandle`]; nothing downstream inspects raw glTF documents.

pub mod cache;
pub mod loader;
pub mod material;
pub mod mesh;
pub mod parse;
pub mod source;

use std::sync::Arc;
use thiserror::Error;

use crate::animation::AnimationClip;

pub use cache::ClipCache;
pub use loader::{AssetLoader, LoadProgress, ProgressSink};
pub use material::{Material, MaterialRules};
pub use mesh::MeshInfo;
pub use parse::{parse_asset, FragmentNode, SceneFragment};
pub use source::{AssetSource, FileSource, HttpSource, ProgressReporter};

/// Why a load failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadCause {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("parse failed: {0}")]
    Parse(String),

    #[error("load cancelled")]
    Cancelled,
}

/// A failed asset fetch or parse, tagged with the path that was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load '{path}': {cause}")]
pub struct LoadError {
    pub path: String,
    pub cause: LoadCause,
}

impl LoadError {
    pub fn fetch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: LoadCause::Fetch(reason.into()),
        }
    }

    pub fn parse(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: LoadCause::Parse(reason.into()),
        }
    }

    pub fn cancelled(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            cause: LoadCause::Cancelled,
        }
    }
}

pub type LoadResult<T> = Result<T, LoadError>;

/// A parsed scene/animation file.
///
/// Immutable once created; clips are shared by reference with every mixer
/// that binds them.
#[derive(Debug, Clone)]
pub struct AssetHandle {
    path: String,
    root: Arc<SceneFragment>,
    clips: Vec<Arc<AnimationClip>>,
}

impl AssetHandle {
    pub fn new(path: impl Into<String>, root: SceneFragment, clips: Vec<AnimationClip>) -> Self {
        Self {
            path: path.into(),
            root: Arc::new(root),
            clips: clips.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> &Arc<SceneFragment> {
        &self.root
    }

    pub fn clips(&self) -> &[Arc<AnimationClip>] {
        &self.clips
    }

    pub fn first_clip(&self) -> Option<&Arc<AnimationClip>> {
        self.clips.first()
    }

    /// Whether the file carried any embedded animation.
    pub fn is_animated(&self) -> bool {
        !self.clips.is_empty()
    }
}
