use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::loader::AssetLoader;
use super::{LoadError, LoadResult};
use crate::animation::AnimationClip;

type Outcome = Option<LoadResult<Arc<AnimationClip>>>;

enum Slot {
    Ready(Arc<AnimationClip>),
    /// A load is running; followers wait on the leader's result.
    Loading(watch::Receiver<Outcome>),
}

/// Path -> decoded clip table shared by every avatar.
///
/// Concurrent requests for a path that is still loading share a single
/// fetch. Successful clips are kept for the life of the cache; failures are
/// handed to everyone who waited on them and then forgotten.
#[derive(Clone)]
pub struct ClipCache {
    loader: AssetLoader,
    entries: Arc<Mutex<HashMap<String, Slot>>>,
}

enum Role {
    Hit(Arc<AnimationClip>),
    Leader(watch::Sender<Outcome>),
    Follower(watch::Receiver<Outcome>),
}

impl ClipCache {
    pub fn new(loader: AssetLoader) -> Self {
        Self {
            loader,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    /// Returns the first clip of the asset at `path`, loading it at most once.
    pub async fn get_or_load(&self, path: &str) -> LoadResult<Arc<AnimationClip>> {
        loop {
            match self.claim(path).await {
                Role::Hit(clip) => {
                    debug!("Clip cache hit for {}", path);
                    return Ok(clip);
                }
                Role::Leader(tx) => return self.lead(path, tx).await,
                Role::Follower(mut rx) => {
                    let waited = rx.wait_for(Option::is_some).await.map(|outcome| outcome.clone());
                    match waited {
                        Ok(Some(result)) => return result,
                        _ => {
                            // leader went away without publishing; retry from scratch
                            let mut entries = self.entries.lock().await;
                            if let Some(Slot::Loading(current)) = entries.get(path) {
                                if current.same_channel(&rx) {
                                    entries.remove(path);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    async fn claim(&self, path: &str) -> Role {
        let mut entries = self.entries.lock().await;
        match entries.get(path) {
            Some(Slot::Ready(clip)) => Role::Hit(Arc::clone(clip)),
            Some(Slot::Loading(rx)) => Role::Follower(rx.clone()),
            None => {
                let (tx, rx) = watch::channel(None);
                entries.insert(path.to_string(), Slot::Loading(rx));
                Role::Leader(tx)
            }
        }
    }

    async fn lead(&self, path: &str, tx: watch::Sender<Outcome>) -> LoadResult<Arc<AnimationClip>> {
        let result = self.load_first_clip(path).await;

        {
            let mut entries = self.entries.lock().await;
            match &result {
                Ok(clip) => {
                    entries.insert(path.to_string(), Slot::Ready(Arc::clone(clip)));
                }
                Err(e) => {
                    warn!("Clip load for {} failed, not caching: {}", path, e);
                    entries.remove(path);
                }
            }
        }

        tx.send_replace(Some(result.clone()));
        result
    }

    async fn load_first_clip(&self, path: &str) -> LoadResult<Arc<AnimationClip>> {
        let handle = self.loader.load(path).await?;
        handle
            .first_clip()
            .cloned()
            .ok_or_else(|| LoadError::parse(path, "no animation clip"))
    }

    /// Number of resolved clips.
    pub async fn len(&self) -> usize {
        self.entries
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a resolved clip is cached for `path`.
    pub async fn contains(&self, path: &str) -> bool {
        matches!(self.entries.lock().await.get(path), Some(Slot::Ready(_)))
    }
}
