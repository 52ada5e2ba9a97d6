use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex, MutexGuard};
use tracing::{debug, info, trace};

use super::avatar::{Avatar, AvatarId};
use super::events::{StageEvent, StageEventKind};
use crate::assets::{AssetLoader, ClipCache};
use crate::rendering::host::SceneHost;
use crate::rendering::scene::SceneGraph;

const EVENT_CAPACITY: usize = 256;

/// Everything the frame loop and the controllers mutate.
#[derive(Debug, Default)]
pub struct StageState {
    pub scene: SceneGraph,
    pub avatars: HashMap<AvatarId, Avatar>,
}

/// Shared context handed to every stage component.
///
/// Lock order is trivial: there is one lock, and it is never held across an
/// asset load.
pub struct StageContext {
    state: Mutex<StageState>,
    loader: AssetLoader,
    clips: ClipCache,
    events: broadcast::Sender<StageEvent>,
    shutdown: watch::Sender<bool>,
}

impl StageContext {
    pub fn new(loader: AssetLoader) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (shutdown, _) = watch::channel(false);
        Arc::new(Self {
            state: Mutex::new(StageState::default()),
            clips: ClipCache::new(loader.clone()),
            loader,
            events,
            shutdown,
        })
    }

    pub async fn lock(&self) -> MutexGuard<'_, StageState> {
        self.state.lock().await
    }

    pub fn loader(&self) -> &AssetLoader {
        &self.loader
    }

    pub fn clips(&self) -> &ClipCache {
        &self.clips
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StageEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, kind: StageEventKind) {
        trace!("Stage event {:?}", kind);
        // nobody listening is fine
        let _ = self.events.send(StageEvent::new(kind));
    }

    /// Signals shutdown to every in-flight build and load.
    pub fn close(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Runs `fut` unless the stage shuts down first.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        if self.is_closed() {
            return None;
        }
        let mut shutdown = self.shutdown.subscribe();
        tokio::select! {
            output = fut => Some(output),
            _ = shutdown.wait_for(|closed| *closed) => None,
        }
    }

    /// Advances every avatar by `delta` seconds and draws one frame.
    pub async fn tick(&self, delta: f32, host: &mut dyn SceneHost) {
        let mut guard = self.lock().await;
        let state = &mut *guard;

        let mut events = Vec::new();
        for avatar in state.avatars.values_mut() {
            events.extend(avatar.update(delta, &mut state.scene));
        }
        for event in events {
            self.emit(event);
        }

        host.render(&state.scene);
    }

    /// Removes one avatar and its nodes. Returns false if it was not registered.
    pub async fn remove_avatar(&self, id: AvatarId) -> bool {
        let mut guard = self.lock().await;
        let state = &mut *guard;
        let Some(mut avatar) = state.avatars.remove(&id) else {
            return false;
        };
        avatar.cleanup();
        let freed = state.scene.remove(avatar.root());
        debug!("Removed avatar {} ({} nodes)", avatar.name(), freed);
        self.emit(StageEventKind::AvatarRemoved { avatar: id });
        true
    }

    /// Drops every avatar and its subtree.
    pub async fn clear(&self) -> usize {
        let mut guard = self.lock().await;
        let state = &mut *guard;
        let avatars: Vec<Avatar> = state.avatars.drain().map(|(_, avatar)| avatar).collect();
        let count = avatars.len();
        for mut avatar in avatars {
            avatar.cleanup();
            state.scene.remove(avatar.root());
            self.emit(StageEventKind::AvatarRemoved {
                avatar: avatar.id(),
            });
        }
        if count > 0 {
            info!("Cleared {} avatars from the stage", count);
        }
        count
    }
}
