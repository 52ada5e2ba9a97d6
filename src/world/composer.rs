use std::sync::Arc;
use tracing::{error, info};

use super::avatar::{Avatar, AvatarHandle, AvatarPart, PartRole};
use super::events::StageEventKind;
use super::manifest::AvatarManifest;
use super::stage::StageContext;
use super::CompositionError;
use crate::animation::{AnimationClip, PartMixer};
use crate::assets::AssetHandle;

/// Loaded but not yet committed avatar.
struct LoadedParts {
    body: AssetHandle,
    head: Option<AssetHandle>,
    hair: Option<AssetHandle>,
    idle: Arc<AnimationClip>,
}

/// Builds multi-part avatars from manifests.
#[derive(Clone)]
pub struct AvatarComposer {
    context: Arc<StageContext>,
}

impl AvatarComposer {
    pub fn new(context: Arc<StageContext>) -> Self {
        Self { context }
    }

    /// Loads every part, then commits them to the stage in one step.
    ///
    /// Nothing is added to the scene unless every load succeeded.
    pub async fn build(&self, manifest: &AvatarManifest) -> Result<AvatarHandle, CompositionError> {
        info!("Building avatar '{}' ({} parts)", manifest.name, manifest.part_count());

        let loaded = match self.context.guard(self.load_parts(manifest)).await {
            Some(result) => result,
            None => Err(CompositionError::Cancelled),
        };

        let result = match loaded {
            Ok(parts) => self.commit(manifest, parts).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            error!("Avatar '{}' failed to build: {}", manifest.name, e);
            self.context.emit(StageEventKind::AvatarBuildFailed {
                name: manifest.name.clone(),
                reason: e.to_string(),
            });
        }
        result
    }

    async fn load_parts(&self, manifest: &AvatarManifest) -> Result<LoadedParts, CompositionError> {
        let loader = self.context.loader();
        let part_error = |role: PartRole| {
            let avatar = manifest.name.clone();
            move |source| CompositionError::Part {
                avatar,
                role,
                source,
            }
        };

        let body = loader
            .load(&manifest.base)
            .await
            .map_err(part_error(PartRole::Body))?;

        let head = async {
            match manifest.head_path() {
                Some(path) => loader.load(path).await.map(Some).map_err(part_error(PartRole::Head)),
                None => Ok(None),
            }
        };
        let hair = async {
            match manifest.hair_path() {
                Some(path) => loader.load(path).await.map(Some).map_err(part_error(PartRole::Hair)),
                None => Ok(None),
            }
        };
        let (head, hair) = tokio::try_join!(head, hair)?;

        let idle = self
            .context
            .clips()
            .get_or_load(&manifest.idle)
            .await
            .map_err(|source| CompositionError::IdleClip {
                avatar: manifest.name.clone(),
                source,
            })?;

        Ok(LoadedParts {
            body,
            head,
            hair,
            idle,
        })
    }

    async fn commit(
        &self,
        manifest: &AvatarManifest,
        loaded: LoadedParts,
    ) -> Result<AvatarHandle, CompositionError> {
        let mut guard = self.context.lock().await;
        if self.context.is_closed() {
            return Err(CompositionError::Cancelled);
        }
        let state = &mut *guard;

        let body = state.scene.instantiate(loaded.body.root());
        let root = body.root;
        let mut parts = vec![AvatarPart {
            role: PartRole::Body,
            node: root,
            mixer: PartMixer::new(root, body.by_name),
            animated: loaded.body.is_animated(),
        }];

        let attachments = [(PartRole::Head, loaded.head), (PartRole::Hair, loaded.hair)];
        for (role, handle) in attachments {
            let Some(handle) = handle else { continue };
            let inst = state.scene.instantiate(handle.root());
            state.scene.attach(inst.root, root);
            parts.push(AvatarPart {
                role,
                node: inst.root,
                mixer: PartMixer::new(inst.root, inst.by_name),
                animated: handle.is_animated(),
            });
        }

        let part_count = parts.len();
        let mut avatar = Avatar::new(manifest.name.clone(), root, parts, loaded.idle);
        avatar.start_idle();
        state.scene.add(root);

        let id = avatar.id();
        state.avatars.insert(id, avatar);
        drop(guard);

        info!("Avatar '{}' ready as {} with {} mixers", manifest.name, id, part_count);
        self.context.emit(StageEventKind::AvatarBuilt {
            avatar: id,
            name: manifest.name.clone(),
            parts: part_count,
        });
        Ok(AvatarHandle::new(id, Arc::clone(&self.context)))
    }
}
