use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

use crate::assets::{AssetLoader, AssetSource, FileSource, HttpSource};
use crate::config::StageSettings;
use crate::rendering::{FrameLoop, FrameMetrics, SceneHost};
use crate::ui::StageCommand;
use crate::world::{
    AnimationController, AnimationManifest, AvatarComposer, AvatarHandle, AvatarSnapshot,
    StageContext,
};

/// One running stage: the shared context, its components and the frame loop.
pub struct Session {
    context: Arc<StageContext>,
    composer: AvatarComposer,
    controller: AnimationController,
    frame_loop: FrameLoop,
    torn_down: bool,
}

/// What a console command produced.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Done(String),
    Quit,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    frames: u64,
    avg_fps: f32,
    avatar: Option<AvatarSnapshot>,
}

impl Session {
    /// Builds the asset source from `settings` and wires every component to one context.
    pub fn init(
        settings: &StageSettings,
        gestures: AnimationManifest,
        host: Box<dyn SceneHost>,
    ) -> anyhow::Result<Self> {
        let source: Arc<dyn AssetSource> = match &settings.assets.base_url {
            Some(base) => {
                let url = Url::parse(base)
                    .map_err(|e| anyhow::anyhow!("invalid asset base url '{}': {}", base, e))?;
                info!("Serving assets from {}", url);
                Arc::new(HttpSource::new(url))
            }
            None => {
                info!("Serving assets from {}", settings.assets.base_dir.display());
                Arc::new(FileSource::new(&settings.assets.base_dir))
            }
        };
        Ok(Self::with_source(settings, gestures, source, host))
    }

    pub fn with_source(
        settings: &StageSettings,
        gestures: AnimationManifest,
        source: Arc<dyn AssetSource>,
        mut host: Box<dyn SceneHost>,
    ) -> Self {
        let loader = AssetLoader::new(source, settings.materials);
        let context = StageContext::new(loader);
        host.resize(settings.frame.viewport_width, settings.frame.viewport_height);
        let frame_loop = FrameLoop::new(Arc::clone(&context), host, settings.frame.target_fps);

        Self {
            composer: AvatarComposer::new(Arc::clone(&context)),
            controller: AnimationController::new(Arc::clone(&context), gestures),
            frame_loop,
            context,
            torn_down: false,
        }
    }

    pub fn context(&self) -> &Arc<StageContext> {
        &self.context
    }

    pub fn composer(&self) -> &AvatarComposer {
        &self.composer
    }

    pub fn controller(&self) -> &AnimationController {
        &self.controller
    }

    pub fn frame_metrics(&self) -> FrameMetrics {
        self.frame_loop.metrics()
    }

    /// Starts the render loop. Idempotent.
    pub fn start(&mut self) -> bool {
        self.frame_loop.start()
    }

    pub fn is_running(&self) -> bool {
        self.frame_loop.is_running()
    }

    pub async fn resize(&self, width: u32, height: u32) {
        self.frame_loop.resize(width, height).await;
    }

    /// Applies one console command to `avatar`.
    pub async fn execute(
        &self,
        avatar: &AvatarHandle,
        command: StageCommand,
    ) -> anyhow::Result<CommandOutcome> {
        let message = match command {
            StageCommand::IdleStart => {
                avatar.idle().start().await;
                "idle started".to_string()
            }
            StageCommand::IdleStop => {
                avatar.idle().stop().await;
                "idle stopped".to_string()
            }
            StageCommand::Play { gesture } => {
                self.controller.play_gesture(avatar.id(), gesture).await?;
                format!("playing {}", gesture)
            }
            StageCommand::Stop => {
                self.controller.stop(avatar.id()).await?;
                "stopped".to_string()
            }
            StageCommand::Status => {
                let metrics = self.frame_loop.metrics();
                let report = StatusReport {
                    frames: metrics.frames,
                    avg_fps: metrics.avg_fps,
                    avatar: avatar.snapshot().await,
                };
                serde_json::to_string_pretty(&report)?
            }
            StageCommand::Quit => return Ok(CommandOutcome::Quit),
        };
        Ok(CommandOutcome::Done(message))
    }

    /// Shuts the stage down: cancels in-flight loads, stops the frame loop and
    /// removes every avatar from the scene. Safe to call more than once.
    pub async fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.context.close();
        self.frame_loop.stop().await;
        let removed = self.context.clear().await;

        let state = self.context.lock().await;
        if !state.scene.is_empty() {
            warn!("{} nodes left in the scene after teardown", state.scene.len());
        }
        info!("Session torn down ({} avatars removed)", removed);
    }
}
