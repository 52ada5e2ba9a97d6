use tracing::{debug, trace};

use super::camera::Camera;
use super::scene::SceneGraph;

/// The viewport side of the stage: owns the camera and draws the scene.
pub trait SceneHost: Send {
    fn resize(&mut self, width: u32, height: u32);

    fn render(&mut self, scene: &SceneGraph);
}

/// Host without a GPU surface. Counts draws and what they would cover.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    camera: Camera,
    size: (u32, u32),
    frames: u64,
    last_draw_calls: usize,
    last_node_count: usize,
}

impl HeadlessHost {
    pub fn new(width: u32, height: u32) -> Self {
        let mut host = Self::default();
        host.resize(width, height);
        host
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Mesh primitives drawn in the last frame.
    pub fn last_draw_calls(&self) -> usize {
        self.last_draw_calls
    }

    pub fn last_node_count(&self) -> usize {
        self.last_node_count
    }
}

impl SceneHost for HeadlessHost {
    fn resize(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.camera.set_viewport(width, height);
        debug!(
            "Headless viewport resized to {}x{} (aspect {:.3})",
            width, height, self.camera.aspect
        );
    }

    fn render(&mut self, scene: &SceneGraph) {
        self.frames += 1;
        self.last_node_count = scene.scene_node_count();
        self.last_draw_calls = scene
            .meshes_in_scene()
            .map(|(_, mesh)| mesh.primitive_count)
            .sum();
        trace!(
            "Frame {}: {} nodes, {} draw calls",
            self.frames,
            self.last_node_count,
            self.last_draw_calls
        );
    }
}
