use glam::{Mat4, Vec3};

/// Perspective camera looking at the stage origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub aspect: f32,
    /// Vertical field of view in degrees.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, 100.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            aspect: 1.0,
            fovy: 45.0,
            znear: 0.1,
            zfar: 1000.0,
        }
    }
}

impl Camera {
    /// Updates the aspect ratio for a viewport. A zero-height viewport keeps 1:1.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = if width == 0 || height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
    }

    pub fn view_projection(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye, self.target, self.up);
        let proj = Mat4::perspective_rh(self.fovy.to_radians(), self.aspect, self.znear, self.zfar);
        proj * view
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_aspect() {
        let mut camera = Camera::default();
        camera.set_viewport(1600, 800);
        assert_eq!(camera.aspect, 2.0);
        camera.set_viewport(1600, 0);
        assert_eq!(camera.aspect, 1.0);
        assert!(camera.view_projection().is_finite());
    }
}
