pub mod camera;
pub mod frame_loop;
pub mod host;
pub mod scene;

pub use camera::Camera;
pub use frame_loop::{FrameClock, FrameLoop, FrameMetrics};
pub use host::{HeadlessHost, SceneHost};
