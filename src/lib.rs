// avatar-stage: multi-part avatar composition and animation playback

pub mod animation;
pub mod app;
pub mod assets;
pub mod config;
pub mod rendering;
pub mod ui;
pub mod utils;
pub mod world;

// Re-export commonly used types for convenience
pub use app::{CommandOutcome, Session};
pub use config::StageSettings;
pub use world::{AnimationController, AvatarComposer, AvatarHandle, StageContext};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
