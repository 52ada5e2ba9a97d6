pub mod runtime;
pub mod settings;

// Re-export commonly used types
pub use runtime::build_runtime;
pub use settings::{
    AssetSettings, FrameSettings, LoggingSettings, RuntimeFlavor, RuntimeSettings, StageSettings,
    load_stage_settings, save_stage_settings, stage_config_path,
};
