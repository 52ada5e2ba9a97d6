use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::assets::MaterialRules;

const STAGE_CONFIG_FILE: &str = "stage.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetSettings {
    /// Directory that relative asset paths resolve against.
    pub base_dir: PathBuf,
    /// When set, assets are fetched over HTTP from here instead of `base_dir`.
    pub base_url: Option<String>,
}

impl Default for AssetSettings {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("static"),
            base_url: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameSettings {
    pub target_fps: f32,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self {
            target_fps: 60.0,
            viewport_width: 1280,
            viewport_height: 720,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeFlavor {
    CurrentThread,
    MultiThread,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub flavor: RuntimeFlavor,
    /// Worker count for the multi-threaded runtime; 0 lets tokio decide.
    pub worker_threads: usize,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            flavor: RuntimeFlavor::MultiThread,
            worker_threads: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter used when RUST_LOG is not set.
    pub level: String,
    /// Plain-text log file, recreated on every start.
    pub file: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            ansi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageSettings {
    pub assets: AssetSettings,
    pub materials: MaterialRules,
    pub frame: FrameSettings,
    pub runtime: RuntimeSettings,
    pub logging: LoggingSettings,
}

impl StageSettings {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        toml::from_str(&data)
            .map_err(|e| anyhow::anyhow!("invalid settings {}: {}", path.display(), e))
    }

    pub fn save_to(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        fs::write(path, toml)
    }
}

pub fn stage_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "avatar-stage", "avatar-stage")
        .map(|proj| proj.config_dir().join(STAGE_CONFIG_FILE))
}

pub fn save_stage_settings(settings: &StageSettings) -> std::io::Result<()> {
    if let Some(path) = stage_config_path() {
        settings.save_to(path)?;
    }
    Ok(())
}

pub fn load_stage_settings() -> Option<StageSettings> {
    let path = stage_config_path()?;
    let data = fs::read_to_string(path).ok()?;
    toml::from_str::<StageSettings>(&data).ok()
}
