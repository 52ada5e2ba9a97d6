use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Asset paths for one avatar. Head and hair are optional attachments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarManifest {
    pub name: String,
    pub base: String,
    pub head: Option<String>,
    pub hair: Option<String>,
    pub idle: String,
}

impl Default for AvatarManifest {
    fn default() -> Self {
        Self {
            name: "avatar".to_string(),
            base: "models/male/body.glb".to_string(),
            head: Some("models/male/head.glb".to_string()),
            hair: Some("models/male/hair.glb".to_string()),
            idle: "animations/idle.glb".to_string(),
        }
    }
}

impl AvatarManifest {
    /// An empty path in the file means the attachment is absent.
    pub fn head_path(&self) -> Option<&str> {
        self.head.as_deref().filter(|path| !path.is_empty())
    }

    pub fn hair_path(&self) -> Option<&str> {
        self.hair.as_deref().filter(|path| !path.is_empty())
    }

    /// Body plus present attachments.
    pub fn part_count(&self) -> usize {
        1 + self.head_path().is_some() as usize + self.hair_path().is_some() as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    Idle,
    Cheer,
    Dance1,
    Dance2,
    Dance3,
    Dance4,
    Dance5,
    Clap,
    Yelling,
    PreviewPose,
    BasicIdle,
}

impl Gesture {
    pub const ALL: [Gesture; 11] = [
        Gesture::Idle,
        Gesture::Cheer,
        Gesture::Dance1,
        Gesture::Dance2,
        Gesture::Dance3,
        Gesture::Dance4,
        Gesture::Dance5,
        Gesture::Clap,
        Gesture::Yelling,
        Gesture::PreviewPose,
        Gesture::BasicIdle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::Cheer => "cheer",
            Gesture::Dance1 => "dance1",
            Gesture::Dance2 => "dance2",
            Gesture::Dance3 => "dance3",
            Gesture::Dance4 => "dance4",
            Gesture::Dance5 => "dance5",
            Gesture::Clap => "clap",
            Gesture::Yelling => "yelling",
            Gesture::PreviewPose => "preview_pose",
            Gesture::BasicIdle => "basic_idle",
        }
    }

    /// Looping gestures replace the idle clip instead of playing once.
    pub fn is_idle_style(&self) -> bool {
        matches!(self, Gesture::Idle | Gesture::BasicIdle)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Gesture::ALL
            .into_iter()
            .find(|gesture| gesture.as_str() == wanted)
            .ok_or_else(|| format!("unknown gesture '{}'", s))
    }
}

/// Gesture -> clip path table supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationManifest {
    pub idle: String,
    pub cheer: String,
    pub dance1: String,
    pub dance2: String,
    pub dance3: String,
    pub dance4: String,
    pub dance5: String,
    pub clap: String,
    pub yelling: String,
    pub preview_pose: String,
    pub basic_idle: String,
}

impl Default for AnimationManifest {
    fn default() -> Self {
        let path = |gesture: Gesture| format!("animations/{}.glb", gesture.as_str());
        Self {
            idle: path(Gesture::Idle),
            cheer: path(Gesture::Cheer),
            dance1: path(Gesture::Dance1),
            dance2: path(Gesture::Dance2),
            dance3: path(Gesture::Dance3),
            dance4: path(Gesture::Dance4),
            dance5: path(Gesture::Dance5),
            clap: path(Gesture::Clap),
            yelling: path(Gesture::Yelling),
            preview_pose: path(Gesture::PreviewPose),
            basic_idle: path(Gesture::BasicIdle),
        }
    }
}

impl AnimationManifest {
    pub fn path(&self, gesture: Gesture) -> &str {
        match gesture {
            Gesture::Idle => &self.idle,
            Gesture::Cheer => &self.cheer,
            Gesture::Dance1 => &self.dance1,
            Gesture::Dance2 => &self.dance2,
            Gesture::Dance3 => &self.dance3,
            Gesture::Dance4 => &self.dance4,
            Gesture::Dance5 => &self.dance5,
            Gesture::Clap => &self.clap,
            Gesture::Yelling => &self.yelling,
            Gesture::PreviewPose => &self.preview_pose,
            Gesture::BasicIdle => &self.basic_idle,
        }
    }
}

/// On-disk manifest: one avatar plus its gesture table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestFile {
    pub avatar: AvatarManifest,
    pub gestures: AnimationManifest,
}

impl ManifestFile {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)?;
        let manifest = toml::from_str(&data)
            .map_err(|e| anyhow::anyhow!("invalid manifest {}: {}", path.display(), e))?;
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_names_round_trip() {
        for gesture in Gesture::ALL {
            assert_eq!(gesture.as_str().parse::<Gesture>(), Ok(gesture));
        }
        assert_eq!("Preview-Pose".parse::<Gesture>(), Ok(Gesture::PreviewPose));
        assert!("moonwalk".parse::<Gesture>().is_err());
    }

    #[test]
    fn test_default_paths() {
        let gestures = AnimationManifest::default();
        assert_eq!(gestures.path(Gesture::Dance3), "animations/dance3.glb");
        assert_eq!(AvatarManifest::default().part_count(), 3);
    }

    #[test]
    fn test_partial_manifest_keeps_defaults() {
        let manifest: ManifestFile = toml::from_str(
            r#"
            [avatar]
            name = "ada"
            hair = "models/female/hair.glb"

            [gestures]
            cheer = "clips/cheer.glb"
            "#,
        )
        .unwrap();

        assert_eq!(manifest.avatar.name, "ada");
        assert_eq!(manifest.avatar.base, "models/male/body.glb");
        assert_eq!(manifest.avatar.hair.as_deref(), Some("models/female/hair.glb"));
        assert_eq!(manifest.gestures.path(Gesture::Cheer), "clips/cheer.glb");
        assert_eq!(manifest.gestures.path(Gesture::Clap), "animations/clap.glb");
    }

    #[test]
    fn test_empty_attachment_is_absent() {
        let manifest: AvatarManifest = toml::from_str(r#"head = """#).unwrap();
        assert_eq!(manifest.head_path(), None);
        assert_eq!(manifest.part_count(), 2);
    }
}
