#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use avatar_stage::assets::{AssetSource, ProgressReporter};
use avatar_stage::config::StageSettings;
use avatar_stage::rendering::HeadlessHost;
use avatar_stage::world::{AnimationManifest, AvatarManifest};
use avatar_stage::Session;

pub const BODY: &str = "models/body.gltf";
pub const HEAD: &str = "models/head.gltf";
pub const HAIR: &str = "models/hair.gltf";
pub const IDLE: &str = "animations/idle.gltf";
pub const CHEER: &str = "animations/cheer.gltf";
pub const BASIC_IDLE: &str = "animations/basic_idle.gltf";

pub const CHEER_SECONDS: f32 = 0.5;

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Minimal self-contained glTF: a chain of named joints, a triangle mesh on
/// the first one, and optionally one rotation clip on the first joint.
pub fn gltf_asset(joints: &[&str], clip: Option<(&str, f32)>) -> Vec<u8> {
    let duration = clip.map(|(_, seconds)| seconds).unwrap_or(1.0);
    let half = std::f32::consts::FRAC_1_SQRT_2;

    let mut buffer = floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    buffer.extend(floats(&[0.0, duration]));
    buffer.extend(floats(&[0.0, 0.0, 0.0, 1.0, 0.0, half, 0.0, half]));

    let nodes: Vec<serde_json::Value> = joints
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let mut node = json!({ "name": name });
            if i == 0 {
                node["mesh"] = json!(0);
            }
            if i + 1 < joints.len() {
                node["children"] = json!([i + 1]);
            }
            node
        })
        .collect();

    let mut document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": nodes,
        "meshes": [{
            "name": format!("{}_mesh", joints[0]),
            "primitives": [{ "attributes": { "POSITION": 0 }, "material": 0 }]
        }],
        "materials": [{
            "name": "skin",
            "pbrMetallicRoughness": { "baseColorFactor": [0.9, 0.7, 0.6, 1.0] }
        }],
        "buffers": [{
            "byteLength": buffer.len(),
            "uri": format!("data:application/octet-stream;base64,{}", STANDARD.encode(&buffer))
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 32 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [duration] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC4" }
        ]
    });

    if let Some((name, _)) = clip {
        document["animations"] = json!([{
            "name": name,
            "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }],
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "rotation" } }]
        }]);
    }

    serde_json::to_vec(&document).unwrap()
}

/// In-memory asset store that counts fetches per path.
#[derive(Default)]
pub struct MemorySource {
    files: Mutex<HashMap<String, Vec<u8>>>,
    fetches: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.files.lock().unwrap().insert(path.to_string(), bytes);
    }

    pub fn fetches(&self, path: &str) -> usize {
        self.fetches.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl AssetSource for MemorySource {
    async fn fetch(&self, path: &str, progress: &ProgressReporter<'_>) -> anyhow::Result<Vec<u8>> {
        *self.fetches.lock().unwrap().entry(path.to_string()).or_default() += 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let bytes = self
            .files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 not found: {}", path))?;
        progress.report(bytes.len() as u64, Some(bytes.len() as u64));
        Ok(bytes)
    }
}

/// Body and head carry an embedded clip; hair is static.
pub fn stock_source(delay: Duration) -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::with_delay(delay));
    source.insert(
        BODY,
        gltf_asset(&["body_hips", "body_spine", "body_neck"], Some(("body_rest", 1.0))),
    );
    source.insert(HEAD, gltf_asset(&["head_root", "jaw"], Some(("head_rest", 1.0))));
    source.insert(HAIR, gltf_asset(&["hair_root"], None));
    source.insert(IDLE, gltf_asset(&["body_hips"], Some(("idle", 2.0))));
    source.insert(CHEER, gltf_asset(&["body_hips"], Some(("cheer", CHEER_SECONDS))));
    source.insert(BASIC_IDLE, gltf_asset(&["body_hips"], Some(("basic_idle", 1.5))));
    source
}

pub fn stock_manifest() -> AvatarManifest {
    AvatarManifest {
        name: "tester".to_string(),
        base: BODY.to_string(),
        head: Some(HEAD.to_string()),
        hair: Some(HAIR.to_string()),
        idle: IDLE.to_string(),
    }
}

pub fn stock_gestures() -> AnimationManifest {
    AnimationManifest {
        idle: IDLE.to_string(),
        cheer: CHEER.to_string(),
        basic_idle: BASIC_IDLE.to_string(),
        ..AnimationManifest::default()
    }
}

pub fn session(source: Arc<MemorySource>) -> Session {
    let settings = StageSettings::default();
    Session::with_source(&settings, stock_gestures(), source, Box::new(HeadlessHost::new(640, 480)))
}
