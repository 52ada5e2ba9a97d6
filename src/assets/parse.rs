//! glTF 2.0 decoding into scene fragments and animation clips.

use glam::{Quat, Vec3};
use gltf::animation::util::ReadOutputs;
use gltf::animation::Interpolation as GltfInterpolation;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

use super::material::MaterialRules;
use super::mesh::MeshInfo;
use super::{AssetHandle, LoadError, LoadResult};
use crate::animation::{AnimationClip, Interpolation, Track, TrackValues};
use crate::rendering::scene::Transform;

/// One node of a detached, immutable scene tree.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshInfo>,
    /// Indices into the owning fragment's node list.
    pub children: Vec<usize>,
}

impl FragmentNode {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            transform: Transform::IDENTITY,
            mesh: None,
            children: Vec::new(),
        }
    }
}

/// Node tree of one loaded file. Node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneFragment {
    nodes: Vec<FragmentNode>,
}

impl SceneFragment {
    /// Panics if `nodes` is empty.
    pub fn new(nodes: Vec<FragmentNode>) -> Self {
        assert!(!nodes.is_empty(), "scene fragment needs a root node");
        Self { nodes }
    }

    pub fn root(&self) -> &FragmentNode {
        &self.nodes[0]
    }

    pub fn nodes(&self) -> &[FragmentNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn find(&self, name: &str) -> Option<&FragmentNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    pub fn meshes(&self) -> impl Iterator<Item = &MeshInfo> {
        self.nodes.iter().filter_map(|node| node.mesh.as_ref())
    }
}

/// Parses a `.glb` or self-contained `.gltf` payload.
pub fn parse_asset(path: &str, bytes: &[u8], rules: &MaterialRules) -> LoadResult<AssetHandle> {
    let (document, buffers, _images) =
        gltf::import_slice(bytes).map_err(|e| LoadError::parse(path, e.to_string()))?;

    let names: Vec<String> = document
        .nodes()
        .map(|node| {
            node.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", node.index()))
        })
        .collect();

    let fragment = read_fragment(path, &document, &names, rules)?;

    let mut clips = Vec::new();
    for animation in document.animations() {
        clips.push(read_clip(path, &animation, &buffers, &names)?);
    }

    Ok(AssetHandle::new(path, fragment, clips))
}

fn read_fragment(
    path: &str,
    document: &gltf::Document,
    names: &[String],
    rules: &MaterialRules,
) -> LoadResult<SceneFragment> {
    let root_name = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("asset")
        .to_string();

    // gltf node i lives at fragment index i + 1
    let mut nodes = vec![FragmentNode::named(&root_name)];
    for node in document.nodes() {
        let (t, r, s) = node.transform().decomposed();
        let mut mesh = node
            .mesh()
            .map(|mesh| MeshInfo::from_gltf(&mesh, node.skin().is_some()));
        if let Some(mesh) = mesh.as_mut() {
            mesh.materials.iter_mut().for_each(|m| rules.apply(m));
        }
        nodes.push(FragmentNode {
            name: names[node.index()].clone(),
            transform: Transform::from_gltf(t, r, s),
            mesh,
            children: node.children().map(|child| child.index() + 1).collect(),
        });
    }

    let scene = document.default_scene().or_else(|| document.scenes().next());
    let scene_roots: Vec<usize> = match scene {
        Some(scene) => scene.nodes().map(|node| node.index() + 1).collect(),
        None => {
            let parented: HashSet<usize> = document
                .nodes()
                .flat_map(|node| node.children().map(|child| child.index()))
                .collect();
            document
                .nodes()
                .map(|node| node.index())
                .filter(|idx| !parented.contains(idx))
                .map(|idx| idx + 1)
                .collect()
        }
    };
    nodes[0].children = scene_roots;

    if !is_forest(&nodes) {
        return Err(LoadError::parse(path, "node hierarchy is not a tree"));
    }
    Ok(SceneFragment::new(nodes))
}

/// True when every node has at most one parent and no child link leads back
/// to an ancestor.
fn is_forest(nodes: &[FragmentNode]) -> bool {
    let mut parents = vec![0usize; nodes.len()];
    for &child in nodes.iter().flat_map(|node| &node.children) {
        parents[child] += 1;
        if parents[child] > 1 {
            return false;
        }
    }

    // with single parents, a node missed by the walk from the parentless
    // nodes sits on a cycle
    let mut visited = vec![false; nodes.len()];
    let mut stack: Vec<usize> = (0..nodes.len()).filter(|&i| parents[i] == 0).collect();
    let mut seen = 0;
    while let Some(idx) = stack.pop() {
        if std::mem::replace(&mut visited[idx], true) {
            return false;
        }
        seen += 1;
        stack.extend(nodes[idx].children.iter().copied());
    }
    seen == nodes.len()
}

fn read_clip(
    path: &str,
    animation: &gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
    names: &[String],
) -> LoadResult<AnimationClip> {
    let name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("clip_{}", animation.index()));

    let mut tracks = Vec::new();
    for channel in animation.channels() {
        let target = names[channel.target().node().index()].clone();
        let reader =
            channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

        let missing = |what: &str| {
            LoadError::parse(path, format!("clip '{}' has a channel without {}", name, what))
        };
        let times: Vec<f32> = reader.read_inputs().ok_or_else(|| missing("input times"))?.collect();
        let outputs = reader.read_outputs().ok_or_else(|| missing("output values"))?;

        let values = match outputs {
            ReadOutputs::Translations(values) => {
                TrackValues::Translation(values.map(Vec3::from).collect())
            }
            ReadOutputs::Rotations(values) => {
                TrackValues::Rotation(values.into_f32().map(Quat::from_array).collect())
            }
            ReadOutputs::Scales(values) => TrackValues::Scale(values.map(Vec3::from).collect()),
            ReadOutputs::MorphTargetWeights(_) => {
                debug!("Skipping morph target channel on {} in clip '{}'", target, name);
                continue;
            }
        };

        let (values, interpolation) = match channel.sampler().interpolation() {
            GltfInterpolation::Linear => (values, Interpolation::Linear),
            GltfInterpolation::Step => (values, Interpolation::Step),
            // keyframes are (in-tangent, value, out-tangent); keep the values
            GltfInterpolation::CubicSpline => {
                warn!("Clip '{}' uses cubic spline keys, sampling them linearly", name);
                (values.every_nth(3, 1), Interpolation::Linear)
            }
        };

        let track = Track::new(target, times, values, interpolation)
            .map_err(|reason| LoadError::parse(path, format!("clip '{}': {}", name, reason)))?;
        tracks.push(track);
    }

    Ok(AnimationClip::new(name, tracks))
}
