use generational_arena::{Arena, Index};
use glam::Mat4;
use std::collections::HashMap;

use super::Transform;
use crate::assets::{MeshInfo, SceneFragment};

/// Generational node reference; stale after the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(Index);

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub transform: Transform,
    pub mesh: Option<MeshInfo>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Result of copying a [`SceneFragment`] into the graph.
#[derive(Debug, Clone)]
pub struct Instantiated {
    pub root: NodeId,
    /// Node name -> node, for the instantiated subtree only. First name wins.
    pub by_name: HashMap<String, NodeId>,
}

/// Node arena plus the set of roots that are currently part of the scene.
///
/// Instantiated nodes start detached: they live in the arena but are not
/// drawn until their root is passed to [`SceneGraph::add`].
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: Arena<SceneNode>,
    roots: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instantiate(&mut self, fragment: &SceneFragment) -> Instantiated {
        let mut ids = Vec::with_capacity(fragment.len());
        for node in fragment.nodes() {
            let idx = self.nodes.insert(SceneNode {
                name: node.name.clone(),
                transform: node.transform,
                mesh: node.mesh.clone(),
                parent: None,
                children: Vec::new(),
            });
            ids.push(NodeId(idx));
        }

        let mut by_name = HashMap::with_capacity(ids.len());
        for (i, node) in fragment.nodes().iter().enumerate() {
            by_name.entry(node.name.clone()).or_insert(ids[i]);
            for &child in &node.children {
                self.link(ids[child], ids[i]);
            }
        }

        Instantiated {
            root: ids[0],
            by_name,
        }
    }

    fn link(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.nodes.get_mut(child.0) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.nodes.get_mut(parent.0) {
            node.children.push(child);
        }
    }

    /// Re-parents `child` under `parent`. Fails for unknown nodes or cycles.
    pub fn attach(&mut self, child: NodeId, parent: NodeId) -> bool {
        if child == parent || !self.contains(child) || !self.contains(parent) {
            return false;
        }
        if self.ancestors(parent).any(|ancestor| ancestor == child) {
            return false;
        }

        self.detach(child);
        self.roots.retain(|root| *root != child);
        self.link(child, parent);
        true
    }

    fn detach(&mut self, child: NodeId) {
        let old_parent = self.nodes.get_mut(child.0).and_then(|node| node.parent.take());
        if let Some(parent) = old_parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.retain(|c| *c != child);
        }
    }

    /// Adds a detached root to the scene.
    pub fn add(&mut self, root: NodeId) -> bool {
        match self.nodes.get(root.0) {
            Some(node) if node.parent.is_none() => {
                if !self.roots.contains(&root) {
                    self.roots.push(root);
                }
                true
            }
            _ => false,
        }
    }

    /// Removes `node` and its whole subtree from the graph. Returns the number of nodes freed.
    pub fn remove(&mut self, node: NodeId) -> usize {
        if !self.contains(node) {
            return 0;
        }
        self.detach(node);
        self.roots.retain(|root| *root != node);

        let doomed = self.subtree(node);
        for id in &doomed {
            self.nodes.remove(id.0);
        }
        doomed.len()
    }

    pub fn subtree(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(n) = self.nodes.get(id.0) {
                out.push(id);
                stack.extend(n.children.iter().copied());
            }
        }
        out
    }

    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut current = self.get(node).and_then(|n| n.parent);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.get(id).and_then(|n| n.parent);
            Some(id)
        })
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    /// Whether the node is reachable from one of the scene roots.
    pub fn is_in_scene(&self, node: NodeId) -> bool {
        if !self.contains(node) {
            return false;
        }
        let top = self.ancestors(node).last().unwrap_or(node);
        self.roots.contains(&top)
    }

    pub fn get(&self, node: NodeId) -> Option<&SceneNode> {
        self.nodes.get(node.0)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(node.0)
    }

    pub fn set_local_transform(&mut self, node: NodeId, transform: Transform) -> bool {
        match self.nodes.get_mut(node.0) {
            Some(n) => {
                n.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn world_matrix(&self, node: NodeId) -> Option<Mat4> {
        let mut matrix = self.get(node)?.transform.matrix();
        for ancestor in self.ancestors(node) {
            matrix = self.get(ancestor)?.transform.matrix() * matrix;
        }
        Some(matrix)
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Total nodes in the arena, attached or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes reachable from the scene roots.
    pub fn scene_node_count(&self) -> usize {
        self.roots.iter().map(|root| self.subtree(*root).len()).sum()
    }

    pub fn meshes_in_scene(&self) -> impl Iterator<Item = (&SceneNode, &MeshInfo)> + '_ {
        self.roots
            .iter()
            .flat_map(move |root| self.subtree(*root))
            .filter_map(move |id| self.get(id))
            .filter_map(|node| node.mesh.as_ref().map(|mesh| (node, mesh)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FragmentNode;

    fn fragment(names: &[&str]) -> SceneFragment {
        // root -> every other node
        let mut nodes: Vec<FragmentNode> = names
            .iter()
            .map(|name| FragmentNode::named(name))
            .collect();
        nodes[0].children = (1..names.len()).collect();
        SceneFragment::new(nodes)
    }

    #[test]
    fn test_instantiate_is_detached() {
        let mut scene = SceneGraph::new();
        let inst = scene.instantiate(&fragment(&["body", "hips", "spine"]));

        assert_eq!(scene.len(), 3);
        assert_eq!(scene.scene_node_count(), 0);
        assert!(!scene.is_in_scene(inst.root));
        assert!(inst.by_name.contains_key("spine"));
    }

    #[test]
    fn test_attach_and_add() {
        let mut scene = SceneGraph::new();
        let body = scene.instantiate(&fragment(&["body", "hips"]));
        let head = scene.instantiate(&fragment(&["head", "jaw"]));

        assert!(scene.attach(head.root, body.root));
        assert!(scene.add(body.root));
        assert!(!scene.add(head.root), "attached nodes cannot become roots");

        assert_eq!(scene.scene_node_count(), 4);
        assert!(scene.is_in_scene(head.by_name["jaw"]));
        assert_eq!(scene.get(head.root).and_then(|n| n.parent()), Some(body.root));
    }

    #[test]
    fn test_attach_rejects_cycles() {
        let mut scene = SceneGraph::new();
        let body = scene.instantiate(&fragment(&["body", "hips"]));
        let hips = body.by_name["hips"];
        assert!(!scene.attach(body.root, hips));
        assert!(!scene.attach(body.root, body.root));
    }

    #[test]
    fn test_remove_frees_subtree_and_stales_ids() {
        let mut scene = SceneGraph::new();
        let body = scene.instantiate(&fragment(&["body", "hips"]));
        let hair = scene.instantiate(&fragment(&["hair"]));
        scene.attach(hair.root, body.root);
        scene.add(body.root);

        assert_eq!(scene.remove(body.root), 3);
        assert!(scene.is_empty());
        assert!(scene.roots().is_empty());
        assert!(!scene.set_local_transform(hair.root, Transform::IDENTITY));
    }

    #[test]
    fn test_world_matrix_composes_ancestors() {
        let mut scene = SceneGraph::new();
        let inst = scene.instantiate(&fragment(&["body", "hips"]));
        let hips = inst.by_name["hips"];
        let lift = |y: f32| Transform {
            translation: glam::Vec3::new(0.0, y, 0.0),
            ..Transform::IDENTITY
        };

        assert!(scene.set_local_transform(inst.root, lift(2.0)));
        assert!(scene.set_local_transform(hips, lift(0.5)));

        let world = scene.world_matrix(hips).unwrap();
        assert!(world.w_axis.truncate().abs_diff_eq(glam::Vec3::new(0.0, 2.5, 0.0), 1e-6));

        scene.remove(inst.root);
        assert!(scene.world_matrix(hips).is_none());
    }
}
