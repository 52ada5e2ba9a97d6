use super::material::Material;

/// CPU-side summary of a loaded mesh; geometry upload belongs to the scene host.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshInfo {
    pub name: String,
    pub primitive_count: usize,
    pub vertex_count: usize,
    pub skinned: bool,
    pub materials: Vec<Material>,
}

impl MeshInfo {
    pub fn from_gltf(mesh: &gltf::Mesh<'_>, skinned: bool) -> Self {
        let name = mesh
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("mesh_{}", mesh.index()));

        let mut vertex_count = 0;
        let mut materials = Vec::new();
        for primitive in mesh.primitives() {
            vertex_count += primitive
                .get(&gltf::Semantic::Positions)
                .map(|accessor| accessor.count())
                .unwrap_or(0);
            let fallback = format!("{}_material_{}", name, primitive.index());
            materials.push(Material::from_gltf(&primitive.material(), &fallback));
        }

        Self {
            name,
            primitive_count: mesh.primitives().len(),
            vertex_count,
            skinned,
            materials,
        }
    }
}
