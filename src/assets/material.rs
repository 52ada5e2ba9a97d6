use serde::{Deserialize, Serialize};

/// Shading parameters carried by a loaded mesh primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub specular: f32,
    pub shininess: f32,
}

impl Material {
    /// Maps a glTF metallic-roughness material onto specular/shininess terms.
    pub fn from_gltf(material: &gltf::Material<'_>, fallback_name: &str) -> Self {
        let pbr = material.pbr_metallic_roughness();
        let roughness = pbr.roughness_factor().clamp(0.0, 1.0);
        Self {
            name: material.name().unwrap_or(fallback_name).to_string(),
            base_color: pbr.base_color_factor(),
            specular: pbr.metallic_factor().clamp(0.0, 1.0),
            shininess: (1.0 - roughness) * 100.0,
        }
    }
}

/// Load-time material override applied to every mesh.
///
/// Avatars are lit uniformly regardless of what the source asset authored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialRules {
    pub flat_shininess: f32,
    pub flat_specular: f32,
}

impl Default for MaterialRules {
    fn default() -> Self {
        Self {
            flat_shininess: 0.0,
            flat_specular: 0.0,
        }
    }
}

impl MaterialRules {
    pub fn apply(&self, material: &mut Material) {
        material.shininess = self.flat_shininess;
        material.specular = self.flat_specular;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_flatten_shading() {
        let mut material = Material {
            name: "skin".into(),
            base_color: [1.0, 0.8, 0.7, 1.0],
            specular: 0.9,
            shininess: 80.0,
        };
        let rules = MaterialRules {
            flat_shininess: 4.0,
            flat_specular: 0.1,
        };
        rules.apply(&mut material);

        assert_eq!(material.shininess, 4.0);
        assert_eq!(material.specular, 0.1);
        assert_eq!(material.base_color, [1.0, 0.8, 0.7, 1.0]);
    }
}
