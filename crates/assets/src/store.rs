use lumen_common::Aabb;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::{AssetProvider, Material, MaterialHandle, MeshHandle, TextureHandle};

/// Renderer-facing mesh description. Vertex data lives on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub name: String,
    pub vertex_count: u32,
    /// Local-space bounds.
    pub bounds: Aabb,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Texture {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Content-addressed asset registry.
///
/// Handles are derived from a SHA-256 digest of the asset description, so
/// registering identical content twice deduplicates to one entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStore {
    meshes: BTreeMap<MeshHandle, Mesh>,
    materials: BTreeMap<MaterialHandle, Material>,
    textures: BTreeMap<TextureHandle, Texture>,
    white: TextureHandle,
}

impl Default for AssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore {
    pub fn new() -> Self {
        let mut store = Self {
            meshes: BTreeMap::new(),
            materials: BTreeMap::new(),
            textures: BTreeMap::new(),
            white: TextureHandle(0),
        };
        store.white = store.register_texture(Texture {
            name: "white_1x1".into(),
            width: 1,
            height: 1,
        });
        store
    }

    /// Register a mesh and return its handle.
    pub fn register_mesh(&mut self, mesh: Mesh) -> MeshHandle {
        let mut hasher = Sha256::new();
        hasher.update(b"mesh");
        hasher.update(mesh.name.as_bytes());
        hasher.update(mesh.vertex_count.to_le_bytes());
        for v in [mesh.bounds.center, mesh.bounds.half_size] {
            for c in v.to_array() {
                hasher.update(c.to_le_bytes());
            }
        }
        let handle = MeshHandle(digest_to_id(hasher));
        tracing::trace!(name = %mesh.name, ?handle, "registered mesh");
        self.meshes.insert(handle, mesh);
        handle
    }

    /// Register a material and return its handle.
    pub fn register_material(&mut self, material: Material) -> MaterialHandle {
        let mut hasher = Sha256::new();
        hasher.update(b"material");
        hasher.update(material.name.as_bytes());
        for c in material.base_color.to_array() {
            hasher.update(c.to_le_bytes());
        }
        hasher.update([material.alpha_mode.rank(), material.two_sided as u8]);
        hasher.update(material.alpha_cutoff.to_le_bytes());
        for c in material.emissive_factor.to_array() {
            hasher.update(c.to_le_bytes());
        }
        for slot in [
            material.albedo_texture,
            material.metallic_roughness_texture,
            material.normal_texture,
            material.emissive_texture,
        ] {
            hasher.update(slot.map_or(u64::MAX, |t| t.0).to_le_bytes());
        }
        let handle = MaterialHandle(digest_to_id(hasher));
        tracing::trace!(name = %material.name, ?handle, "registered material");
        self.materials.insert(handle, material);
        handle
    }

    /// Register a texture description and return its handle.
    pub fn register_texture(&mut self, texture: Texture) -> TextureHandle {
        let mut hasher = Sha256::new();
        hasher.update(b"texture");
        hasher.update(texture.name.as_bytes());
        hasher.update(texture.width.to_le_bytes());
        hasher.update(texture.height.to_le_bytes());
        let handle = TextureHandle(digest_to_id(hasher));
        self.textures.insert(handle, texture);
        handle
    }

    /// Register a unit cube mesh (24 vertices, bounds [-0.5, 0.5]^3).
    pub fn register_unit_cube(&mut self) -> MeshHandle {
        self.register_mesh(Mesh {
            name: "unit_cube".into(),
            vertex_count: 24,
            bounds: Aabb::new(glam::Vec3::ZERO, glam::Vec3::splat(0.5)),
        })
    }

    /// Register a unit quad in the XY plane.
    pub fn register_unit_quad(&mut self) -> MeshHandle {
        self.register_mesh(Mesh {
            name: "unit_quad".into(),
            vertex_count: 4,
            bounds: Aabb::new(glam::Vec3::ZERO, glam::Vec3::new(0.5, 0.5, 0.0)),
        })
    }

    pub fn meshes(&self) -> impl Iterator<Item = (&MeshHandle, &Mesh)> {
        self.meshes.iter()
    }

    /// Number of registered assets, the white texture included.
    pub fn len(&self) -> usize {
        self.meshes.len() + self.materials.len() + self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetProvider for AssetStore {
    fn mesh(&self, handle: MeshHandle) -> Option<&Mesh> {
        self.meshes.get(&handle)
    }

    fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle)
    }

    fn texture(&self, handle: TextureHandle) -> Option<&Texture> {
        self.textures.get(&handle)
    }

    fn white_texture(&self) -> TextureHandle {
        self.white
    }
}

fn digest_to_id(hasher: Sha256) -> u64 {
    let result = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&result[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AlphaMode;

    #[test]
    fn new_store_has_white_texture() {
        let store = AssetStore::new();
        let white = store.texture(store.white_texture()).unwrap();
        assert_eq!((white.width, white.height), (1, 1));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn register_mesh() {
        let mut store = AssetStore::new();
        let id = store.register_unit_cube();
        let mesh = store.mesh(id).unwrap();
        assert_eq!(mesh.vertex_count, 24);
        assert_eq!(mesh.bounds.half_size, glam::Vec3::splat(0.5));
    }

    #[test]
    fn content_addressed_dedup() {
        let mut store = AssetStore::new();
        let a = store.register_unit_cube();
        let b = store.register_unit_cube();
        assert_eq!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn materials_differing_in_alpha_get_distinct_handles() {
        let mut store = AssetStore::new();
        let opaque = store.register_material(Material::named("glass"));
        let blended = store.register_material(Material::named("glass").with_alpha(AlphaMode::Blend));
        assert_ne!(opaque, blended);
        assert_eq!(store.material(blended).unwrap().alpha_mode, AlphaMode::Blend);
    }

    #[test]
    fn unknown_handles_resolve_to_none() {
        let store = AssetStore::new();
        assert!(store.mesh(MeshHandle(42)).is_none());
        assert!(store.material(MaterialHandle(42)).is_none());
    }
}
