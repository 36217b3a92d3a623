//! Asset surface consumed by the renderer.
//!
//! Assets are identified by content-addressed handles. The renderer resolves
//! handles through [`AssetProvider`], never by raw file paths, and never owns
//! the assets it draws.
//!
//! # Invariants
//! - Registering identical content twice yields the same handle.
//! - A 1x1 opaque white texture is always registered and resolvable.

mod material;
mod store;

pub use material::{AlphaMode, Material, TextureSlot};
pub use store::{AssetStore, Mesh, Texture};

use serde::{Deserialize, Serialize};

/// A handle referencing a mesh asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MeshHandle(pub u64);

/// A handle referencing a material asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// A handle referencing a texture asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TextureHandle(pub u64);

/// Read-only asset lookups used by the render pipeline.
pub trait AssetProvider {
    fn mesh(&self, handle: MeshHandle) -> Option<&Mesh>;

    fn material(&self, handle: MaterialHandle) -> Option<&Material>;

    fn texture(&self, handle: TextureHandle) -> Option<&Texture>;

    /// Shared 1x1 opaque white texture used for unbound material slots.
    fn white_texture(&self) -> TextureHandle;
}

pub fn crate_info() -> &'static str {
    "lumen-assets v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("assets"));
    }
}
