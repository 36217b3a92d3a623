//! Scene graph consumed by the renderer.
//!
//! # Invariants
//! - Each [`Node`] caches its hierarchy-global matrix; [`Prefab`] keeps the
//!   cache in sync with local matrices.
//! - Entities are a closed set of kinds ([`EntityKind`]); no downcasts.
//! - A scene never holds more than [`MAX_LIGHTS`] lights. Excess lights are
//!   rejected with a diagnostic instead of aborting.

mod entity;
mod light;
mod node;
mod scene;

pub use entity::{Entity, EntityKind, Instance};
pub use light::{LightEntity, LightKind, LightMut, LightRef, ShadowMap};
pub use node::{Node, Prefab};
pub use scene::{MAX_LIGHTS, Scene, SceneError};

pub fn crate_info() -> &'static str {
    "lumen-scene v0.1.0"
}
