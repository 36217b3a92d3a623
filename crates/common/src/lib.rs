//! Shared types for the lumen renderer.
//!
//! # Invariants
//! - Math follows glam's column-vector convention: `world = parent * local`.
//! - Frustum tests are conservative: a box is only rejected when it is
//!   provably outside one of the six planes.

mod bounds;
mod camera;
mod frustum;
mod types;

pub use bounds::Aabb;
pub use camera::{Camera, Projection};
pub use frustum::Frustum;
pub use types::{EntityId, RenderTargetHandle, Transform};

pub fn crate_info() -> &'static str {
    "lumen-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
