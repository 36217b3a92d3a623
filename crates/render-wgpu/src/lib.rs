//! wgpu backend for the lumen render pipeline.
//!
//! [`WgpuDevice`] implements [`lumen_render::RenderDevice`] by recording
//! draws with their raster state and packed uniforms, then encoding them
//! into render passes on [`WgpuDevice::submit`].
//!
//! # Invariants
//! - One pipeline per distinct raster state, created on first use.
//! - Uniform values reset on every program change.
//! - Unknown textures sample a 1x1 white texture; an unbound shadow map
//!   samples a 1x1 depth texture.

mod gpu;
mod pipeline;
mod primitives;
mod shaders;
mod staging;

pub use gpu::{HeadlessTarget, WgpuDevice, WgpuError};
pub use pipeline::PipelineKey;
pub use primitives::{Vertex, cube_mesh, quad_mesh};
pub use shaders::program_source;
pub use staging::{DrawUniforms, GpuLight, TextureBindings, UniformStage};

pub fn crate_info() -> &'static str {
    "lumen-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }
}
