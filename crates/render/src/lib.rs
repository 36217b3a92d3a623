//! Forward render-command pipeline.
//!
//! Per frame: clear, walk and cull the scene, collect render calls, order
//! them, render shadow maps, then issue the lit forward draws.
//!
//! # Invariants
//! - The render queue is emptied at the start of every frame.
//! - Opaque and masked records draw before blended ones; blended records
//!   draw farthest first.
//! - Per-record and per-light failures skip that record or light; the frame
//!   always completes.
//! - All GPU work goes through [`RenderDevice`].

mod config;
mod device;
mod error;
mod forward;
mod queue;
mod recorder;
mod renderer;
mod shadow;
mod walker;

pub use config::{RenderMode, RendererConfig};
pub use device::{
    BlendMode, Clear, DepthFunc, ProgramId, ProgramKind, RenderDevice, UniformValue, Viewport,
    uniforms,
};
pub use error::RenderError;
pub use forward::native_blend;
pub use queue::{RenderCall, RenderQueue, draw_order};
pub use recorder::{DrawRecord, GpuCommand, RecordingDevice};
pub use renderer::{FrameStats, Renderer};
pub use shadow::shadow_camera;
pub use walker::{TraversalStats, traverse, traverse_scene};

pub fn crate_info() -> &'static str {
    "lumen-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }
}
