//! GPU command seam.
//!
//! The pipeline talks to the GPU only through [`RenderDevice`]. Programs are
//! resolved by kind and parameterized through named uniform slots; uniform
//! values persist until the next [`RenderDevice::use_program`].

use glam::{Mat4, Vec2, Vec3, Vec4};
use lumen_assets::{MeshHandle, TextureHandle};
use lumen_common::RenderTargetHandle;
use lumen_scene::MAX_LIGHTS;
use serde::{Deserialize, Serialize};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProgramId(pub u32);

/// Every shading program the pipeline asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProgramKind {
    Normals,
    Texture,
    Uvs,
    SinglePassLighting,
    MultiPassLighting,
    /// Position-only program writing depth from a light's view.
    ShadowDepth,
    /// Linearized depth visualization of a shadow map.
    DepthPreview,
}

impl ProgramKind {
    pub const ALL: [ProgramKind; 7] = [
        ProgramKind::Normals,
        ProgramKind::Texture,
        ProgramKind::Uvs,
        ProgramKind::SinglePassLighting,
        ProgramKind::MultiPassLighting,
        ProgramKind::ShadowDepth,
        ProgramKind::DepthPreview,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Disabled,
    /// `src = SRC_ALPHA, dst = ONE_MINUS_SRC_ALPHA`
    Alpha,
    /// `src = SRC_ALPHA, dst = ONE`
    Additive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthFunc {
    #[default]
    Less,
    LessEqual,
}

/// Buffers to clear on the bound target. Depth clears to 1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clear {
    pub color: Option<Vec3>,
    pub depth: bool,
}

impl Clear {
    pub fn color_and_depth(color: Vec3) -> Self {
        Self {
            color: Some(color),
            depth: true,
        }
    }

    pub fn depth_only() -> Self {
        Self {
            color: None,
            depth: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Mat4(Mat4),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Float(f32),
    Int(i32),
    Texture { texture: TextureHandle, unit: u32 },
    DepthTexture { target: RenderTargetHandle, unit: u32 },
    Vec3Array([Vec3; MAX_LIGHTS]),
    FloatArray([f32; MAX_LIGHTS]),
    IntArray([i32; MAX_LIGHTS]),
}

/// Named parameter slots shared by every shading program.
pub mod uniforms {
    pub const VIEW_PROJ: &str = "view_proj";
    pub const CAMERA_POSITION: &str = "camera_position";
    pub const MODEL: &str = "model";
    pub const TIME: &str = "time";
    pub const BASE_COLOR: &str = "base_color";
    pub const EMISSIVE_FACTOR: &str = "emissive_factor";
    pub const ALBEDO_TEXTURE: &str = "albedo_texture";
    pub const METALLIC_ROUGHNESS_TEXTURE: &str = "metallic_roughness_texture";
    pub const NORMAL_TEXTURE: &str = "normal_texture";
    pub const EMISSIVE_TEXTURE: &str = "emissive_texture";
    pub const HAS_NORMAL_MAP: &str = "has_normal_map";
    pub const AMBIENT_LIGHT: &str = "ambient_light";
    pub const ALPHA_CUTOFF: &str = "alpha_cutoff";

    // Scalars in multi-pass lighting, MAX_LIGHTS-sized arrays in single-pass.
    pub const LIGHT_COLOR: &str = "light_color";
    pub const LIGHT_INTENSITY: &str = "light_intensity";
    pub const LIGHT_MAX_DISTANCE: &str = "light_max_distance";
    pub const LIGHT_CONE_ANGLE: &str = "light_cone_angle";
    pub const LIGHT_EXPONENT: &str = "light_exponent";
    pub const LIGHT_TYPE: &str = "light_type";
    pub const LIGHT_POSITION: &str = "light_position";
    pub const LIGHT_DIRECTION: &str = "light_direction";
    pub const LIGHT_COUNT: &str = "light_count";

    pub const SHADOW_MAP: &str = "shadow_map";
    pub const SHADOW_VIEW_PROJ: &str = "shadow_view_proj";
    pub const SHADOW_BIAS: &str = "shadow_bias";
    pub const HAS_SHADOW_MAP: &str = "has_shadow_map";
    pub const CAMERA_NEAR_FAR: &str = "camera_near_far";

    /// Sampler unit of the shadow map; material textures use 0..=3.
    pub const SHADOW_UNIT: u32 = 4;
}

/// Everything the pipeline needs from a GPU backend.
pub trait RenderDevice {
    /// `None` when the backend has no program of this kind.
    fn resolve_program(&mut self, kind: ProgramKind) -> Option<ProgramId>;

    /// Size of the default framebuffer.
    fn surface_size(&self) -> (u32, u32);

    fn create_depth_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTargetHandle, RenderError>;

    fn destroy_depth_target(&mut self, target: RenderTargetHandle) -> Result<(), RenderError>;

    /// `None` binds the default framebuffer.
    fn bind_target(&mut self, target: Option<RenderTargetHandle>) -> Result<(), RenderError>;

    fn clear(&mut self, clear: Clear);

    fn set_color_writes(&mut self, enabled: bool);

    fn set_depth_test(&mut self, enabled: bool);

    fn set_depth_func(&mut self, func: DepthFunc);

    fn set_blend(&mut self, mode: BlendMode);

    /// Back-face culling.
    fn set_face_culling(&mut self, enabled: bool);

    /// `None` covers the whole bound target.
    fn set_viewport(&mut self, viewport: Option<Viewport>);

    fn use_program(&mut self, program: ProgramId);

    fn set_uniform(&mut self, name: &'static str, value: UniformValue);

    fn draw_mesh(&mut self, mesh: MeshHandle, vertex_count: u32);

    /// Draw a quad covering the current viewport.
    fn draw_fullscreen(&mut self);
}
