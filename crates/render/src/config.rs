use serde::{Deserialize, Serialize};

use crate::device::ProgramKind;
use crate::error::RenderError;

/// Shading mode of the forward pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    Normals,
    Texture,
    Uvs,
    SinglePassLighting,
    #[default]
    MultiPassLighting,
}

impl RenderMode {
    pub const ALL: [RenderMode; 5] = [
        RenderMode::Normals,
        RenderMode::Texture,
        RenderMode::Uvs,
        RenderMode::SinglePassLighting,
        RenderMode::MultiPassLighting,
    ];

    pub fn program(self) -> ProgramKind {
        match self {
            RenderMode::Normals => ProgramKind::Normals,
            RenderMode::Texture => ProgramKind::Texture,
            RenderMode::Uvs => ProgramKind::Uvs,
            RenderMode::SinglePassLighting => ProgramKind::SinglePassLighting,
            RenderMode::MultiPassLighting => ProgramKind::MultiPassLighting,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RenderMode::Normals => "normals",
            RenderMode::Texture => "texture",
            RenderMode::Uvs => "uvs",
            RenderMode::SinglePassLighting => "single_pass_lighting",
            RenderMode::MultiPassLighting => "multi_pass_lighting",
        }
    }
}

/// Renderer settings. Missing fields take their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    pub render_mode: RenderMode,
    pub shadows_enabled: bool,
    /// Edge length of every shadow depth target, in texels.
    pub shadow_map_size: u32,
    pub shadow_near: f32,
    /// Full width and height of a directional light's orthographic volume.
    pub directional_shadow_extent: f32,
    pub directional_shadow_far: f32,
    /// Draw every allocated shadow map as a tile over the frame.
    pub show_shadow_maps: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            render_mode: RenderMode::MultiPassLighting,
            shadows_enabled: true,
            shadow_map_size: 1024,
            shadow_near: 1.0,
            directional_shadow_extent: 1000.0,
            directional_shadow_far: 10000.0,
            show_shadow_maps: false,
        }
    }
}

impl RendererConfig {
    pub fn from_json(json: &str) -> Result<Self, RenderError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, RenderError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
