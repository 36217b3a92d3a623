use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

use crate::TextureHandle;

/// Per-material transparency class.
///
/// The discriminants are the class ranks used for draw ordering: opaque
/// geometry first, cut-out next, blended last.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlphaMode {
    #[default]
    NoAlpha = 0,
    Mask = 1,
    Blend = 2,
}

impl AlphaMode {
    pub fn rank(self) -> u8 {
        self as u8
    }
}

/// Texture slots a material can fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureSlot {
    Albedo,
    MetallicRoughness,
    Normal,
    Emissive,
}

impl TextureSlot {
    pub const ALL: [TextureSlot; 4] = [
        TextureSlot::Albedo,
        TextureSlot::MetallicRoughness,
        TextureSlot::Normal,
        TextureSlot::Emissive,
    ];

    /// Sampler unit the slot is bound to.
    pub fn unit(self) -> u32 {
        match self {
            TextureSlot::Albedo => 0,
            TextureSlot::MetallicRoughness => 1,
            TextureSlot::Normal => 2,
            TextureSlot::Emissive => 3,
        }
    }
}

/// Surface description consumed by the shading programs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub base_color: Vec4,
    pub alpha_mode: AlphaMode,
    /// Fragments with alpha below this are discarded when `alpha_mode` is `Mask`.
    pub alpha_cutoff: f32,
    pub two_sided: bool,
    pub emissive_factor: Vec3,
    pub albedo_texture: Option<TextureHandle>,
    pub metallic_roughness_texture: Option<TextureHandle>,
    pub normal_texture: Option<TextureHandle>,
    pub emissive_texture: Option<TextureHandle>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: Vec4::new(0.8, 0.8, 0.8, 1.0),
            alpha_mode: AlphaMode::NoAlpha,
            alpha_cutoff: 0.5,
            two_sided: false,
            emissive_factor: Vec3::ZERO,
            albedo_texture: None,
            metallic_roughness_texture: None,
            normal_texture: None,
            emissive_texture: None,
        }
    }
}

impl Material {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_alpha(mut self, alpha_mode: AlphaMode) -> Self {
        self.alpha_mode = alpha_mode;
        self
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<TextureHandle> {
        match slot {
            TextureSlot::Albedo => self.albedo_texture,
            TextureSlot::MetallicRoughness => self.metallic_roughness_texture,
            TextureSlot::Normal => self.normal_texture,
            TextureSlot::Emissive => self.emissive_texture,
        }
    }

    /// Cutoff forwarded to the shading program: the material's threshold for
    /// `Mask`, zero (no discard) otherwise.
    pub fn effective_alpha_cutoff(&self) -> f32 {
        match self.alpha_mode {
            AlphaMode::Mask => self.alpha_cutoff,
            AlphaMode::NoAlpha | AlphaMode::Blend => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alpha_rank_orders_blend_last() {
        assert!(AlphaMode::NoAlpha.rank() < AlphaMode::Mask.rank());
        assert!(AlphaMode::Mask.rank() < AlphaMode::Blend.rank());
        assert!(AlphaMode::NoAlpha < AlphaMode::Blend);
    }

    #[test]
    fn cutoff_only_applies_to_mask() {
        let mut m = Material::named("leaves");
        m.alpha_cutoff = 0.3;
        assert_eq!(m.effective_alpha_cutoff(), 0.0);
        m.alpha_mode = AlphaMode::Mask;
        assert_eq!(m.effective_alpha_cutoff(), 0.3);
        m.alpha_mode = AlphaMode::Blend;
        assert_eq!(m.effective_alpha_cutoff(), 0.0);
    }

    #[test]
    fn texture_slot_lookup() {
        let mut m = Material::default();
        m.normal_texture = Some(TextureHandle(7));
        assert_eq!(m.texture(TextureSlot::Normal), Some(TextureHandle(7)));
        assert_eq!(m.texture(TextureSlot::Albedo), None);
        let units: Vec<u32> = TextureSlot::ALL.iter().map(|s| s.unit()).collect();
        assert_eq!(units, vec![0, 1, 2, 3]);
    }

    #[test]
    fn alpha_mode_serde_names() {
        assert_eq!(
            serde_json::to_string(&AlphaMode::Blend).unwrap(),
            "\"blend\""
        );
    }
}
