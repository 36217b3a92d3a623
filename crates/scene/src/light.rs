use glam::{Mat4, Vec3};
use lumen_common::{Camera, EntityId, RenderTargetHandle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightKind {
    Point,
    #[default]
    Spot,
    Directional,
}

impl LightKind {
    /// Shader-side discriminant.
    pub fn index(self) -> i32 {
        match self {
            LightKind::Point => 0,
            LightKind::Spot => 1,
            LightKind::Directional => 2,
        }
    }
}

/// Depth target plus the camera it was rendered from.
#[derive(Debug, Clone, PartialEq)]
pub struct ShadowMap {
    pub target: RenderTargetHandle,
    pub size: u32,
    pub camera: Camera,
}

/// Lighting parameters of a light entity. Position and direction come from
/// the owning entity's transform.
#[derive(Debug, Clone, PartialEq)]
pub struct LightEntity {
    pub kind: LightKind,
    pub color: Vec3,
    pub intensity: f32,
    pub max_distance: f32,
    /// Angle between the light axis and the cone edge, in degrees.
    pub cone_angle: f32,
    pub spot_exponent: f32,
    pub area_size: f32,
    pub shadow_bias: f32,
    pub cast_shadows: bool,
    shadow: Option<ShadowMap>,
}

impl Default for LightEntity {
    fn default() -> Self {
        Self {
            kind: LightKind::Spot,
            color: Vec3::ONE,
            intensity: 1.0,
            max_distance: 1500.0,
            cone_angle: 40.0,
            spot_exponent: 10.0,
            area_size: 50.0,
            shadow_bias: 0.01,
            cast_shadows: true,
            shadow: None,
        }
    }
}

impl LightEntity {
    pub fn new(kind: LightKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn point() -> Self {
        Self::new(LightKind::Point)
    }

    pub fn spot(cone_angle: f32) -> Self {
        Self {
            cone_angle,
            ..Self::new(LightKind::Spot)
        }
    }

    pub fn directional() -> Self {
        Self::new(LightKind::Directional)
    }

    pub fn with_color(mut self, color: Vec3, intensity: f32) -> Self {
        self.color = color;
        self.intensity = intensity;
        self
    }

    pub fn without_shadows(mut self) -> Self {
        self.cast_shadows = false;
        self
    }

    /// Only spot and directional lights render shadow maps.
    pub fn wants_shadow_map(&self) -> bool {
        self.cast_shadows && self.kind != LightKind::Point
    }

    pub fn shadow_map(&self) -> Option<&ShadowMap> {
        self.shadow.as_ref()
    }

    pub fn shadow_map_mut(&mut self) -> Option<&mut ShadowMap> {
        self.shadow.as_mut()
    }

    pub fn attach_shadow_map(&mut self, shadow: ShadowMap) -> Option<ShadowMap> {
        self.shadow.replace(shadow)
    }

    pub fn take_shadow_map(&mut self) -> Option<ShadowMap> {
        self.shadow.take()
    }
}

pub(crate) fn position_of(model: &Mat4) -> Vec3 {
    model.w_axis.truncate()
}

/// Lights shine along the -Z axis of their world transform.
pub(crate) fn forward_of(model: &Mat4) -> Vec3 {
    (-model.z_axis.truncate())
        .try_normalize()
        .unwrap_or(Vec3::NEG_Z)
}

/// Read-only view of a light together with its entity transform.
#[derive(Debug, Clone, Copy)]
pub struct LightRef<'a> {
    pub id: EntityId,
    pub model: &'a Mat4,
    pub light: &'a LightEntity,
}

impl LightRef<'_> {
    pub fn position(&self) -> Vec3 {
        position_of(self.model)
    }

    pub fn direction(&self) -> Vec3 {
        forward_of(self.model)
    }
}

/// Mutable view of a light; the transform stays read-only.
#[derive(Debug)]
pub struct LightMut<'a> {
    pub id: EntityId,
    pub model: &'a Mat4,
    pub light: &'a mut LightEntity,
}

impl LightMut<'_> {
    pub fn position(&self) -> Vec3 {
        position_of(self.model)
    }

    pub fn direction(&self) -> Vec3 {
        forward_of(self.model)
    }
}
