//! CPU-side staging of named uniforms into the packed per-draw block.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use lumen_assets::TextureHandle;
use lumen_common::RenderTargetHandle;
use lumen_render::{UniformValue, uniforms};
use lumen_scene::MAX_LIGHTS;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    /// rgb: color, a: intensity
    pub color_intensity: [f32; 4],
    /// xyz: position, w: max distance
    pub position_range: [f32; 4],
    /// xyz: direction, w: cone angle in degrees
    pub direction_cone: [f32; 4],
    /// x: spot exponent, y: light type
    pub params: [f32; 4],
}

/// Uniform block shared by every WGSL program (`DrawUniforms` in the prelude).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub shadow_view_proj: [[f32; 4]; 4],
    pub base_color: [f32; 4],
    /// xyz: camera position, w: time
    pub camera_time: [f32; 4],
    /// xyz: emissive factor, w: alpha cutoff
    pub emissive_cutoff: [f32; 4],
    /// xyz: ambient light, w: shadow bias
    pub ambient_bias: [f32; 4],
    /// x: light count, y: has normal map, z: has shadow map
    pub flags: [f32; 4],
    /// x: near, y: far
    pub near_far: [f32; 4],
    pub lights: [GpuLight; MAX_LIGHTS],
}

impl Default for DrawUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            shadow_view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            base_color: Vec4::ONE.to_array(),
            ..Self::zeroed()
        }
    }
}

/// Textures a draw samples. `None` slots bind the fallback textures.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureBindings {
    pub material: [Option<TextureHandle>; 4],
    pub shadow: Option<RenderTargetHandle>,
}

/// Uniform values accumulated since the last program change.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct UniformStage {
    pub uniforms: DrawUniforms,
    pub textures: TextureBindings,
}

fn set_xyz(slot: &mut [f32; 4], v: Vec3) {
    slot[..3].copy_from_slice(&v.to_array());
}

impl UniformStage {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Stage one named value. Returns `false` when no program reads it.
    pub fn apply(&mut self, name: &str, value: &UniformValue) -> bool {
        let u = &mut self.uniforms;
        match (name, value) {
            (uniforms::VIEW_PROJ, UniformValue::Mat4(m)) => u.view_proj = m.to_cols_array_2d(),
            (uniforms::MODEL, UniformValue::Mat4(m)) => u.model = m.to_cols_array_2d(),
            (uniforms::SHADOW_VIEW_PROJ, UniformValue::Mat4(m)) => {
                u.shadow_view_proj = m.to_cols_array_2d()
            }
            (uniforms::BASE_COLOR, UniformValue::Vec4(c)) => u.base_color = c.to_array(),
            (uniforms::CAMERA_POSITION, UniformValue::Vec3(p)) => set_xyz(&mut u.camera_time, *p),
            (uniforms::TIME, UniformValue::Float(t)) => u.camera_time[3] = *t,
            (uniforms::EMISSIVE_FACTOR, UniformValue::Vec3(e)) => {
                set_xyz(&mut u.emissive_cutoff, *e)
            }
            (uniforms::ALPHA_CUTOFF, UniformValue::Float(c)) => u.emissive_cutoff[3] = *c,
            (uniforms::AMBIENT_LIGHT, UniformValue::Vec3(a)) => set_xyz(&mut u.ambient_bias, *a),
            (uniforms::SHADOW_BIAS, UniformValue::Float(b)) => u.ambient_bias[3] = *b,
            (uniforms::LIGHT_COUNT, UniformValue::Int(n)) => {
                u.flags[0] = (*n).clamp(0, MAX_LIGHTS as i32) as f32
            }
            (uniforms::HAS_NORMAL_MAP, UniformValue::Int(f)) => u.flags[1] = *f as f32,
            (uniforms::HAS_SHADOW_MAP, UniformValue::Int(f)) => u.flags[2] = *f as f32,
            (uniforms::CAMERA_NEAR_FAR, UniformValue::Vec2(nf)) => {
                u.near_far[0] = nf.x;
                u.near_far[1] = nf.y;
            }
            (uniforms::SHADOW_MAP, UniformValue::DepthTexture { target, .. }) => {
                self.textures.shadow = Some(*target)
            }
            (_, UniformValue::Texture { texture, unit }) if (*unit as usize) < 4 => {
                self.textures.material[*unit as usize] = Some(*texture)
            }
            _ => return self.apply_light(name, value),
        }
        true
    }

    fn apply_light(&mut self, name: &str, value: &UniformValue) -> bool {
        let lights = &mut self.uniforms.lights;
        let sets_single_light = match (name, value) {
            (uniforms::LIGHT_COLOR, UniformValue::Vec3(c)) => {
                set_xyz(&mut lights[0].color_intensity, *c);
                true
            }
            (uniforms::LIGHT_INTENSITY, UniformValue::Float(v)) => {
                lights[0].color_intensity[3] = *v;
                true
            }
            (uniforms::LIGHT_POSITION, UniformValue::Vec3(p)) => {
                set_xyz(&mut lights[0].position_range, *p);
                true
            }
            (uniforms::LIGHT_MAX_DISTANCE, UniformValue::Float(v)) => {
                lights[0].position_range[3] = *v;
                true
            }
            (uniforms::LIGHT_DIRECTION, UniformValue::Vec3(d)) => {
                set_xyz(&mut lights[0].direction_cone, *d);
                true
            }
            (uniforms::LIGHT_CONE_ANGLE, UniformValue::Float(v)) => {
                lights[0].direction_cone[3] = *v;
                true
            }
            (uniforms::LIGHT_EXPONENT, UniformValue::Float(v)) => {
                lights[0].params[0] = *v;
                true
            }
            (uniforms::LIGHT_TYPE, UniformValue::Int(k)) => {
                lights[0].params[1] = *k as f32;
                true
            }
            // Array forms leave the count to LIGHT_COUNT.
            (uniforms::LIGHT_COLOR, UniformValue::Vec3Array(a)) => {
                for (light, c) in lights.iter_mut().zip(a) {
                    set_xyz(&mut light.color_intensity, *c);
                }
                false
            }
            (uniforms::LIGHT_POSITION, UniformValue::Vec3Array(a)) => {
                for (light, p) in lights.iter_mut().zip(a) {
                    set_xyz(&mut light.position_range, *p);
                }
                false
            }
            (uniforms::LIGHT_DIRECTION, UniformValue::Vec3Array(a)) => {
                for (light, d) in lights.iter_mut().zip(a) {
                    set_xyz(&mut light.direction_cone, *d);
                }
                false
            }
            (uniforms::LIGHT_INTENSITY, UniformValue::FloatArray(a)) => {
                for (light, v) in lights.iter_mut().zip(a) {
                    light.color_intensity[3] = *v;
                }
                false
            }
            (uniforms::LIGHT_MAX_DISTANCE, UniformValue::FloatArray(a)) => {
                for (light, v) in lights.iter_mut().zip(a) {
                    light.position_range[3] = *v;
                }
                false
            }
            (uniforms::LIGHT_CONE_ANGLE, UniformValue::FloatArray(a)) => {
                for (light, v) in lights.iter_mut().zip(a) {
                    light.direction_cone[3] = *v;
                }
                false
            }
            (uniforms::LIGHT_EXPONENT, UniformValue::FloatArray(a)) => {
                for (light, v) in lights.iter_mut().zip(a) {
                    light.params[0] = *v;
                }
                false
            }
            (uniforms::LIGHT_TYPE, UniformValue::IntArray(a)) => {
                for (light, k) in lights.iter_mut().zip(a) {
                    light.params[1] = *k as f32;
                }
                false
            }
            _ => return false,
        };
        // A scalar light parameter means one light per pass.
        if sets_single_light {
            self.uniforms.flags[0] = 1.0;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn block_is_sixteen_byte_aligned() {
        let size = std::mem::size_of::<DrawUniforms>();
        assert_eq!(size % 16, 0);
        assert_eq!(size, 3 * 64 + 6 * 16 + MAX_LIGHTS * 64);
    }

    #[test]
    fn defaults_are_identity_and_white() {
        let u = DrawUniforms::default();
        assert_eq!(u.model, Mat4::IDENTITY.to_cols_array_2d());
        assert_eq!(u.base_color, [1.0; 4]);
        assert_eq!(u.flags, [0.0; 4]);
    }

    #[test]
    fn surface_values_land_in_packed_slots() {
        let mut stage = UniformStage::default();
        assert!(stage.apply(uniforms::CAMERA_POSITION, &UniformValue::Vec3(Vec3::new(1.0, 2.0, 3.0))));
        assert!(stage.apply(uniforms::TIME, &UniformValue::Float(4.0)));
        assert!(stage.apply(uniforms::ALPHA_CUTOFF, &UniformValue::Float(0.5)));
        assert!(stage.apply(uniforms::CAMERA_NEAR_FAR, &UniformValue::Vec2(Vec2::new(1.0, 100.0))));
        assert_eq!(stage.uniforms.camera_time, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stage.uniforms.emissive_cutoff[3], 0.5);
        assert_eq!(stage.uniforms.near_far[..2], [1.0, 100.0]);
    }

    #[test]
    fn scalar_light_sets_count_to_one() {
        let mut stage = UniformStage::default();
        assert!(stage.apply(uniforms::LIGHT_POSITION, &UniformValue::Vec3(Vec3::X)));
        assert!(stage.apply(uniforms::LIGHT_TYPE, &UniformValue::Int(2)));
        assert_eq!(stage.uniforms.flags[0], 1.0);
        assert_eq!(stage.uniforms.lights[0].position_range[..3], [1.0, 0.0, 0.0]);
        assert_eq!(stage.uniforms.lights[0].params[1], 2.0);
    }

    #[test]
    fn light_arrays_fill_every_slot() {
        let mut stage = UniformStage::default();
        let mut intensities = [0.0; MAX_LIGHTS];
        intensities[4] = 9.0;
        assert!(stage.apply(uniforms::LIGHT_INTENSITY, &UniformValue::FloatArray(intensities)));
        assert_eq!(stage.uniforms.flags[0], 0.0);
        assert!(stage.apply(uniforms::LIGHT_COUNT, &UniformValue::Int(5)));
        assert_eq!(stage.uniforms.lights[4].color_intensity[3], 9.0);
        assert_eq!(stage.uniforms.flags[0], 5.0);
    }

    #[test]
    fn textures_are_tracked_by_unit_and_name() {
        let mut stage = UniformStage::default();
        assert!(stage.apply(
            uniforms::NORMAL_TEXTURE,
            &UniformValue::Texture {
                texture: TextureHandle(7),
                unit: 2
            }
        ));
        assert!(stage.apply(
            uniforms::SHADOW_MAP,
            &UniformValue::DepthTexture {
                target: RenderTargetHandle(3),
                unit: uniforms::SHADOW_UNIT
            }
        ));
        assert_eq!(stage.textures.material[2], Some(TextureHandle(7)));
        assert_eq!(stage.textures.shadow, Some(RenderTargetHandle(3)));
        stage.reset();
        assert_eq!(stage.textures, TextureBindings::default());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let mut stage = UniformStage::default();
        assert!(!stage.apply("fog_density", &UniformValue::Float(1.0)));
        assert!(!stage.apply(uniforms::MODEL, &UniformValue::Float(1.0)));
        assert_eq!(stage, UniformStage::default());
    }
}
