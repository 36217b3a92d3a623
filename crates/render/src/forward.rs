//! Forward Shading Driver.
//!
//! # Invariants
//! - Multi-pass lighting: the first light pass uses the material's own blend
//!   state and `Less`; later passes blend additively with `LessEqual` and
//!   zero ambient and emissive. Depth and blend are restored after the loop.
//! - Single-pass lighting uploads `MAX_LIGHTS`-sized arrays once per record.
//! - Blending is disabled after every record.

use glam::Vec3;
use lumen_assets::{AlphaMode, AssetProvider, Material, TextureSlot};
use lumen_common::Camera;
use lumen_scene::{LightRef, MAX_LIGHTS};

use crate::config::{RenderMode, RendererConfig};
use crate::device::{BlendMode, DepthFunc, ProgramId, RenderDevice, UniformValue, uniforms};
use crate::queue::{RenderCall, RenderQueue};
use crate::renderer::FrameStats;

/// Frame-wide inputs of the forward pass.
pub(crate) struct FrameInputs<'a> {
    pub camera: &'a Camera,
    pub ambient_light: Vec3,
    pub lights: &'a [LightRef<'a>],
    pub time: f32,
    pub config: &'a RendererConfig,
}

/// Blend state a material is drawn with on its own.
pub fn native_blend(alpha_mode: AlphaMode) -> BlendMode {
    match alpha_mode {
        AlphaMode::Blend => BlendMode::Alpha,
        AlphaMode::NoAlpha | AlphaMode::Mask => BlendMode::Disabled,
    }
}

fn texture_uniform(slot: TextureSlot) -> &'static str {
    match slot {
        TextureSlot::Albedo => uniforms::ALBEDO_TEXTURE,
        TextureSlot::MetallicRoughness => uniforms::METALLIC_ROUGHNESS_TEXTURE,
        TextureSlot::Normal => uniforms::NORMAL_TEXTURE,
        TextureSlot::Emissive => uniforms::EMISSIVE_TEXTURE,
    }
}

pub(crate) fn draw_queue<A, D>(
    queue: &RenderQueue,
    frame: &FrameInputs<'_>,
    assets: &A,
    device: &mut D,
    stats: &mut FrameStats,
) where
    A: AssetProvider + ?Sized,
    D: RenderDevice + ?Sized,
{
    let _span = tracing::debug_span!("forward_pass", records = queue.len()).entered();
    let mode = frame.config.render_mode;
    let Some(program) = device.resolve_program(mode.program()) else {
        tracing::debug!(mode = mode.as_str(), "no program for render mode, records skipped");
        stats.skipped += queue.len();
        return;
    };

    for call in queue.calls() {
        if !draw_call(call, program, frame, assets, device, stats) {
            stats.skipped += 1;
        }
    }
}

/// Draw one record. Returns `false` when it was skipped.
fn draw_call<A, D>(
    call: &RenderCall,
    program: ProgramId,
    frame: &FrameInputs<'_>,
    assets: &A,
    device: &mut D,
    stats: &mut FrameStats,
) -> bool
where
    A: AssetProvider + ?Sized,
    D: RenderDevice + ?Sized,
{
    let Some(mesh) = assets.mesh(call.mesh).filter(|m| m.vertex_count > 0) else {
        tracing::trace!(mesh = call.mesh.0, "empty or missing mesh, record skipped");
        return false;
    };
    let Some(material) = assets.material(call.material) else {
        tracing::trace!(material = call.material.0, "missing material, record skipped");
        return false;
    };
    let vertex_count = mesh.vertex_count;

    device.set_depth_test(true);
    device.set_depth_func(DepthFunc::Less);
    device.set_face_culling(!material.two_sided);
    device.use_program(program);
    set_surface_uniforms(call, material, frame, assets, device);

    let native = native_blend(material.alpha_mode);
    match frame.config.render_mode {
        RenderMode::MultiPassLighting if !frame.lights.is_empty() => {
            for (pass, light) in frame.lights.iter().enumerate() {
                if pass == 0 {
                    device.set_blend(native);
                } else {
                    device.set_blend(BlendMode::Additive);
                    device.set_depth_func(DepthFunc::LessEqual);
                    device.set_uniform(uniforms::AMBIENT_LIGHT, UniformValue::Vec3(Vec3::ZERO));
                    device.set_uniform(uniforms::EMISSIVE_FACTOR, UniformValue::Vec3(Vec3::ZERO));
                }
                set_light_uniforms(light, frame.config, device);
                device.draw_mesh(call.mesh, vertex_count);
                stats.draws += 1;
            }
            device.set_depth_func(DepthFunc::Less);
            device.set_blend(BlendMode::Disabled);
        }
        RenderMode::SinglePassLighting => {
            device.set_blend(native);
            set_light_arrays(frame.lights, device);
            device.draw_mesh(call.mesh, vertex_count);
            stats.draws += 1;
        }
        RenderMode::MultiPassLighting
        | RenderMode::Normals
        | RenderMode::Texture
        | RenderMode::Uvs => {
            device.set_blend(native);
            device.draw_mesh(call.mesh, vertex_count);
            stats.draws += 1;
        }
    }

    device.set_blend(BlendMode::Disabled);
    true
}

fn set_surface_uniforms<A, D>(
    call: &RenderCall,
    material: &Material,
    frame: &FrameInputs<'_>,
    assets: &A,
    device: &mut D,
) where
    A: AssetProvider + ?Sized,
    D: RenderDevice + ?Sized,
{
    let camera = frame.camera;
    device.set_uniform(uniforms::VIEW_PROJ, UniformValue::Mat4(camera.view_projection()));
    device.set_uniform(uniforms::CAMERA_POSITION, UniformValue::Vec3(camera.eye()));
    device.set_uniform(uniforms::MODEL, UniformValue::Mat4(call.model));
    device.set_uniform(uniforms::TIME, UniformValue::Float(frame.time));
    device.set_uniform(uniforms::BASE_COLOR, UniformValue::Vec4(material.base_color));
    device.set_uniform(
        uniforms::EMISSIVE_FACTOR,
        UniformValue::Vec3(material.emissive_factor),
    );

    let white = assets.white_texture();
    for slot in TextureSlot::ALL {
        let texture = material
            .texture(slot)
            .filter(|handle| assets.texture(*handle).is_some())
            .unwrap_or(white);
        device.set_uniform(
            texture_uniform(slot),
            UniformValue::Texture {
                texture,
                unit: slot.unit(),
            },
        );
    }
    let has_normal_map = material
        .normal_texture
        .is_some_and(|handle| assets.texture(handle).is_some());
    device.set_uniform(
        uniforms::HAS_NORMAL_MAP,
        UniformValue::Int(i32::from(has_normal_map)),
    );

    device.set_uniform(
        uniforms::AMBIENT_LIGHT,
        UniformValue::Vec3(frame.ambient_light),
    );
    device.set_uniform(
        uniforms::ALPHA_CUTOFF,
        UniformValue::Float(material.effective_alpha_cutoff()),
    );
}

fn set_light_uniforms<D>(light: &LightRef<'_>, config: &RendererConfig, device: &mut D)
where
    D: RenderDevice + ?Sized,
{
    let params = light.light;
    device.set_uniform(uniforms::LIGHT_COLOR, UniformValue::Vec3(params.color));
    device.set_uniform(uniforms::LIGHT_INTENSITY, UniformValue::Float(params.intensity));
    device.set_uniform(
        uniforms::LIGHT_MAX_DISTANCE,
        UniformValue::Float(params.max_distance),
    );
    device.set_uniform(
        uniforms::LIGHT_CONE_ANGLE,
        UniformValue::Float(params.cone_angle),
    );
    device.set_uniform(
        uniforms::LIGHT_EXPONENT,
        UniformValue::Float(params.spot_exponent),
    );
    device.set_uniform(uniforms::LIGHT_TYPE, UniformValue::Int(params.kind.index()));
    device.set_uniform(uniforms::LIGHT_POSITION, UniformValue::Vec3(light.position()));
    device.set_uniform(
        uniforms::LIGHT_DIRECTION,
        UniformValue::Vec3(light.direction()),
    );

    match params.shadow_map().filter(|_| config.shadows_enabled) {
        Some(map) => {
            device.set_uniform(
                uniforms::SHADOW_MAP,
                UniformValue::DepthTexture {
                    target: map.target,
                    unit: uniforms::SHADOW_UNIT,
                },
            );
            device.set_uniform(
                uniforms::SHADOW_VIEW_PROJ,
                UniformValue::Mat4(map.camera.view_projection()),
            );
            device.set_uniform(uniforms::SHADOW_BIAS, UniformValue::Float(params.shadow_bias));
            device.set_uniform(uniforms::HAS_SHADOW_MAP, UniformValue::Int(1));
        }
        None => device.set_uniform(uniforms::HAS_SHADOW_MAP, UniformValue::Int(0)),
    }
}

fn set_light_arrays<D>(lights: &[LightRef<'_>], device: &mut D)
where
    D: RenderDevice + ?Sized,
{
    let mut color = [Vec3::ZERO; MAX_LIGHTS];
    let mut intensity = [0.0; MAX_LIGHTS];
    let mut max_distance = [0.0; MAX_LIGHTS];
    let mut cone_angle = [0.0; MAX_LIGHTS];
    let mut exponent = [0.0; MAX_LIGHTS];
    let mut kind = [0; MAX_LIGHTS];
    let mut position = [Vec3::ZERO; MAX_LIGHTS];
    let mut direction = [Vec3::ZERO; MAX_LIGHTS];

    let count = lights.len().min(MAX_LIGHTS);
    for (i, light) in lights.iter().take(count).enumerate() {
        color[i] = light.light.color;
        intensity[i] = light.light.intensity;
        max_distance[i] = light.light.max_distance;
        cone_angle[i] = light.light.cone_angle;
        exponent[i] = light.light.spot_exponent;
        kind[i] = light.light.kind.index();
        position[i] = light.position();
        direction[i] = light.direction();
    }

    device.set_uniform(uniforms::LIGHT_COLOR, UniformValue::Vec3Array(color));
    device.set_uniform(uniforms::LIGHT_INTENSITY, UniformValue::FloatArray(intensity));
    device.set_uniform(
        uniforms::LIGHT_MAX_DISTANCE,
        UniformValue::FloatArray(max_distance),
    );
    device.set_uniform(uniforms::LIGHT_CONE_ANGLE, UniformValue::FloatArray(cone_angle));
    device.set_uniform(uniforms::LIGHT_EXPONENT, UniformValue::FloatArray(exponent));
    device.set_uniform(uniforms::LIGHT_TYPE, UniformValue::IntArray(kind));
    device.set_uniform(uniforms::LIGHT_POSITION, UniformValue::Vec3Array(position));
    device.set_uniform(uniforms::LIGHT_DIRECTION, UniformValue::Vec3Array(direction));
    device.set_uniform(uniforms::LIGHT_COUNT, UniformValue::Int(count as i32));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_blend_per_alpha_mode() {
        assert_eq!(native_blend(AlphaMode::NoAlpha), BlendMode::Disabled);
        assert_eq!(native_blend(AlphaMode::Mask), BlendMode::Disabled);
        assert_eq!(native_blend(AlphaMode::Blend), BlendMode::Alpha);
    }

    #[test]
    fn every_slot_has_a_distinct_uniform() {
        let names: std::collections::BTreeSet<_> =
            TextureSlot::ALL.into_iter().map(texture_uniform).collect();
        assert_eq!(names.len(), TextureSlot::ALL.len());
    }
}
