//! Shadow-Pass Driver.
//!
//! # Invariants
//! - Depth targets are allocated on a light's first shadowed frame and
//!   reused afterwards.
//! - Only the first `MAX_LIGHTS` lights render shadow maps.
//! - Only the `NoAlpha` records of the ordered queue are drawn.
//! - Color writes are re-enabled and the default framebuffer re-bound before
//!   the forward pass.

use glam::{Mat4, Vec2, Vec3, Vec4};
use lumen_assets::AssetProvider;
use lumen_common::Camera;
use lumen_scene::{LightEntity, LightKind, MAX_LIGHTS, Scene, ShadowMap};

use crate::config::RendererConfig;
use crate::device::{
    BlendMode, Clear, DepthFunc, ProgramKind, RenderDevice, UniformValue, Viewport, uniforms,
};
use crate::queue::RenderQueue;
use crate::renderer::FrameStats;

const MAX_SPOT_FOV_DEGREES: f32 = 170.0;

/// Light-space camera for `light` placed at `position` facing `forward`.
/// Point lights have none.
pub fn shadow_camera(
    light: &LightEntity,
    position: Vec3,
    forward: Vec3,
    config: &RendererConfig,
) -> Option<Camera> {
    let mut camera = match light.kind {
        LightKind::Point => return None,
        LightKind::Spot => Camera::perspective(
            (light.cone_angle * 2.0).clamp(1.0, MAX_SPOT_FOV_DEGREES),
            1.0,
            config.shadow_near,
            light.max_distance.max(config.shadow_near * 2.0),
        ),
        LightKind::Directional => {
            let half = config.directional_shadow_extent * 0.5;
            Camera::orthographic(
                -half,
                half,
                -half,
                half,
                config.shadow_near,
                config.directional_shadow_far,
            )
        }
    };
    camera.look_at(position, position + forward, Vec3::Y);
    Some(camera)
}

pub(crate) fn render_shadow_maps<A, D>(
    scene: &mut Scene,
    queue: &RenderQueue,
    assets: &A,
    device: &mut D,
    config: &RendererConfig,
    stats: &mut FrameStats,
) where
    A: AssetProvider + ?Sized,
    D: RenderDevice + ?Sized,
{
    if !config.shadows_enabled {
        return;
    }
    let _span = tracing::debug_span!("shadow_pass").entered();
    let Some(program) = device.resolve_program(ProgramKind::ShadowDepth) else {
        tracing::debug!("no shadow depth program, shadow pass skipped");
        return;
    };

    for entry in scene.lights_mut().take(MAX_LIGHTS) {
        let position = entry.position();
        let forward = entry.direction();
        let id = entry.id;
        let light = entry.light;
        if !light.wants_shadow_map() {
            continue;
        }
        let Some(camera) = shadow_camera(light, position, forward, config) else {
            continue;
        };
        let view_proj = camera.view_projection();
        let eye = camera.eye();

        let target = match light.shadow_map_mut() {
            Some(map) => {
                map.camera = camera;
                map.target
            }
            None => {
                let size = config.shadow_map_size;
                match device.create_depth_target(size, size) {
                    Ok(target) => {
                        tracing::debug!(light = %id.short(), size, "shadow map allocated");
                        light.attach_shadow_map(ShadowMap {
                            target,
                            size,
                            camera,
                        });
                        target
                    }
                    Err(err) => {
                        tracing::warn!(light = %id.short(), %err, "shadow map unavailable");
                        continue;
                    }
                }
            }
        };

        if let Err(err) = device.bind_target(Some(target)) {
            tracing::warn!(light = %id.short(), %err, "cannot bind shadow target");
            continue;
        }
        device.set_viewport(None);
        device.set_color_writes(false);
        device.set_depth_test(true);
        device.set_depth_func(DepthFunc::Less);
        device.set_blend(BlendMode::Disabled);
        device.clear(Clear::depth_only());

        device.use_program(program);
        device.set_uniform(uniforms::VIEW_PROJ, UniformValue::Mat4(view_proj));
        device.set_uniform(uniforms::CAMERA_POSITION, UniformValue::Vec3(eye));
        device.set_uniform(uniforms::BASE_COLOR, UniformValue::Vec4(Vec4::ONE));

        for call in queue.opaque() {
            let Some(mesh) = assets.mesh(call.mesh).filter(|m| m.vertex_count > 0) else {
                continue;
            };
            let Some(material) = assets.material(call.material) else {
                continue;
            };
            device.set_face_culling(!material.two_sided);
            device.set_uniform(uniforms::MODEL, UniformValue::Mat4(call.model));
            device.draw_mesh(call.mesh, mesh.vertex_count);
            stats.shadow_draws += 1;
        }

        if let Err(err) = device.bind_target(None) {
            tracing::warn!(%err, "cannot rebind framebuffer after shadow pass");
        }
        device.set_color_writes(true);
        stats.shadow_maps += 1;
    }
}

/// Draw every allocated shadow map as a tile along the bottom edge of the
/// framebuffer. Returns the number of tiles drawn.
pub(crate) fn show_shadow_maps<D>(scene: &Scene, device: &mut D) -> usize
where
    D: RenderDevice + ?Sized,
{
    let Some(program) = device.resolve_program(ProgramKind::DepthPreview) else {
        return 0;
    };
    let (_, height) = device.surface_size();
    let tile = (height / 4).max(1);

    device.set_depth_test(false);
    device.use_program(program);
    let mut drawn = 0;
    for map in scene
        .lights()
        .take(MAX_LIGHTS)
        .filter_map(|l| l.light.shadow_map())
    {
        device.set_viewport(Some(Viewport {
            x: drawn * tile,
            y: 0,
            width: tile,
            height: tile,
        }));
        device.set_uniform(
            uniforms::CAMERA_NEAR_FAR,
            UniformValue::Vec2(Vec2::new(map.camera.near(), map.camera.far())),
        );
        device.set_uniform(
            uniforms::SHADOW_MAP,
            UniformValue::DepthTexture {
                target: map.target,
                unit: 0,
            },
        );
        device.set_uniform(uniforms::MODEL, UniformValue::Mat4(Mat4::IDENTITY));
        device.draw_fullscreen();
        drawn += 1;
    }
    device.set_viewport(None);
    device.set_depth_test(true);
    drawn as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_common::Projection;

    #[test]
    fn spot_camera_uses_twice_the_cone_angle() {
        let light = LightEntity::spot(30.0);
        let camera = shadow_camera(
            &light,
            Vec3::new(0.0, 10.0, 0.0),
            Vec3::NEG_Y,
            &RendererConfig::default(),
        )
        .unwrap();
        match camera.projection() {
            Projection::Perspective {
                fov_degrees,
                aspect,
                far,
                ..
            } => {
                assert_eq!(*fov_degrees, 60.0);
                assert_eq!(*aspect, 1.0);
                assert_eq!(*far, light.max_distance);
            }
            other => panic!("expected perspective, got {other:?}"),
        }
        assert_eq!(camera.eye(), Vec3::new(0.0, 10.0, 0.0));
        assert!(camera.view_projection().is_finite());
    }

    #[test]
    fn directional_camera_is_orthographic_and_centered() {
        let config = RendererConfig::default();
        let camera = shadow_camera(
            &LightEntity::directional(),
            Vec3::new(0.0, 100.0, 0.0),
            Vec3::NEG_Y,
            &config,
        )
        .unwrap();
        match camera.projection() {
            Projection::Orthographic { left, right, far, .. } => {
                assert_eq!(*right - *left, config.directional_shadow_extent);
                assert_eq!(*far, config.directional_shadow_far);
            }
            other => panic!("expected orthographic, got {other:?}"),
        }
        // A point below the light must be inside the light volume.
        assert!(camera.frustum().contains_point(Vec3::ZERO));
    }

    #[test]
    fn point_lights_have_no_shadow_camera() {
        let camera = shadow_camera(
            &LightEntity::point(),
            Vec3::ZERO,
            Vec3::NEG_Z,
            &RendererConfig::default(),
        );
        assert!(camera.is_none());
    }
}
