use std::time::Instant;

use lumen_assets::{AlphaMode, AssetProvider};
use lumen_common::Camera;
use lumen_scene::{Entity, LightRef, MAX_LIGHTS, Scene};
use serde::Serialize;

use crate::config::{RenderMode, RendererConfig};
use crate::device::{BlendMode, Clear, DepthFunc, RenderDevice};
use crate::error::RenderError;
use crate::forward::{self, FrameInputs};
use crate::queue::RenderQueue;
use crate::shadow;
use crate::walker::{TraversalStats, traverse_scene};

/// Counters for one rendered frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameStats {
    pub traversal: TraversalStats,
    pub opaque: usize,
    pub masked: usize,
    pub blended: usize,
    pub shadow_maps: usize,
    pub shadow_draws: usize,
    /// Forward-pass draw submissions.
    pub draws: usize,
    /// Records the forward pass could not draw.
    pub skipped: usize,
    pub preview_tiles: usize,
}

impl FrameStats {
    pub fn render_calls(&self) -> usize {
        self.opaque + self.masked + self.blended
    }
}

/// Owns the per-frame render queue and the renderer settings.
#[derive(Debug)]
pub struct Renderer {
    config: RendererConfig,
    queue: RenderQueue,
    started: Instant,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(RendererConfig::default())
    }
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self {
            config,
            queue: RenderQueue::new(),
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut RendererConfig {
        &mut self.config
    }

    pub fn set_render_mode(&mut self, mode: RenderMode) {
        self.config.render_mode = mode;
    }

    pub fn set_shadows_enabled(&mut self, enabled: bool) {
        self.config.shadows_enabled = enabled;
    }

    /// The ordered queue of the last rendered frame.
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Render one frame of `scene` as seen from `camera`.
    ///
    /// The scene is borrowed mutably only to cache shadow maps on its lights.
    pub fn render_frame<A, D>(
        &mut self,
        scene: &mut Scene,
        camera: &Camera,
        assets: &A,
        device: &mut D,
    ) -> FrameStats
    where
        A: AssetProvider + ?Sized,
        D: RenderDevice + ?Sized,
    {
        let _span = tracing::debug_span!(
            "render_frame",
            mode = self.config.render_mode.as_str()
        )
        .entered();
        let mut stats = FrameStats::default();
        self.queue.clear();

        if let Err(err) = device.bind_target(None) {
            tracing::warn!(%err, "cannot bind framebuffer");
        }
        device.set_viewport(None);
        device.set_color_writes(true);
        device.set_depth_test(true);
        device.set_depth_func(DepthFunc::Less);
        device.set_blend(BlendMode::Disabled);
        device.clear(Clear::color_and_depth(scene.background_color));

        let queue = &mut self.queue;
        traverse_scene(
            scene,
            camera,
            assets,
            &mut stats.traversal,
            |entity, model, node, distance| {
                queue.collect(assets, entity, model, node, distance);
            },
        );
        self.queue.sort();
        stats.opaque = self.queue.count(AlphaMode::NoAlpha);
        stats.masked = self.queue.count(AlphaMode::Mask);
        stats.blended = self.queue.count(AlphaMode::Blend);

        let light_count = scene.light_count();
        if light_count > MAX_LIGHTS {
            tracing::warn!(
                lights = light_count,
                max = MAX_LIGHTS,
                "light limit reached, extra lights ignored this frame"
            );
        }
        shadow::render_shadow_maps(scene, &self.queue, assets, device, &self.config, &mut stats);

        let lights: Vec<LightRef<'_>> = scene.lights().take(MAX_LIGHTS).collect();
        let frame = FrameInputs {
            camera,
            ambient_light: scene.ambient_light,
            lights: &lights,
            time: self.started.elapsed().as_secs_f32(),
            config: &self.config,
        };
        forward::draw_queue(&self.queue, &frame, assets, device, &mut stats);

        if self.config.show_shadow_maps {
            stats.preview_tiles = shadow::show_shadow_maps(scene, device);
        }

        tracing::debug!(
            calls = stats.render_calls(),
            culled = stats.traversal.culled,
            draws = stats.draws,
            shadow_maps = stats.shadow_maps,
            skipped = stats.skipped,
            "frame rendered"
        );
        stats
    }

    /// Free device resources owned by `entity` (a light's shadow map).
    /// Returns whether anything was released.
    pub fn release_entity<D>(&self, entity: &mut Entity, device: &mut D) -> Result<bool, RenderError>
    where
        D: RenderDevice + ?Sized,
    {
        let Some(map) = entity.as_light_mut().and_then(|light| light.take_shadow_map()) else {
            return Ok(false);
        };
        device.destroy_depth_target(map.target)?;
        tracing::debug!(entity = %entity.id.short(), "shadow map released");
        Ok(true)
    }
}
