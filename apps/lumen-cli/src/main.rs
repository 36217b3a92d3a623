use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use glam::{Mat4, Quat, Vec3, Vec4};
use lumen_assets::{AlphaMode, AssetStore, Material, MeshHandle};
use lumen_common::{Camera, Transform};
use lumen_render::{FrameStats, RecordingDevice, RenderMode, Renderer, RendererConfig};
use lumen_render_wgpu::HeadlessTarget;
use lumen_scene::{Entity, LightEntity, MAX_LIGHTS, Node, Prefab, Scene};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lumen-cli", about = "CLI for the lumen forward renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Normals,
    Texture,
    Uvs,
    SinglePass,
    MultiPass,
}

impl From<ModeArg> for RenderMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Normals => RenderMode::Normals,
            ModeArg::Texture => RenderMode::Texture,
            ModeArg::Uvs => RenderMode::Uvs,
            ModeArg::SinglePass => RenderMode::SinglePassLighting,
            ModeArg::MultiPass => RenderMode::MultiPassLighting,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the default renderer configuration as JSON
    Config,
    /// Render the demo scene and print frame stats
    Demo {
        /// Number of frames to render
        #[arg(short, long, default_value = "1")]
        frames: u32,
        /// Shading mode (overrides the config file)
        #[arg(short, long, value_enum)]
        mode: Option<ModeArg>,
        /// Number of lights in the scene
        #[arg(short, long, default_value = "2")]
        lights: usize,
        /// Disable shadow mapping
        #[arg(long)]
        no_shadows: bool,
        /// Overlay shadow map previews
        #[arg(long)]
        show_shadow_maps: bool,
        /// Renderer config JSON file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Print the last frame's device command transcript
        #[arg(long)]
        transcript: bool,
        /// Render on a headless wgpu device instead of the command recorder
        #[arg(long)]
        gpu: bool,
    },
}

struct DemoScene {
    scene: Scene,
    assets: AssetStore,
    cube: MeshHandle,
    quad: MeshHandle,
}

fn build_demo_scene(lights: usize) -> anyhow::Result<DemoScene> {
    let mut assets = AssetStore::new();
    let cube = assets.register_unit_cube();
    let quad = assets.register_unit_quad();

    let stone = assets.register_material(Material {
        base_color: Vec4::new(0.6, 0.6, 0.65, 1.0),
        ..Material::named("stone")
    });
    let foliage = assets.register_material(Material {
        base_color: Vec4::new(0.2, 0.7, 0.25, 1.0),
        two_sided: true,
        ..Material::named("foliage").with_alpha(AlphaMode::Mask)
    });
    let glass = assets.register_material(Material {
        base_color: Vec4::new(0.5, 0.7, 1.0, 0.35),
        ..Material::named("glass").with_alpha(AlphaMode::Blend)
    });

    let mut scene = Scene::new();

    let ground = Prefab::new(
        "ground",
        Node::drawable("ground", quad, stone).with_model(
            Transform {
                rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                scale: Vec3::new(40.0, 40.0, 1.0),
                ..Transform::default()
            }
            .matrix(),
        ),
    );
    scene.add_entity(Entity::instance("ground", Arc::new(ground)))?;

    let pillar = Arc::new(Prefab::new(
        "pillar",
        Node::new("pillar")
            .with_child(
                Node::drawable("base", cube, stone)
                    .with_model(Mat4::from_translation(Vec3::new(0.0, 0.5, 0.0))),
            )
            .with_child(
                Node::drawable("leaves", quad, foliage).with_model(
                    Transform {
                        scale: Vec3::splat(1.5),
                        ..Transform::from_position(Vec3::new(0.0, 1.75, 0.0))
                    }
                    .matrix(),
                ),
            ),
    ));
    for i in 0..5 {
        let x = (i as f32 - 2.0) * 3.0;
        scene.add_entity(
            Entity::instance(format!("pillar_{i}"), Arc::clone(&pillar))
                .at(Vec3::new(x, 0.0, -6.0)),
        )?;
    }

    let pane = Arc::new(Prefab::new("glass", Node::drawable("pane", cube, glass)));
    for (i, z) in [-2.0_f32, -4.0].into_iter().enumerate() {
        scene.add_entity(
            Entity::instance(format!("glass_{i}"), Arc::clone(&pane))
                .at(Vec3::new(i as f32 * 1.5 - 0.75, 0.5, z)),
        )?;
    }

    let rig = [
        Entity::light(
            "sun",
            LightEntity::directional().with_color(Vec3::new(1.0, 0.95, 0.85), 0.8),
        )
        .at(Vec3::new(20.0, 40.0, 20.0))
        .pointing_at(Vec3::ZERO),
        Entity::light(
            "spot",
            LightEntity::spot(30.0).with_color(Vec3::new(1.0, 0.8, 0.6), 1.5),
        )
        .at(Vec3::new(0.0, 8.0, 2.0))
        .pointing_at(Vec3::new(0.0, 0.0, -6.0)),
        Entity::light("fill", LightEntity::point().with_color(Vec3::new(0.4, 0.5, 1.0), 0.6))
            .at(Vec3::new(-6.0, 3.0, 0.0)),
        Entity::light("rim", LightEntity::point().with_color(Vec3::ONE, 0.4))
            .at(Vec3::new(6.0, 3.0, -10.0)),
        Entity::light("bounce", LightEntity::spot(50.0).without_shadows())
            .at(Vec3::new(0.0, 1.0, 6.0))
            .pointing_at(Vec3::new(0.0, 1.0, -6.0)),
    ];
    for light in rig.into_iter().take(lights.min(MAX_LIGHTS)) {
        scene.add_entity(light)?;
    }

    Ok(DemoScene {
        scene,
        assets,
        cube,
        quad,
    })
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<RendererConfig> {
    let Some(path) = path else {
        return Ok(RendererConfig::default());
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    RendererConfig::from_json(&json).with_context(|| format!("parsing {}", path.display()))
}

fn demo_camera(aspect: f32) -> Camera {
    let mut camera = Camera::perspective(60.0, aspect, 0.1, 200.0);
    camera.look_at(Vec3::new(0.0, 4.0, 8.0), Vec3::new(0.0, 0.5, -4.0), Vec3::Y);
    camera
}

fn render_recorded(
    demo: &mut DemoScene,
    renderer: &mut Renderer,
    frames: u32,
    transcript: bool,
) -> FrameStats {
    let mut device = RecordingDevice::new(1280, 720);
    let camera = demo_camera(1280.0 / 720.0);
    let mut stats = FrameStats::default();
    for _ in 0..frames {
        device.reset_log();
        stats = renderer.render_frame(&mut demo.scene, &camera, &demo.assets, &mut device);
    }
    if transcript {
        print!("{}", device.transcript());
    }
    stats
}

fn render_gpu(
    demo: &mut DemoScene,
    renderer: &mut Renderer,
    frames: u32,
) -> anyhow::Result<FrameStats> {
    let mut target = pollster::block_on(HeadlessTarget::new(1280, 720))
        .context("creating headless wgpu device")?;
    let (cube_vertices, cube_indices) = lumen_render_wgpu::cube_mesh();
    let (quad_vertices, quad_indices) = lumen_render_wgpu::quad_mesh();
    let device = target.device_mut();
    device.upload_mesh(demo.cube, &cube_vertices, &cube_indices);
    device.upload_mesh(demo.quad, &quad_vertices, &quad_indices);

    let (width, height) = target.size();
    let camera = demo_camera(width as f32 / height as f32);
    let mut stats = FrameStats::default();
    for frame in 0..frames {
        stats = renderer.render_frame(&mut demo.scene, &camera, &demo.assets, target.device_mut());
        let submitted = target.submit();
        tracing::info!(frame, submitted, "submitted frame");
    }
    Ok(stats)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("lumen-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", lumen_common::crate_info());
            println!("assets: {}", lumen_assets::crate_info());
            println!("scene: {}", lumen_scene::crate_info());
            println!("render: {}", lumen_render::crate_info());
            println!("render-wgpu: {}", lumen_render_wgpu::crate_info());
        }
        Commands::Config => {
            println!("{}", RendererConfig::default().to_json()?);
        }
        Commands::Demo {
            frames,
            mode,
            lights,
            no_shadows,
            show_shadow_maps,
            config,
            transcript,
            gpu,
        } => {
            let mut config = load_config(config.as_ref())?;
            if let Some(mode) = mode {
                config.render_mode = mode.into();
            }
            if no_shadows {
                config.shadows_enabled = false;
            }
            config.show_shadow_maps |= show_shadow_maps;

            let mut demo = build_demo_scene(lights)?;
            println!(
                "Demo: entities={}, lights={}, mode={}, frames={frames}",
                demo.scene.len(),
                demo.scene.light_count(),
                config.render_mode.as_str()
            );
            let mut renderer = Renderer::new(config);
            let stats = if gpu {
                render_gpu(&mut demo, &mut renderer, frames)?
            } else {
                render_recorded(&mut demo, &mut renderer, frames, transcript)
            };
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
