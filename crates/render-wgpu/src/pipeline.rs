//! Render pipelines keyed by program and raster state.

use lumen_render::{BlendMode, DepthFunc, ProgramKind};

use crate::primitives::Vertex;
use crate::shaders;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Everything that selects a distinct `wgpu::RenderPipeline`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub program: ProgramKind,
    pub blend: BlendMode,
    pub depth_func: DepthFunc,
    pub depth_test: bool,
    pub color_writes: bool,
    pub face_culling: bool,
    /// Drawing into a depth-only target (no color attachment).
    pub depth_only: bool,
}

pub fn blend_state(mode: BlendMode) -> Option<wgpu::BlendState> {
    match mode {
        BlendMode::Disabled => None,
        BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        BlendMode::Additive => {
            let add = wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::One,
                operation: wgpu::BlendOperation::Add,
            };
            Some(wgpu::BlendState {
                color: add,
                alpha: add,
            })
        }
    }
}

pub fn compare_function(depth_test: bool, func: DepthFunc) -> wgpu::CompareFunction {
    match (depth_test, func) {
        (false, _) => wgpu::CompareFunction::Always,
        (true, DepthFunc::Less) => wgpu::CompareFunction::Less,
        (true, DepthFunc::LessEqual) => wgpu::CompareFunction::LessEqual,
    }
}

pub fn cull_mode(face_culling: bool) -> Option<wgpu::Face> {
    face_culling.then_some(wgpu::Face::Back)
}

pub fn color_write_mask(color_writes: bool) -> wgpu::ColorWrites {
    if color_writes {
        wgpu::ColorWrites::ALL
    } else {
        wgpu::ColorWrites::empty()
    }
}

pub fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    module: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    key: PipelineKey,
) -> wgpu::RenderPipeline {
    let vertex_buffers = [Vertex::layout()];
    let buffers: &[wgpu::VertexBufferLayout] = match key.program {
        ProgramKind::DepthPreview => &[],
        _ => &vertex_buffers,
    };
    let color_targets = [Some(wgpu::ColorTargetState {
        format: color_format,
        blend: blend_state(key.blend),
        write_mask: color_write_mask(key.color_writes),
    })];
    let fragment = (!key.depth_only).then(|| wgpu::FragmentState {
        module,
        entry_point: Some("fs_main"),
        compilation_options: Default::default(),
        targets: &color_targets,
    });
    let bias = if key.depth_only {
        wgpu::DepthBiasState {
            constant: 2,
            slope_scale: 2.0,
            clamp: 0.0,
        }
    } else {
        Default::default()
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{:?}_pipeline", key.program)),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(shaders::vertex_entry(key.program)),
            compilation_options: Default::default(),
            buffers,
        },
        fragment,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: cull_mode(key.face_culling),
            ..Default::default()
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: DEPTH_FORMAT,
            depth_write_enabled: key.depth_test,
            depth_compare: compare_function(key.depth_test, key.depth_func),
            stencil: Default::default(),
            bias,
        }),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_adds_source_alpha_weighted() {
        let state = blend_state(BlendMode::Additive).unwrap();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.operation, wgpu::BlendOperation::Add);
    }

    #[test]
    fn alpha_blend_is_standard_over() {
        assert_eq!(
            blend_state(BlendMode::Alpha),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
        assert_eq!(blend_state(BlendMode::Disabled), None);
    }

    #[test]
    fn disabled_depth_test_always_passes() {
        assert_eq!(
            compare_function(false, DepthFunc::Less),
            wgpu::CompareFunction::Always
        );
        assert_eq!(
            compare_function(true, DepthFunc::LessEqual),
            wgpu::CompareFunction::LessEqual
        );
    }

    #[test]
    fn culling_and_color_mask() {
        assert_eq!(cull_mode(true), Some(wgpu::Face::Back));
        assert_eq!(cull_mode(false), None);
        assert!(color_write_mask(false).is_empty());
        assert_eq!(color_write_mask(true), wgpu::ColorWrites::ALL);
    }

    #[test]
    fn keys_distinguish_raster_state() {
        let key = PipelineKey {
            program: ProgramKind::MultiPassLighting,
            blend: BlendMode::Disabled,
            depth_func: DepthFunc::Less,
            depth_test: true,
            color_writes: true,
            face_culling: true,
            depth_only: false,
        };
        let additive = PipelineKey {
            blend: BlendMode::Additive,
            depth_func: DepthFunc::LessEqual,
            ..key
        };
        assert_ne!(key, additive);
        assert_eq!(key, PipelineKey { ..key });
    }
}
