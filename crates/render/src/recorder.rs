use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use lumen_assets::MeshHandle;
use lumen_common::RenderTargetHandle;

use crate::device::{
    BlendMode, Clear, DepthFunc, ProgramId, ProgramKind, RenderDevice, UniformValue, Viewport,
};
use crate::error::RenderError;

/// One call made on a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum GpuCommand {
    CreateTarget {
        target: RenderTargetHandle,
        width: u32,
        height: u32,
    },
    DestroyTarget(RenderTargetHandle),
    BindTarget(Option<RenderTargetHandle>),
    Clear(Clear),
    ColorWrites(bool),
    DepthTest(bool),
    DepthFunc(DepthFunc),
    Blend(BlendMode),
    FaceCulling(bool),
    Viewport(Option<Viewport>),
    UseProgram(ProgramKind),
    Uniform(&'static str, UniformValue),
    DrawMesh { mesh: MeshHandle, vertex_count: u32 },
    DrawFullscreen,
}

impl fmt::Display for GpuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuCommand::CreateTarget {
                target,
                width,
                height,
            } => write!(f, "create_target #{} {width}x{height}", target.0),
            GpuCommand::DestroyTarget(target) => write!(f, "destroy_target #{}", target.0),
            GpuCommand::BindTarget(Some(target)) => write!(f, "bind_target #{}", target.0),
            GpuCommand::BindTarget(None) => write!(f, "bind_target framebuffer"),
            GpuCommand::Clear(clear) => write!(
                f,
                "clear color={} depth={}",
                clear.color.is_some(),
                clear.depth
            ),
            GpuCommand::ColorWrites(on) => write!(f, "color_writes {on}"),
            GpuCommand::DepthTest(on) => write!(f, "depth_test {on}"),
            GpuCommand::DepthFunc(func) => write!(f, "depth_func {func:?}"),
            GpuCommand::Blend(mode) => write!(f, "blend {mode:?}"),
            GpuCommand::FaceCulling(on) => write!(f, "face_culling {on}"),
            GpuCommand::Viewport(Some(vp)) => write!(
                f,
                "viewport {},{} {}x{}",
                vp.x, vp.y, vp.width, vp.height
            ),
            GpuCommand::Viewport(None) => write!(f, "viewport full"),
            GpuCommand::UseProgram(kind) => write!(f, "use_program {kind:?}"),
            GpuCommand::Uniform(name, _) => write!(f, "  uniform {name}"),
            GpuCommand::DrawMesh { mesh, vertex_count } => {
                write!(f, "draw mesh={:016x} vertices={vertex_count}", mesh.0)
            }
            GpuCommand::DrawFullscreen => write!(f, "draw fullscreen"),
        }
    }
}

/// Pipeline state captured at a draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub target: Option<RenderTargetHandle>,
    pub program: Option<ProgramKind>,
    /// `None` for fullscreen draws.
    pub mesh: Option<MeshHandle>,
    pub blend: BlendMode,
    pub depth_func: DepthFunc,
    pub depth_test: bool,
    pub color_writes: bool,
    pub face_culling: bool,
    pub viewport: Option<Viewport>,
    pub uniforms: BTreeMap<&'static str, UniformValue>,
}

impl DrawRecord {
    pub fn uniform(&self, name: &str) -> Option<&UniformValue> {
        self.uniforms.get(name)
    }
}

#[derive(Debug, Clone)]
struct State {
    target: Option<RenderTargetHandle>,
    program: Option<ProgramKind>,
    blend: BlendMode,
    depth_func: DepthFunc,
    depth_test: bool,
    color_writes: bool,
    face_culling: bool,
    viewport: Option<Viewport>,
    uniforms: BTreeMap<&'static str, UniformValue>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            target: None,
            program: None,
            blend: BlendMode::Disabled,
            depth_func: DepthFunc::Less,
            depth_test: true,
            color_writes: true,
            face_culling: false,
            viewport: None,
            uniforms: BTreeMap::new(),
        }
    }
}

/// A [`RenderDevice`] that records the command stream instead of touching a
/// GPU. Used by tests and headless runs.
#[derive(Debug, Clone)]
pub struct RecordingDevice {
    size: (u32, u32),
    programs: BTreeSet<ProgramKind>,
    fail_allocations: bool,
    next_target: u32,
    live_targets: BTreeMap<RenderTargetHandle, (u32, u32)>,
    state: State,
    commands: Vec<GpuCommand>,
    draws: Vec<DrawRecord>,
}

impl Default for RecordingDevice {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

impl RecordingDevice {
    /// A device offering every program kind.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            programs: ProgramKind::ALL.into_iter().collect(),
            fail_allocations: false,
            next_target: 1,
            live_targets: BTreeMap::new(),
            state: State::default(),
            commands: Vec::new(),
            draws: Vec::new(),
        }
    }

    pub fn without_program(mut self, kind: ProgramKind) -> Self {
        self.programs.remove(&kind);
        self
    }

    /// Make every depth-target allocation fail.
    pub fn failing_allocations(mut self) -> Self {
        self.fail_allocations = true;
        self
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Draws issued into `target` (`None` = default framebuffer).
    pub fn draws_into(
        &self,
        target: Option<RenderTargetHandle>,
    ) -> impl Iterator<Item = &DrawRecord> {
        self.draws.iter().filter(move |d| d.target == target)
    }

    pub fn live_targets(&self) -> usize {
        self.live_targets.len()
    }

    pub fn targets_created(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, GpuCommand::CreateTarget { .. }))
            .count()
    }

    /// Forget recorded commands and draws; targets and state survive.
    pub fn reset_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Human-readable command listing, uniforms omitted.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            if matches!(command, GpuCommand::Uniform(..)) {
                continue;
            }
            out.push_str(&command.to_string());
            out.push('\n');
        }
        out
    }

    fn record_draw(&mut self, mesh: Option<MeshHandle>) {
        let state = &self.state;
        self.draws.push(DrawRecord {
            target: state.target,
            program: state.program,
            mesh,
            blend: state.blend,
            depth_func: state.depth_func,
            depth_test: state.depth_test,
            color_writes: state.color_writes,
            face_culling: state.face_culling,
            viewport: state.viewport,
            uniforms: state.uniforms.clone(),
        });
    }

    fn kind_of(program: ProgramId) -> Option<ProgramKind> {
        ProgramKind::ALL.get(program.0 as usize).copied()
    }
}

impl RenderDevice for RecordingDevice {
    fn resolve_program(&mut self, kind: ProgramKind) -> Option<ProgramId> {
        if !self.programs.contains(&kind) {
            return None;
        }
        let index = ProgramKind::ALL.iter().position(|k| *k == kind)?;
        Some(ProgramId(index as u32))
    }

    fn surface_size(&self) -> (u32, u32) {
        self.size
    }

    fn create_depth_target(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<RenderTargetHandle, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        if self.fail_allocations {
            return Err(RenderError::TargetAllocation {
                width,
                height,
                reason: "allocation disabled".into(),
            });
        }
        let target = RenderTargetHandle(self.next_target);
        self.next_target += 1;
        self.live_targets.insert(target, (width, height));
        self.commands.push(GpuCommand::CreateTarget {
            target,
            width,
            height,
        });
        Ok(target)
    }

    fn destroy_depth_target(&mut self, target: RenderTargetHandle) -> Result<(), RenderError> {
        self.live_targets
            .remove(&target)
            .ok_or(RenderError::UnknownTarget(target))?;
        self.commands.push(GpuCommand::DestroyTarget(target));
        Ok(())
    }

    fn bind_target(&mut self, target: Option<RenderTargetHandle>) -> Result<(), RenderError> {
        if let Some(handle) = target {
            if !self.live_targets.contains_key(&handle) {
                return Err(RenderError::UnknownTarget(handle));
            }
        }
        self.state.target = target;
        self.commands.push(GpuCommand::BindTarget(target));
        Ok(())
    }

    fn clear(&mut self, clear: Clear) {
        self.commands.push(GpuCommand::Clear(clear));
    }

    fn set_color_writes(&mut self, enabled: bool) {
        self.state.color_writes = enabled;
        self.commands.push(GpuCommand::ColorWrites(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
        self.commands.push(GpuCommand::DepthTest(enabled));
    }

    fn set_depth_func(&mut self, func: DepthFunc) {
        self.state.depth_func = func;
        self.commands.push(GpuCommand::DepthFunc(func));
    }

    fn set_blend(&mut self, mode: BlendMode) {
        self.state.blend = mode;
        self.commands.push(GpuCommand::Blend(mode));
    }

    fn set_face_culling(&mut self, enabled: bool) {
        self.state.face_culling = enabled;
        self.commands.push(GpuCommand::FaceCulling(enabled));
    }

    fn set_viewport(&mut self, viewport: Option<Viewport>) {
        self.state.viewport = viewport;
        self.commands.push(GpuCommand::Viewport(viewport));
    }

    fn use_program(&mut self, program: ProgramId) {
        let kind = Self::kind_of(program);
        self.state.program = kind;
        self.state.uniforms.clear();
        if let Some(kind) = kind {
            self.commands.push(GpuCommand::UseProgram(kind));
        }
    }

    fn set_uniform(&mut self, name: &'static str, value: UniformValue) {
        self.state.uniforms.insert(name, value.clone());
        self.commands.push(GpuCommand::Uniform(name, value));
    }

    fn draw_mesh(&mut self, mesh: MeshHandle, vertex_count: u32) {
        self.record_draw(Some(mesh));
        self.commands.push(GpuCommand::DrawMesh { mesh, vertex_count });
    }

    fn draw_fullscreen(&mut self) {
        self.record_draw(None);
        self.commands.push(GpuCommand::DrawFullscreen);
    }
}
