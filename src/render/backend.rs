//! GPU seam used by the forward renderer.
//!
//! The renderer never talks to a graphics API directly; everything it needs
//! goes through [`RenderBackend`]. [`RecordingBackend`] keeps the state a real
//! device would hold and records every draw so passes can be inspected.

use std::collections::{HashMap, HashSet};

use ash::vk;
use glam::{BVec4, IVec2, Mat4, UVec2, Vec3, Vec4};

use super::{mesh::Mesh, pipeline::PipelineState};
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat4(Mat4),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Depth24,
}

/// Filtering and wrapping of a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerDesc {
    pub min_filter: vk::Filter,
    pub mag_filter: vk::Filter,
    pub address_mode_u: vk::SamplerAddressMode,
    pub address_mode_v: vk::SamplerAddressMode,
}

impl SamplerDesc {
    pub fn linear(address_mode_u: vk::SamplerAddressMode, address_mode_v: vk::SamplerAddressMode) -> Self {
        Self {
            min_filter: vk::Filter::LINEAR,
            mag_filter: vk::Filter::LINEAR,
            address_mode_u,
            address_mode_v,
        }
    }
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self::linear(vk::SamplerAddressMode::REPEAT, vk::SamplerAddressMode::REPEAT)
    }
}

pub trait RenderBackend {
    fn set_viewport(&mut self, origin: IVec2, size: UVec2);
    fn set_clear_color(&mut self, color: Vec4);
    fn set_clear_depth(&mut self, depth: f32);
    fn set_color_mask(&mut self, mask: BVec4);
    fn set_depth_mask(&mut self, enabled: bool);
    fn set_blending(&mut self, enabled: bool);
    fn clear(&mut self, color: bool, depth: bool);

    /// Applies every fixed-function switch described by `state`.
    fn apply_pipeline_state(&mut self, state: &PipelineState);
    fn use_shader(&mut self, shader: ShaderId);
    /// Sets a uniform on the shader currently in use.
    fn set_uniform(&mut self, name: &str, value: UniformValue);
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>, sampler: Option<SamplerId>);

    /// Draws `count` indices starting at `offset`, or the whole mesh when `range` is `None`.
    fn draw_mesh(&mut self, mesh: &Mesh, range: Option<(u32, u32)>);
    /// Draws three vertices generated in the vertex shader.
    fn draw_fullscreen_triangle(&mut self);

    fn create_texture_from_image(&mut self, path: &str, generate_mipmaps: bool) -> Result<TextureId>;
    fn create_empty_texture(&mut self, format: TextureFormat, size: UVec2) -> Result<TextureId>;
    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId>;
    fn create_shader(&mut self, vertex_path: &str, fragment_path: &str) -> Result<ShaderId>;
    fn create_render_target(&mut self, color: TextureId, depth: TextureId) -> Result<RenderTargetId>;
    fn is_render_target_complete(&self, target: RenderTargetId) -> bool;
    /// `None` binds the default framebuffer.
    fn bind_render_target(&mut self, target: Option<RenderTargetId>);

    fn release_texture(&mut self, texture: TextureId);
    fn release_sampler(&mut self, sampler: SamplerId);
    fn release_shader(&mut self, shader: ShaderId);
    fn release_render_target(&mut self, target: RenderTargetId);
}

/// What was drawn, with the state in effect at the time.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// `None` for the full-screen triangle.
    pub mesh: Option<MeshId>,
    pub range: Option<(u32, u32)>,
    pub shader: Option<ShaderId>,
    pub target: Option<RenderTargetId>,
    pub pipeline: PipelineState,
    pub transform: Option<Mat4>,
    pub textures: Vec<(u32, TextureId)>,
}

impl DrawRecord {
    pub fn blending(&self) -> bool {
        self.pipeline.blending.enabled
    }

    pub fn depth_mask(&self) -> bool {
        self.pipeline.depth_mask
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    Viewport(IVec2, UVec2),
    ClearColor(Vec4),
    ClearDepth(f32),
    Clear { color: bool, depth: bool },
    BindTarget(Option<RenderTargetId>),
    Draw(DrawRecord),
}

/// Device-free backend that tracks state and records commands.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<BackendCommand>,
    pipeline: PipelineState,
    color_mask: BVec4,
    shader: Option<ShaderId>,
    target: Option<RenderTargetId>,
    uniforms: HashMap<String, UniformValue>,
    bound_textures: HashMap<u32, TextureId>,
    next_id: u32,
    textures: HashSet<TextureId>,
    samplers: HashSet<SamplerId>,
    shaders: HashMap<ShaderId, (String, String)>,
    targets: HashSet<RenderTargetId>,
    failing_paths: HashSet<String>,
    incomplete_targets: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            color_mask: BVec4::TRUE,
            ..Self::default()
        }
    }

    /// Resource creation from `path` fails from now on.
    pub fn fail_on(mut self, path: impl Into<String>) -> Self {
        self.failing_paths.insert(path.into());
        self
    }

    /// Every render target reports itself incomplete.
    pub fn with_incomplete_targets(mut self) -> Self {
        self.incomplete_targets = true;
        self
    }

    pub fn commands(&self) -> &[BackendCommand] {
        &self.commands
    }

    pub fn draws(&self) -> impl Iterator<Item = &DrawRecord> + '_ {
        self.commands.iter().filter_map(|command| match command {
            BackendCommand::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn take_commands(&mut self) -> Vec<BackendCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn pipeline(&self) -> &PipelineState {
        &self.pipeline
    }

    pub fn color_mask(&self) -> BVec4 {
        self.color_mask
    }

    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.get(name).copied()
    }

    pub fn shader_sources(&self, shader: ShaderId) -> Option<(&str, &str)> {
        self.shaders
            .get(&shader)
            .map(|(vertex, fragment)| (vertex.as_str(), fragment.as_str()))
    }

    /// Number of live textures, samplers, shaders and render targets.
    pub fn live_resources(&self) -> usize {
        self.textures.len() + self.samplers.len() + self.shaders.len() + self.targets.len()
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn check_path(&self, path: &str) -> Result<()> {
        if self.failing_paths.contains(path) {
            return Err(EngineError::Backend(format!("cannot load {path}")));
        }
        Ok(())
    }

    fn record_draw(&mut self, mesh: Option<MeshId>, range: Option<(u32, u32)>) {
        let transform = match self.uniforms.get("transform") {
            Some(UniformValue::Mat4(matrix)) => Some(*matrix),
            _ => None,
        };
        let mut textures: Vec<(u32, TextureId)> =
            self.bound_textures.iter().map(|(&unit, &id)| (unit, id)).collect();
        textures.sort_unstable();
        self.commands.push(BackendCommand::Draw(DrawRecord {
            mesh,
            range,
            shader: self.shader,
            target: self.target,
            pipeline: self.pipeline.clone(),
            transform,
            textures,
        }));
    }
}

impl RenderBackend for RecordingBackend {
    fn set_viewport(&mut self, origin: IVec2, size: UVec2) {
        self.commands.push(BackendCommand::Viewport(origin, size));
    }

    fn set_clear_color(&mut self, color: Vec4) {
        self.commands.push(BackendCommand::ClearColor(color));
    }

    fn set_clear_depth(&mut self, depth: f32) {
        self.commands.push(BackendCommand::ClearDepth(depth));
    }

    fn set_color_mask(&mut self, mask: BVec4) {
        self.color_mask = mask;
        self.pipeline.color_mask = [mask.x, mask.y, mask.z, mask.w];
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.pipeline.depth_mask = enabled;
    }

    fn set_blending(&mut self, enabled: bool) {
        self.pipeline.blending.enabled = enabled;
    }

    fn clear(&mut self, color: bool, depth: bool) {
        self.commands.push(BackendCommand::Clear { color, depth });
    }

    fn apply_pipeline_state(&mut self, state: &PipelineState) {
        self.pipeline = state.clone();
        let [r, g, b, a] = state.color_mask;
        self.color_mask = BVec4::new(r, g, b, a);
    }

    fn use_shader(&mut self, shader: ShaderId) {
        if self.shader != Some(shader) {
            self.uniforms.clear();
        }
        self.shader = Some(shader);
    }

    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        self.uniforms.insert(name.to_owned(), value);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureId>, _sampler: Option<SamplerId>) {
        match texture {
            Some(texture) => self.bound_textures.insert(unit, texture),
            None => self.bound_textures.remove(&unit),
        };
    }

    fn draw_mesh(&mut self, mesh: &Mesh, range: Option<(u32, u32)>) {
        self.record_draw(Some(mesh.id()), range);
    }

    fn draw_fullscreen_triangle(&mut self) {
        self.record_draw(None, Some((0, 3)));
    }

    fn create_texture_from_image(&mut self, path: &str, _generate_mipmaps: bool) -> Result<TextureId> {
        self.check_path(path)?;
        let id = TextureId(self.allocate());
        self.textures.insert(id);
        Ok(id)
    }

    fn create_empty_texture(&mut self, _format: TextureFormat, size: UVec2) -> Result<TextureId> {
        if size.x == 0 || size.y == 0 {
            return Err(EngineError::Backend(format!("empty texture size {size}")));
        }
        let id = TextureId(self.allocate());
        self.textures.insert(id);
        Ok(id)
    }

    fn create_sampler(&mut self, _desc: &SamplerDesc) -> Result<SamplerId> {
        let id = SamplerId(self.allocate());
        self.samplers.insert(id);
        Ok(id)
    }

    fn create_shader(&mut self, vertex_path: &str, fragment_path: &str) -> Result<ShaderId> {
        self.check_path(vertex_path)?;
        self.check_path(fragment_path)?;
        let id = ShaderId(self.allocate());
        self.shaders
            .insert(id, (vertex_path.to_owned(), fragment_path.to_owned()));
        Ok(id)
    }

    fn create_render_target(&mut self, color: TextureId, depth: TextureId) -> Result<RenderTargetId> {
        if !self.textures.contains(&color) || !self.textures.contains(&depth) {
            return Err(EngineError::Backend("render target attachment missing".into()));
        }
        let id = RenderTargetId(self.allocate());
        self.targets.insert(id);
        Ok(id)
    }

    fn is_render_target_complete(&self, target: RenderTargetId) -> bool {
        !self.incomplete_targets && self.targets.contains(&target)
    }

    fn bind_render_target(&mut self, target: Option<RenderTargetId>) {
        self.target = target;
        self.commands.push(BackendCommand::BindTarget(target));
    }

    fn release_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn release_sampler(&mut self, sampler: SamplerId) {
        self.samplers.remove(&sampler);
    }

    fn release_shader(&mut self, shader: ShaderId) {
        self.shaders.remove(&shader);
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        self.targets.remove(&target);
    }
}
