//! Forward multi-pass renderer.
//!
//! A frame is cleared, then drawn in a fixed order: opaque commands, the sky
//! sphere, transparent commands back to front, and finally the optional
//! post-process composite. Meshes with submeshes draw one range per submesh,
//! each with the material named by the submesh when the asset resolver knows it.

use ash::vk;
use glam::{BVec4, IVec2, Mat4, UVec2, Vec3, Vec4};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{
    backend::{RenderBackend, SamplerDesc, SamplerId, ShaderId, TextureId, UniformValue},
    command::{FrameCommands, RenderCommand, RenderCommandExtractor},
    material::{BaseMaterial, Material, TexturedMaterial, TintedMaterial},
    mesh::Mesh,
    pipeline::PipelineState,
    postprocess::PostProcessCompositor,
    sort::TransparencySorter,
};
use crate::{
    assets::AssetResolver,
    config::{FULLSCREEN_VERTEX_SHADER, SKY_FRAGMENT_SHADER, SKY_SCALE, SKY_SEGMENTS, SKY_VERTEX_SHADER},
    error::Result,
    scene::SceneGraph,
    utils::{logging::ScopedTimer, math::force_far_plane},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPaths {
    pub vertex: String,
    pub fragment: String,
}

/// Renderer section of the app configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RendererConfig {
    /// Sky texture; no sky is drawn without it.
    pub sky: Option<String>,
    /// Fragment shader of the composite pass; rendering goes straight to the screen without it.
    pub postprocess: Option<String>,
    pub sky_shader: Option<ShaderPaths>,
    pub fullscreen_vertex: Option<String>,
}

impl RendererConfig {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }
}

/// What one call to [`ForwardRenderer::render`] drew.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub opaque_draws: usize,
    pub transparent_draws: usize,
    pub sky_drawn: bool,
    pub composited: bool,
}

#[derive(Debug)]
struct SkyPass {
    sphere: Mesh,
    material: Material,
    shader: ShaderId,
    texture: TextureId,
    sampler: SamplerId,
}

impl SkyPass {
    fn new(image: &str, shader: &ShaderPaths, backend: &mut dyn RenderBackend) -> Result<Self> {
        let shader = backend.create_shader(&shader.vertex, &shader.fragment)?;
        // No mipmaps: the sky is never minified.
        let texture = match backend.create_texture_from_image(image, false) {
            Ok(texture) => texture,
            Err(err) => {
                backend.release_shader(shader);
                return Err(err);
            }
        };
        let sampler = match backend.create_sampler(&SamplerDesc::linear(
            vk::SamplerAddressMode::REPEAT,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
        )) {
            Ok(sampler) => sampler,
            Err(err) => {
                backend.release_texture(texture);
                backend.release_shader(shader);
                return Err(err);
            }
        };

        let material = Material::Textured(TexturedMaterial {
            tinted: TintedMaterial {
                base: BaseMaterial {
                    pipeline_state: PipelineState::sky(),
                    shader,
                    transparent: false,
                },
                tint: Vec4::ONE,
            },
            texture: Some(texture),
            sampler: Some(sampler),
            alpha_threshold: 1.0,
        });

        Ok(Self {
            sphere: Mesh::sphere((SKY_SEGMENTS, SKY_SEGMENTS)),
            material,
            shader,
            texture,
            sampler,
        })
    }

    /// Sphere centred on the camera, pushed onto the far plane.
    fn draw(&self, backend: &mut dyn RenderBackend, view_projection: Mat4, camera_position: Vec3) {
        self.material.setup(backend);
        let model = Mat4::from_translation(camera_position) * Mat4::from_scale(Vec3::splat(SKY_SCALE));
        let transform = force_far_plane(view_projection * model);
        backend.set_uniform("transform", UniformValue::Mat4(transform));
        backend.draw_mesh(&self.sphere, None);
    }

    fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.release_texture(self.texture);
        backend.release_sampler(self.sampler);
        backend.release_shader(self.shader);
    }
}

#[derive(Debug, Default)]
pub struct ForwardRenderer {
    viewport: UVec2,
    commands: FrameCommands,
    sky: Option<SkyPass>,
    postprocess: Option<PostProcessCompositor>,
}

impl ForwardRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the sky and post-process resources requested by `config`.
    ///
    /// Re-initializing releases whatever the previous call created.
    pub fn initialize(
        &mut self,
        viewport: UVec2,
        config: &RendererConfig,
        backend: &mut dyn RenderBackend,
    ) -> Result<()> {
        self.destroy(backend);
        self.viewport = viewport;

        if let Some(image) = &config.sky {
            let shader = config.sky_shader.clone().unwrap_or_else(|| ShaderPaths {
                vertex: SKY_VERTEX_SHADER.to_owned(),
                fragment: SKY_FRAGMENT_SHADER.to_owned(),
            });
            self.sky = Some(SkyPass::new(image, &shader, backend)?);
        }

        if let Some(fragment) = &config.postprocess {
            let vertex = config
                .fullscreen_vertex
                .as_deref()
                .unwrap_or(FULLSCREEN_VERTEX_SHADER);
            match PostProcessCompositor::new(viewport, vertex, fragment, backend) {
                Ok(compositor) => self.postprocess = Some(compositor),
                Err(err) => {
                    self.destroy(backend);
                    return Err(err);
                }
            }
        }

        info!(
            "Forward renderer initialized at {}x{} (sky: {}, postprocess: {})",
            viewport.x,
            viewport.y,
            self.sky.is_some(),
            self.postprocess.is_some()
        );
        Ok(())
    }

    pub fn viewport(&self) -> UVec2 {
        self.viewport
    }

    pub fn has_sky(&self) -> bool {
        self.sky.is_some()
    }

    pub fn has_postprocess(&self) -> bool {
        self.postprocess.is_some()
    }

    /// Commands gathered by the last frame, transparent ones already sorted.
    pub fn commands(&self) -> &FrameCommands {
        &self.commands
    }

    /// Draws one frame. Returns `None`, drawing nothing, when the scene has no camera.
    pub fn render(
        &mut self,
        scene: &dyn SceneGraph,
        assets: &dyn AssetResolver,
        backend: &mut dyn RenderBackend,
    ) -> Option<FrameStats> {
        RenderCommandExtractor::extract_into(scene, &mut self.commands);
        let Some(camera) = self.commands.camera else {
            debug!("No camera in scene, skipping frame");
            return None;
        };

        TransparencySorter::sort(&mut self.commands.transparent, &camera.world);
        let view_projection = camera.view_projection(self.viewport);
        let mut stats = FrameStats::default();

        backend.set_viewport(IVec2::ZERO, self.viewport);
        backend.set_clear_color(Vec4::new(0.0, 0.0, 0.0, 1.0));
        backend.set_clear_depth(1.0);
        backend.set_color_mask(BVec4::TRUE);
        backend.set_depth_mask(true);
        if let Some(postprocess) = &self.postprocess {
            postprocess.begin(backend);
        }
        backend.clear(true, true);

        {
            let _timer = ScopedTimer::new("render::opaque");
            for command in &self.commands.opaque {
                stats.opaque_draws += draw_command(command, assets, backend, view_projection, None);
            }
        }

        if let Some(sky) = &self.sky {
            let _timer = ScopedTimer::new("render::sky");
            sky.draw(backend, view_projection, camera.position());
            stats.sky_drawn = true;
        }

        {
            let _timer = ScopedTimer::new("render::transparent");
            backend.set_blending(true);
            backend.set_depth_mask(false);
            for command in &self.commands.transparent {
                stats.transparent_draws += draw_command(
                    command,
                    assets,
                    backend,
                    view_projection,
                    Some(PipelineState::for_transparent_pass),
                );
            }
            backend.set_depth_mask(true);
            backend.set_blending(false);
        }

        if let Some(postprocess) = &self.postprocess {
            let _timer = ScopedTimer::new("render::postprocess");
            postprocess.composite(backend);
            stats.composited = true;
        }

        Some(stats)
    }

    /// Releases the sky and post-process resources. Safe to call repeatedly.
    pub fn destroy(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(sky) = self.sky.take() {
            sky.destroy(backend);
        }
        if let Some(postprocess) = self.postprocess.take() {
            postprocess.destroy(backend);
        }
        self.commands.clear();
    }
}

/// Draws a command; returns the number of draw calls issued.
///
/// `state` derives the pipeline state from the material's own when set.
fn draw_command(
    command: &RenderCommand,
    assets: &dyn AssetResolver,
    backend: &mut dyn RenderBackend,
    view_projection: Mat4,
    state: Option<fn(&PipelineState) -> PipelineState>,
) -> usize {
    let transform = view_projection * command.local_to_world;
    let mesh = &command.mesh;

    if !mesh.has_submeshes() {
        let Some(material) = command.material.as_deref() else {
            debug!("Mesh {:?} has no material, skipping", mesh.id());
            return 0;
        };
        bind_material(material, backend, state, transform);
        backend.draw_mesh(mesh, None);
        return 1;
    }

    let mut draws = 0;
    for submesh in &mesh.submeshes {
        let Some(material) = assets
            .material(&submesh.material_name)
            .or_else(|| command.material.clone())
        else {
            continue;
        };
        bind_material(&material, backend, state, transform);
        backend.draw_mesh(mesh, Some((submesh.offset, submesh.count)));
        draws += 1;
    }
    draws
}

fn bind_material(
    material: &Material,
    backend: &mut dyn RenderBackend,
    state: Option<fn(&PipelineState) -> PipelineState>,
    transform: Mat4,
) {
    match state {
        Some(derive) => material.setup_with_state(backend, &derive(material.pipeline_state())),
        None => material.setup(backend),
    }
    backend.set_uniform("transform", UniformValue::Mat4(transform));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::{
        assets::AssetRegistry,
        render::{
            backend::{BackendCommand, RecordingBackend},
            camera::Camera,
            mesh::{Submesh, Vertex},
        },
        scene::{Entity, MeshRenderer, Scene},
    };

    fn triangle() -> Arc<Mesh> {
        Arc::new(Mesh::new(vec![Vertex::from_position(Vec3::ZERO); 3], vec![0, 1, 2]))
    }

    fn material(shader: u32, transparent: bool) -> Arc<Material> {
        let mut base = BaseMaterial::new(ShaderId(shader));
        base.transparent = transparent;
        Arc::new(Material::Base(base))
    }

    fn scene_with_camera() -> Scene {
        let mut scene = Scene::new();
        scene.spawn(Entity::new("camera").with_camera(Camera::default()));
        scene
    }

    #[test]
    fn frame_without_camera_draws_nothing() {
        let mut scene = Scene::new();
        scene.spawn(Entity::new("wall").with_mesh_renderer(MeshRenderer::new(triangle(), material(1, false))));
        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        renderer
            .initialize(UVec2::new(64, 64), &RendererConfig::default(), &mut backend)
            .unwrap();

        assert!(renderer.render(&scene, &AssetRegistry::new(), &mut backend).is_none());
        assert!(backend.commands().is_empty());
    }

    #[test]
    fn clear_precedes_draws() {
        let mut scene = scene_with_camera();
        scene.spawn(Entity::new("wall").with_mesh_renderer(MeshRenderer::new(triangle(), material(1, false))));
        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        renderer
            .initialize(UVec2::new(64, 32), &RendererConfig::default(), &mut backend)
            .unwrap();

        let stats = renderer.render(&scene, &AssetRegistry::new(), &mut backend).unwrap();
        assert_eq!(stats.opaque_draws, 1);
        assert_eq!(
            &backend.commands()[..4],
            &[
                BackendCommand::Viewport(IVec2::ZERO, UVec2::new(64, 32)),
                BackendCommand::ClearColor(Vec4::new(0.0, 0.0, 0.0, 1.0)),
                BackendCommand::ClearDepth(1.0),
                BackendCommand::Clear {
                    color: true,
                    depth: true
                },
            ]
        );
    }

    #[test]
    fn submeshes_resolve_material_by_name() {
        let assets = AssetRegistry::new();
        assets.insert_material("brick", Material::Base(BaseMaterial::new(ShaderId(7))));
        let mesh = Arc::new(
            Mesh::new(vec![Vertex::from_position(Vec3::ZERO); 3], vec![0, 1, 2, 0, 2, 1])
                .with_submeshes(vec![Submesh::new(0, 3, "brick"), Submesh::new(3, 3, "unknown")]),
        );
        let mut scene = scene_with_camera();
        scene.spawn(Entity::new("house").with_mesh_renderer(MeshRenderer::new(mesh, material(1, false))));

        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        renderer
            .initialize(UVec2::new(8, 8), &RendererConfig::default(), &mut backend)
            .unwrap();
        let stats = renderer.render(&scene, &assets, &mut backend).unwrap();

        assert_eq!(stats.opaque_draws, 2);
        let draws: Vec<_> = backend.draws().collect();
        assert_eq!(draws[0].shader, Some(ShaderId(7)));
        assert_eq!(draws[0].range, Some((0, 3)));
        assert_eq!(draws[1].shader, Some(ShaderId(1)));
        assert_eq!(draws[1].range, Some((3, 3)));
    }

    #[test]
    fn submesh_without_any_material_is_skipped() {
        let mesh = Arc::new(
            Mesh::new(vec![Vertex::from_position(Vec3::ZERO); 3], vec![0, 1, 2])
                .with_submeshes(vec![Submesh::new(0, 3, "missing")]),
        );
        let mut scene = scene_with_camera();
        scene.spawn(Entity::new("ghost").with_mesh_renderer(MeshRenderer {
            mesh: Some(mesh),
            material: None,
        }));

        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        let stats = renderer.render(&scene, &AssetRegistry::new(), &mut backend).unwrap();
        assert_eq!(stats.opaque_draws, 0);
        assert_eq!(backend.draws().count(), 0);
    }

    #[test]
    fn sky_is_forced_to_far_plane() {
        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        let config = RendererConfig {
            sky: Some("sky.jpg".into()),
            ..RendererConfig::default()
        };
        renderer.initialize(UVec2::new(16, 16), &config, &mut backend).unwrap();

        let scene = scene_with_camera();
        let stats = renderer.render(&scene, &AssetRegistry::new(), &mut backend).unwrap();
        assert!(stats.sky_drawn);

        let sky = backend.draws().next().unwrap();
        assert!(!sky.depth_mask());
        assert_eq!(sky.pipeline.face_culling.culled_face, vk::CullModeFlags::FRONT);
        let transform = sky.transform.unwrap();
        let clip = transform * Vec4::new(0.3, 0.2, -0.9, 1.0);
        assert!((clip.z - clip.w).abs() < 1e-4);
    }

    #[test]
    fn transparent_pass_restores_depth_writes() {
        let mut scene = scene_with_camera();
        scene.spawn(Entity::new("glass").with_mesh_renderer(MeshRenderer::new(triangle(), material(2, true))));
        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        let stats = renderer.render(&scene, &AssetRegistry::new(), &mut backend).unwrap();

        assert_eq!(stats.transparent_draws, 1);
        let draw = backend.draws().next().unwrap();
        assert!(draw.blending());
        assert!(!draw.depth_mask());
        assert!(backend.pipeline().depth_mask);
        assert!(!backend.pipeline().blending.enabled);
    }

    #[test]
    fn destroy_releases_everything() {
        let mut backend = RecordingBackend::new();
        let mut renderer = ForwardRenderer::new();
        let config = RendererConfig::from_json(r#"{ "sky": "sky.jpg", "postprocess": "grain.frag" }"#).unwrap();
        renderer.initialize(UVec2::new(16, 16), &config, &mut backend).unwrap();
        assert!(renderer.has_sky() && renderer.has_postprocess());
        assert!(backend.live_resources() > 0);

        renderer.destroy(&mut backend);
        renderer.destroy(&mut backend);
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn failed_sky_texture_is_an_error() {
        let mut backend = RecordingBackend::new().fail_on("missing.png");
        let mut renderer = ForwardRenderer::new();
        let config = RendererConfig {
            sky: Some("missing.png".into()),
            ..RendererConfig::default()
        };
        assert!(renderer.initialize(UVec2::new(16, 16), &config, &mut backend).is_err());
        assert_eq!(backend.live_resources(), 0);
    }
}
