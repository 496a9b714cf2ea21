use ash::vk;
use glam::{UVec2, Vec4};
use log::error;

use super::{
    backend::{RenderBackend, RenderTargetId, SamplerDesc, SamplerId, ShaderId, TextureFormat, TextureId},
    material::{BaseMaterial, Material, TexturedMaterial, TintedMaterial},
};
use crate::error::Result;

/// Offscreen color and depth target plus the full-screen pass that presents it.
#[derive(Debug)]
pub struct PostProcessCompositor {
    target: RenderTargetId,
    color: TextureId,
    depth: TextureId,
    sampler: SamplerId,
    shader: ShaderId,
    material: Material,
}

impl PostProcessCompositor {
    /// Creates the target at `size` and the composite shader from `vertex_shader` and `fragment_shader`.
    ///
    /// An incomplete target is logged and kept.
    pub fn new(
        size: UVec2,
        vertex_shader: &str,
        fragment_shader: &str,
        backend: &mut dyn RenderBackend,
    ) -> Result<Self> {
        let shader = backend.create_shader(vertex_shader, fragment_shader)?;
        let color = match backend.create_empty_texture(TextureFormat::Rgba8, size) {
            Ok(color) => color,
            Err(err) => {
                backend.release_shader(shader);
                return Err(err);
            }
        };
        let depth = match backend.create_empty_texture(TextureFormat::Depth24, size) {
            Ok(depth) => depth,
            Err(err) => {
                backend.release_texture(color);
                backend.release_shader(shader);
                return Err(err);
            }
        };
        let target = match backend.create_render_target(color, depth) {
            Ok(target) => target,
            Err(err) => {
                backend.release_texture(depth);
                backend.release_texture(color);
                backend.release_shader(shader);
                return Err(err);
            }
        };
        if !backend.is_render_target_complete(target) {
            error!("Postprocess render target {target:?} is not complete");
        }

        let sampler = match backend.create_sampler(&SamplerDesc::linear(
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
            vk::SamplerAddressMode::CLAMP_TO_EDGE,
        )) {
            Ok(sampler) => sampler,
            Err(err) => {
                backend.release_render_target(target);
                backend.release_texture(depth);
                backend.release_texture(color);
                backend.release_shader(shader);
                return Err(err);
            }
        };

        let mut base = BaseMaterial::new(shader);
        // The composite never touches depth.
        base.pipeline_state.depth_mask = false;
        let material = Material::Textured(TexturedMaterial {
            tinted: TintedMaterial {
                base,
                tint: Vec4::ONE,
            },
            texture: Some(color),
            sampler: Some(sampler),
            alpha_threshold: 0.0,
        });

        Ok(Self {
            target,
            color,
            depth,
            sampler,
            shader,
            material,
        })
    }

    pub fn target(&self) -> RenderTargetId {
        self.target
    }

    pub fn color_texture(&self) -> TextureId {
        self.color
    }

    /// Redirects the following passes into the offscreen target.
    pub fn begin(&self, backend: &mut dyn RenderBackend) {
        backend.bind_render_target(Some(self.target));
    }

    /// Rebinds the default target and draws the full-screen triangle sampling the color target.
    pub fn composite(&self, backend: &mut dyn RenderBackend) {
        backend.bind_render_target(None);
        self.material.setup(backend);
        backend.draw_fullscreen_triangle();
    }

    pub fn destroy(self, backend: &mut dyn RenderBackend) {
        backend.release_render_target(self.target);
        backend.release_texture(self.color);
        backend.release_texture(self.depth);
        backend.release_sampler(self.sampler);
        backend.release_shader(self.shader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::RecordingBackend;

    #[test]
    fn composite_samples_color_target_without_depth_writes() {
        let mut backend = RecordingBackend::new();
        let compositor =
            PostProcessCompositor::new(UVec2::new(320, 240), "fullscreen.vert", "vignette.frag", &mut backend)
                .unwrap();

        compositor.begin(&mut backend);
        compositor.composite(&mut backend);

        let draw = backend.draws().last().unwrap();
        assert_eq!(draw.mesh, None);
        assert_eq!(draw.target, None);
        assert!(!draw.depth_mask());
        assert_eq!(draw.textures, vec![(0, compositor.color_texture())]);
    }

    #[test]
    fn failed_shader_leaves_no_resources() {
        let mut backend = RecordingBackend::new().fail_on("broken.frag");
        let result = PostProcessCompositor::new(UVec2::new(8, 8), "fullscreen.vert", "broken.frag", &mut backend);
        assert!(result.is_err());
        assert_eq!(backend.live_resources(), 0);
    }

    #[test]
    fn incomplete_target_is_kept() {
        let mut backend = RecordingBackend::new().with_incomplete_targets();
        let compositor =
            PostProcessCompositor::new(UVec2::new(8, 8), "fullscreen.vert", "copy.frag", &mut backend).unwrap();
        assert!(!backend.is_render_target_complete(compositor.target()));

        compositor.destroy(&mut backend);
        assert_eq!(backend.live_resources(), 0);
    }
}
