use glam::{Vec3, Vec4};
use log::warn;
use serde::Deserialize;

use super::{
    backend::{RenderBackend, SamplerId, ShaderId, TextureId, UniformValue},
    pipeline::PipelineState,
};
use crate::{
    assets::AssetResolver,
    error::{EngineError, Result},
};

/// Pipeline state, shader and transparency shared by every material.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseMaterial {
    pub pipeline_state: PipelineState,
    pub shader: ShaderId,
    pub transparent: bool,
}

impl BaseMaterial {
    pub fn new(shader: ShaderId) -> Self {
        Self {
            pipeline_state: PipelineState::default(),
            shader,
            transparent: false,
        }
    }
}

/// Uniform colour sent as `tint`.
#[derive(Debug, Clone, PartialEq)]
pub struct TintedMaterial {
    pub base: BaseMaterial,
    pub tint: Vec4,
}

/// Tinted material sampling `tex` on unit 0; fragments under `alphaThreshold` are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TexturedMaterial {
    pub tinted: TintedMaterial,
    pub texture: Option<TextureId>,
    pub sampler: Option<SamplerId>,
    pub alpha_threshold: f32,
}

/// Lit surface with optional maps on units 0..=4 and constant fallbacks.
#[derive(Debug, Clone, PartialEq)]
pub struct LitMaterial {
    pub base: BaseMaterial,
    pub albedo_map: Option<TextureId>,
    pub specular_map: Option<TextureId>,
    pub roughness_map: Option<TextureId>,
    pub ao_map: Option<TextureId>,
    pub emissive_map: Option<TextureId>,
    pub sampler: Option<SamplerId>,
    pub albedo: Vec3,
    pub specular: Vec3,
    pub emissive: Vec3,
    pub roughness: f32,
    pub ao: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Base(BaseMaterial),
    Tinted(TintedMaterial),
    Textured(TexturedMaterial),
    Lit(LitMaterial),
}

impl Material {
    pub fn base(&self) -> &BaseMaterial {
        match self {
            Material::Base(base) => base,
            Material::Tinted(tinted) => &tinted.base,
            Material::Textured(textured) => &textured.tinted.base,
            Material::Lit(lit) => &lit.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut BaseMaterial {
        match self {
            Material::Base(base) => base,
            Material::Tinted(tinted) => &mut tinted.base,
            Material::Textured(textured) => &mut textured.tinted.base,
            Material::Lit(lit) => &mut lit.base,
        }
    }

    pub fn is_transparent(&self) -> bool {
        self.base().transparent
    }

    pub fn shader(&self) -> ShaderId {
        self.base().shader
    }

    pub fn pipeline_state(&self) -> &PipelineState {
        &self.base().pipeline_state
    }

    /// Applies the material's own pipeline state, binds its shader and uploads its uniforms.
    pub fn setup(&self, backend: &mut dyn RenderBackend) {
        self.setup_with_state(backend, self.pipeline_state());
    }

    /// Same as [`setup`](Self::setup) with `state` in place of the material's pipeline state.
    pub fn setup_with_state(&self, backend: &mut dyn RenderBackend, state: &PipelineState) {
        backend.apply_pipeline_state(state);
        backend.use_shader(self.shader());

        match self {
            Material::Base(_) => {}
            Material::Tinted(tinted) => set_tint(backend, tinted),
            Material::Textured(textured) => {
                set_tint(backend, &textured.tinted);
                backend.set_uniform("alphaThreshold", UniformValue::Float(textured.alpha_threshold));
                // A texture without a sampler still binds with the backend default.
                if textured.texture.is_some() {
                    backend.bind_texture(0, textured.texture, textured.sampler);
                    backend.set_uniform("tex", UniformValue::Int(0));
                }
            }
            Material::Lit(lit) => {
                backend.set_uniform("material.albedo", UniformValue::Vec3(lit.albedo));
                backend.set_uniform("material.specular", UniformValue::Vec3(lit.specular));
                backend.set_uniform("material.emissive", UniformValue::Vec3(lit.emissive));
                backend.set_uniform("material.roughness", UniformValue::Float(lit.roughness));
                backend.set_uniform("material.ao", UniformValue::Float(lit.ao));

                let maps = [
                    ("albedo", lit.albedo_map),
                    ("specular", lit.specular_map),
                    ("roughness", lit.roughness_map),
                    ("ao", lit.ao_map),
                    ("emissive", lit.emissive_map),
                ];
                for (unit, (name, map)) in maps.into_iter().enumerate() {
                    let unit = unit as u32;
                    backend.bind_texture(unit, map, lit.sampler);
                    backend.set_uniform(
                        &format!("material.use_{name}_map"),
                        UniformValue::Int(i32::from(map.is_some())),
                    );
                    backend.set_uniform(&format!("material.{name}_map"), UniformValue::Int(unit as i32));
                }
            }
        }
    }

    pub fn from_json(source: &str, assets: &dyn AssetResolver) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(source)?;
        Self::deserialize(&value, assets)
    }

    /// Builds a material from its scene-file description.
    ///
    /// `type` selects the variant (`tinted`, `textured`, `lit`; anything else is
    /// a base material). The shader must resolve; textures and samplers that do
    /// not resolve are left unbound.
    pub fn deserialize(value: &serde_json::Value, assets: &dyn AssetResolver) -> Result<Self> {
        let data = MaterialData::deserialize(value)?;
        let shader = assets
            .shader(&data.shader)
            .ok_or_else(|| EngineError::unknown("shader", &data.shader))?;
        let base = BaseMaterial {
            pipeline_state: data.pipeline_state,
            shader,
            transparent: data.transparent,
        };
        let texture = |name: &str| lookup(name, "texture", |n| assets.texture(n));
        let sampler = lookup(&data.sampler, "sampler", |n| assets.sampler(n));

        let material = match data.kind.as_str() {
            "tinted" => Material::Tinted(TintedMaterial {
                base,
                tint: data.tint,
            }),
            "textured" => Material::Textured(TexturedMaterial {
                tinted: TintedMaterial {
                    base,
                    tint: data.tint,
                },
                texture: texture(&data.texture),
                sampler,
                alpha_threshold: data.alpha_threshold,
            }),
            "lit" => Material::Lit(LitMaterial {
                base,
                albedo_map: texture(&data.albedo_map),
                specular_map: texture(&data.specular_map),
                roughness_map: texture(&data.roughness_map),
                ao_map: texture(&data.ao_map),
                emissive_map: texture(&data.emissive_map),
                sampler,
                albedo: data.albedo,
                specular: data.specular,
                emissive: data.emissive,
                roughness: data.roughness,
                ao: data.ao,
            }),
            _ => Material::Base(base),
        };
        Ok(material)
    }
}

fn set_tint(backend: &mut dyn RenderBackend, tinted: &TintedMaterial) {
    backend.set_uniform("tint", UniformValue::Vec4(tinted.tint));
}

fn lookup<T>(name: &str, kind: &str, resolve: impl Fn(&str) -> Option<T>) -> Option<T> {
    if name.is_empty() {
        return None;
    }
    let found = resolve(name);
    if found.is_none() {
        warn!("Material references unknown {kind} '{name}'");
    }
    found
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct MaterialData {
    #[serde(rename = "type")]
    kind: String,
    shader: String,
    pipeline_state: PipelineState,
    transparent: bool,
    tint: Vec4,
    texture: String,
    sampler: String,
    alpha_threshold: f32,
    #[serde(rename = "albedo_map")]
    albedo_map: String,
    #[serde(rename = "specular_map")]
    specular_map: String,
    #[serde(rename = "roughness_map")]
    roughness_map: String,
    #[serde(rename = "ao_map")]
    ao_map: String,
    #[serde(rename = "emissive_map")]
    emissive_map: String,
    albedo: Vec3,
    specular: Vec3,
    emissive: Vec3,
    roughness: f32,
    ao: f32,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            kind: String::new(),
            shader: String::new(),
            pipeline_state: PipelineState::default(),
            transparent: false,
            tint: Vec4::ONE,
            texture: String::new(),
            sampler: String::new(),
            alpha_threshold: 0.0,
            albedo_map: String::new(),
            specular_map: String::new(),
            roughness_map: String::new(),
            ao_map: String::new(),
            emissive_map: String::new(),
            albedo: Vec3::ONE,
            specular: Vec3::splat(0.5),
            emissive: Vec3::ZERO,
            roughness: 0.5,
            ao: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{assets::AssetRegistry, render::backend::RecordingBackend};

    fn registry() -> AssetRegistry {
        let registry = AssetRegistry::new();
        registry.insert_shader("tinted", ShaderId(1));
        registry.insert_shader("lit", ShaderId(2));
        registry.insert_texture("bricks", TextureId(10));
        registry.insert_sampler("default", SamplerId(20));
        registry
    }

    #[test]
    fn type_tag_selects_variant() {
        let assets = registry();
        let tinted = Material::from_json(
            r#"{ "type": "tinted", "shader": "tinted", "tint": [1, 0, 0, 0.5], "transparent": true }"#,
            &assets,
        )
        .unwrap();
        assert!(tinted.is_transparent());
        assert!(matches!(&tinted, Material::Tinted(t) if t.tint == Vec4::new(1.0, 0.0, 0.0, 0.5)));

        let base = Material::from_json(r#"{ "type": "mystery", "shader": "tinted" }"#, &assets).unwrap();
        assert!(matches!(base, Material::Base(_)));
    }

    #[test]
    fn missing_shader_is_an_error() {
        let err = Material::from_json(r#"{ "type": "tinted", "shader": "nope" }"#, &registry()).unwrap_err();
        assert!(matches!(err, EngineError::UnknownAsset { kind: "shader", .. }));
    }

    #[test]
    fn textured_setup_binds_unit_zero() {
        let assets = registry();
        let material = Material::from_json(
            r#"{ "type": "textured", "shader": "tinted", "texture": "bricks", "sampler": "default", "alphaThreshold": 0.3 }"#,
            &assets,
        )
        .unwrap();

        let mut backend = RecordingBackend::new();
        material.setup(&mut backend);
        assert_eq!(backend.uniform("tex"), Some(UniformValue::Int(0)));
        assert_eq!(backend.uniform("alphaThreshold"), Some(UniformValue::Float(0.3)));
        assert_eq!(backend.uniform("tint"), Some(UniformValue::Vec4(Vec4::ONE)));
    }

    #[test]
    fn lit_setup_flags_present_maps() {
        let assets = registry();
        let material = Material::from_json(
            r#"{ "type": "lit", "shader": "lit", "albedo_map": "bricks", "roughness": 0.8 }"#,
            &assets,
        )
        .unwrap();

        let mut backend = RecordingBackend::new();
        material.setup(&mut backend);
        assert_eq!(backend.uniform("material.use_albedo_map"), Some(UniformValue::Int(1)));
        assert_eq!(backend.uniform("material.use_emissive_map"), Some(UniformValue::Int(0)));
        assert_eq!(backend.uniform("material.emissive_map"), Some(UniformValue::Int(4)));
        assert_eq!(backend.uniform("material.roughness"), Some(UniformValue::Float(0.8)));
        assert_eq!(backend.uniform("material.specular"), Some(UniformValue::Vec3(Vec3::splat(0.5))));
    }
}
