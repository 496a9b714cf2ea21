use std::{collections::HashMap, sync::Arc};

use log::debug;
use parking_lot::RwLock;

use crate::{
    error::Result,
    render::{
        backend::{SamplerId, ShaderId, TextureId},
        material::Material,
        mesh::Mesh,
    },
};

/// Name-based lookup of loaded assets.
pub trait AssetResolver {
    fn mesh(&self, name: &str) -> Option<Arc<Mesh>>;
    fn material(&self, name: &str) -> Option<Arc<Material>>;
    fn texture(&self, name: &str) -> Option<TextureId>;
    fn sampler(&self, name: &str) -> Option<SamplerId>;
    fn shader(&self, name: &str) -> Option<ShaderId>;
}

/// Thread-safe asset tables keyed by name.
#[derive(Debug, Default)]
pub struct AssetRegistry {
    meshes: RwLock<HashMap<String, Arc<Mesh>>>,
    materials: RwLock<HashMap<String, Arc<Material>>>,
    textures: RwLock<HashMap<String, TextureId>>,
    samplers: RwLock<HashMap<String, SamplerId>>,
    shaders: RwLock<HashMap<String, ShaderId>>,
}

impl AssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_mesh(&self, name: impl Into<String>, mesh: Mesh) -> Arc<Mesh> {
        let mesh = Arc::new(mesh);
        self.meshes.write().insert(name.into(), Arc::clone(&mesh));
        mesh
    }

    pub fn insert_material(&self, name: impl Into<String>, material: Material) -> Arc<Material> {
        let material = Arc::new(material);
        self.materials.write().insert(name.into(), Arc::clone(&material));
        material
    }

    pub fn insert_texture(&self, name: impl Into<String>, texture: TextureId) {
        self.textures.write().insert(name.into(), texture);
    }

    pub fn insert_sampler(&self, name: impl Into<String>, sampler: SamplerId) {
        self.samplers.write().insert(name.into(), sampler);
    }

    pub fn insert_shader(&self, name: impl Into<String>, shader: ShaderId) {
        self.shaders.write().insert(name.into(), shader);
    }

    /// Parses a material description and registers it under `name`.
    pub fn load_material(&self, name: impl Into<String>, source: &str) -> Result<Arc<Material>> {
        let name = name.into();
        let material = Material::from_json(source, self)?;
        debug!("Loaded material '{name}'");
        Ok(self.insert_material(name, material))
    }

    pub fn clear(&self) {
        self.meshes.write().clear();
        self.materials.write().clear();
        self.textures.write().clear();
        self.samplers.write().clear();
        self.shaders.write().clear();
    }
}

impl AssetResolver for AssetRegistry {
    fn mesh(&self, name: &str) -> Option<Arc<Mesh>> {
        self.meshes.read().get(name).cloned()
    }

    fn material(&self, name: &str) -> Option<Arc<Material>> {
        self.materials.read().get(name).cloned()
    }

    fn texture(&self, name: &str) -> Option<TextureId> {
        self.textures.read().get(name).copied()
    }

    fn sampler(&self, name: &str) -> Option<SamplerId> {
        self.samplers.read().get(name).copied()
    }

    fn shader(&self, name: &str) -> Option<ShaderId> {
        self.shaders.read().get(name).copied()
    }
}
