use glam::Vec3;
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};

/// Primitive requested by a collider descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    #[default]
    Box,
    Sphere,
    Capsule,
    Cylinder,
    Mesh,
    #[serde(rename = "convex")]
    ConvexHull,
}

impl ShapeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "box" => Some(Self::Box),
            "sphere" => Some(Self::Sphere),
            "capsule" => Some(Self::Capsule),
            "cylinder" => Some(Self::Cylinder),
            "mesh" => Some(Self::Mesh),
            "convex" | "convex_hull" => Some(Self::ConvexHull),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ShapeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name).unwrap_or_else(|| {
            warn!("Unknown collider shape '{name}', using box");
            Self::Box
        }))
    }
}

/// Collider component data as authored in scene files.
///
/// `size` is interpreted per shape: full box extents, sphere radius in `x`,
/// capsule radius/height in `x`/`y`, cylinder radius/full height in `x`/`y`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColliderDesc {
    pub shape: ShapeKind,
    pub size: Vec3,
    pub mass: f32,
    pub friction: f32,
    pub restitution: f32,
    pub is_trigger: bool,
    pub center_offset: Vec3,
    /// Name of the render mesh used by mesh and convex colliders. Empty means none.
    pub mesh: String,
}

impl Default for ColliderDesc {
    fn default() -> Self {
        Self {
            shape: ShapeKind::Box,
            size: Vec3::ONE,
            mass: 0.0,
            friction: 0.5,
            restitution: 0.0,
            is_trigger: false,
            center_offset: Vec3::ZERO,
            mesh: String::new(),
        }
    }
}

impl ColliderDesc {
    pub fn new(shape: ShapeKind, size: Vec3) -> Self {
        Self {
            shape,
            size,
            ..Self::default()
        }
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.center_offset = offset;
        self
    }

    pub fn with_mesh(mut self, mesh: impl Into<String>) -> Self {
        self.mesh = mesh.into();
        self
    }

    pub fn trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    /// Dynamic, non-trigger colliders get the upright character policy.
    pub fn is_character(&self) -> bool {
        self.mass > 0.0 && !self.is_trigger
    }

    /// Static meshes are baked in world space and keep an identity body transform.
    pub fn bakes_world_transform(&self) -> bool {
        self.shape == ShapeKind::Mesh && self.mass == 0.0
    }

    pub fn mesh_name(&self) -> Option<&str> {
        if self.mesh.is_empty() {
            None
        } else {
            Some(&self.mesh)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let desc: ColliderDesc = serde_json::from_str("{}").unwrap();
        assert_eq!(desc, ColliderDesc::default());
    }

    #[test]
    fn parses_authored_collider() {
        let desc: ColliderDesc = serde_json::from_str(
            r#"{
                "shape": "capsule",
                "size": [0.4, 1.6, 0.4],
                "mass": 70.0,
                "isTrigger": false,
                "centerOffset": [0.0, 0.9, 0.0]
            }"#,
        )
        .unwrap();
        assert_eq!(desc.shape, ShapeKind::Capsule);
        assert_eq!(desc.center_offset, Vec3::new(0.0, 0.9, 0.0));
        assert!(desc.is_character());
        assert!(!desc.bakes_world_transform());
    }

    #[test]
    fn unknown_shape_falls_back_to_box() {
        let desc: ColliderDesc = serde_json::from_str(r#"{ "shape": "torus" }"#).unwrap();
        assert_eq!(desc.shape, ShapeKind::Box);
    }

    #[test]
    fn static_mesh_bakes_transform() {
        let desc = ColliderDesc::new(ShapeKind::Mesh, Vec3::ONE).with_mesh("level");
        assert!(desc.bakes_world_transform());
        assert_eq!(desc.mesh_name(), Some("level"));
    }
}
