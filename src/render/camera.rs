use glam::{Mat4, UVec2, Vec3, Vec4};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    #[default]
    Perspective,
    Orthographic,
}

/// Camera attached to an entity; it looks down the owner's local -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Camera {
    pub camera_type: CameraType,
    pub near: f32,
    pub far: f32,
    /// Vertical field of view in radians; degrees in JSON.
    #[serde(rename = "fovY", deserialize_with = "degrees_to_radians")]
    pub fov_y: f32,
    pub ortho_height: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            camera_type: CameraType::Perspective,
            near: 0.01,
            far: 100.0,
            fov_y: 90f32.to_radians(),
            ortho_height: 1.0,
        }
    }
}

fn degrees_to_radians<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
    Ok(f32::deserialize(deserializer)?.to_radians())
}

impl Camera {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// View matrix for a camera whose owner has world matrix `world`.
    pub fn view_matrix(world: &Mat4) -> Mat4 {
        let eye = world.transform_point3(Vec3::ZERO);
        let center = world.transform_point3(Vec3::NEG_Z);
        let up = world.transform_vector3(Vec3::Y).normalize_or(Vec3::Y);
        Mat4::look_at_rh(eye, center, up)
    }

    /// Normalized world-space view direction.
    pub fn forward(world: &Mat4) -> Vec3 {
        (*world * Vec4::new(0.0, 0.0, -1.0, 0.0))
            .truncate()
            .normalize_or(Vec3::NEG_Z)
    }

    pub fn position(world: &Mat4) -> Vec3 {
        world.transform_point3(Vec3::ZERO)
    }

    /// Projection for a viewport; aspect falls back to 1 when the height is zero.
    pub fn projection_matrix(&self, viewport: UVec2) -> Mat4 {
        let aspect = if viewport.y != 0 {
            viewport.x as f32 / viewport.y as f32
        } else {
            1.0
        };
        match self.camera_type {
            CameraType::Orthographic => {
                let half_height = self.ortho_height * 0.5;
                let half_width = half_height * aspect;
                Mat4::orthographic_rh_gl(
                    -half_width,
                    half_width,
                    -half_height,
                    half_height,
                    self.near,
                    self.far,
                )
            }
            CameraType::Perspective => Mat4::perspective_rh_gl(self.fov_y, aspect, self.near, self.far),
        }
    }
}
