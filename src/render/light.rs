use glam::{Mat4, Vec3, Vec4};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LightType {
    /// Parallel rays; only the owner's orientation matters.
    #[default]
    Directional,
    Point,
    Spot,
}

/// Distance falloff `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Default for Attenuation {
    fn default() -> Self {
        Self {
            constant: 1.0,
            linear: 0.0,
            quadratic: 0.0,
        }
    }
}

impl Attenuation {
    pub fn factor(&self, distance: f32) -> f32 {
        let denominator = self.constant + self.linear * distance + self.quadratic * distance * distance;
        if denominator > 0.0 {
            1.0 / denominator
        } else {
            0.0
        }
    }
}

/// Light source attached to an entity; it shines down the owner's local -Z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Light {
    #[serde(rename = "lightType")]
    pub light_type: LightType,
    /// Linear colour times intensity; may exceed 1.
    pub color: Vec3,
    pub attenuation: Attenuation,
    /// Full-intensity cone half angle in radians; degrees in JSON.
    #[serde(deserialize_with = "degrees_to_radians")]
    pub inner_angle: f32,
    /// Cone half angle where the intensity reaches zero; degrees in JSON.
    #[serde(deserialize_with = "degrees_to_radians")]
    pub outer_angle: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            light_type: LightType::Directional,
            color: Vec3::ONE,
            attenuation: Attenuation::default(),
            inner_angle: 15f32.to_radians(),
            outer_angle: 25f32.to_radians(),
        }
    }
}

fn degrees_to_radians<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f32, D::Error> {
    Ok(f32::deserialize(deserializer)?.to_radians())
}

impl Light {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn position(world: &Mat4) -> Vec3 {
        world.transform_point3(Vec3::ZERO)
    }

    /// Normalized world-space direction the light shines in.
    pub fn direction(world: &Mat4) -> Vec3 {
        (*world * Vec4::new(0.0, 0.0, -1.0, 0.0))
            .truncate()
            .normalize_or(Vec3::NEG_Y)
    }

    /// Spot cone falloff for a point at `angle` radians off the light axis.
    ///
    /// 1 inside the inner cone, 0 outside the outer cone, linear in between.
    /// Non-spot lights always return 1.
    pub fn cone_factor(&self, angle: f32) -> f32 {
        if self.light_type != LightType::Spot {
            return 1.0;
        }
        if angle <= self.inner_angle {
            return 1.0;
        }
        let width = self.outer_angle - self.inner_angle;
        if width <= 0.0 {
            return 0.0;
        }
        (1.0 - (angle - self.inner_angle) / width).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Quat;

    #[test]
    fn json_angles_are_degrees() {
        let light = Light::from_json(
            r#"{
                "lightType": "spot",
                "color": [2.0, 1.0, 0.5],
                "attenuation": { "linear": 0.1, "quadratic": 0.01 },
                "inner_angle": 10,
                "outer_angle": 30
            }"#,
        )
        .unwrap();
        assert_eq!(light.light_type, LightType::Spot);
        assert_eq!(light.color, Vec3::new(2.0, 1.0, 0.5));
        assert_relative_eq!(light.attenuation.constant, 1.0);
        assert_relative_eq!(light.attenuation.quadratic, 0.01);
        assert_relative_eq!(light.inner_angle, 10f32.to_radians(), epsilon = 1e-6);
        assert_relative_eq!(light.outer_angle, 30f32.to_radians(), epsilon = 1e-6);
    }

    #[test]
    fn empty_json_is_white_directional() {
        let light = Light::from_json("{}").unwrap();
        assert_eq!(light, Light::default());
        assert_relative_eq!(light.outer_angle, 25f32.to_radians(), epsilon = 1e-6);
        assert!(Light::from_json(r#"{ "lightType": "area" }"#).is_err());
    }

    #[test]
    fn direction_follows_owner_rotation() {
        let world = Mat4::from_rotation_translation(
            Quat::from_rotation_x(-90f32.to_radians()),
            Vec3::new(0.0, 4.0, 0.0),
        );
        let direction = Light::direction(&world);
        assert_relative_eq!(direction.y, -1.0, epsilon = 1e-5);
        assert_eq!(Light::position(&world), Vec3::new(0.0, 4.0, 0.0));
    }

    #[test]
    fn spot_cone_fades_between_angles() {
        let spot = Light {
            light_type: LightType::Spot,
            inner_angle: 0.2,
            outer_angle: 0.4,
            ..Light::default()
        };
        assert_eq!(spot.cone_factor(0.1), 1.0);
        assert_relative_eq!(spot.cone_factor(0.3), 0.5, epsilon = 1e-5);
        assert_eq!(spot.cone_factor(0.5), 0.0);
        assert_eq!(Light::default().cone_factor(3.0), 1.0);

        let falloff = Attenuation {
            constant: 1.0,
            linear: 1.0,
            quadratic: 0.0,
        };
        assert_relative_eq!(falloff.factor(3.0), 0.25);
    }
}
