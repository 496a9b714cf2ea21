use ash::vk;
use glam::Vec4;
use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceCulling {
    pub enabled: bool,
    #[serde(with = "gl_names::cull_mode")]
    pub culled_face: vk::CullModeFlags,
    #[serde(with = "gl_names::front_face")]
    pub front_face: vk::FrontFace,
}

impl Default for FaceCulling {
    fn default() -> Self {
        Self {
            enabled: false,
            culled_face: vk::CullModeFlags::BACK,
            front_face: vk::FrontFace::COUNTER_CLOCKWISE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DepthTesting {
    pub enabled: bool,
    #[serde(with = "gl_names::compare_op")]
    pub function: vk::CompareOp,
}

impl Default for DepthTesting {
    fn default() -> Self {
        Self {
            enabled: false,
            function: vk::CompareOp::LESS_OR_EQUAL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Blending {
    pub enabled: bool,
    #[serde(with = "gl_names::blend_op")]
    pub equation: vk::BlendOp,
    #[serde(with = "gl_names::blend_factor")]
    pub source_factor: vk::BlendFactor,
    #[serde(with = "gl_names::blend_factor")]
    pub destination_factor: vk::BlendFactor,
    pub constant_color: Vec4,
}

impl Default for Blending {
    fn default() -> Self {
        Self {
            enabled: false,
            equation: vk::BlendOp::ADD,
            source_factor: vk::BlendFactor::SRC_ALPHA,
            destination_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
            constant_color: Vec4::ZERO,
        }
    }
}

impl Blending {
    /// Standard "over" alpha blending.
    pub fn alpha() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Fixed-function state applied before a draw.
///
/// Field names and enum spellings in JSON follow the scene files
/// (`"function": "GL_LEQUAL"`, `"culledFace": "GL_FRONT"`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PipelineState {
    pub face_culling: FaceCulling,
    pub depth_testing: DepthTesting,
    pub blending: Blending,
    pub color_mask: [bool; 4],
    pub depth_mask: bool,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            face_culling: FaceCulling::default(),
            depth_testing: DepthTesting::default(),
            blending: Blending::default(),
            color_mask: [true; 4],
            depth_mask: true,
        }
    }
}

impl PipelineState {
    pub fn from_json(source: &str) -> Result<Self> {
        Ok(serde_json::from_str(source)?)
    }

    /// Drawn from inside: depth test `LESS_OR_EQUAL` without writes, front faces culled.
    pub fn sky() -> Self {
        Self {
            face_culling: FaceCulling {
                enabled: true,
                culled_face: vk::CullModeFlags::FRONT,
                ..FaceCulling::default()
            },
            depth_testing: DepthTesting {
                enabled: true,
                function: vk::CompareOp::LESS_OR_EQUAL,
            },
            blending: Blending::default(),
            depth_mask: false,
            ..Self::default()
        }
    }

    /// This state with alpha blending on, depth testing on and depth writes off.
    pub fn for_transparent_pass(&self) -> Self {
        Self {
            blending: Blending {
                enabled: true,
                source_factor: vk::BlendFactor::SRC_ALPHA,
                destination_factor: vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
                ..self.blending.clone()
            },
            depth_testing: DepthTesting {
                enabled: true,
                ..self.depth_testing.clone()
            },
            depth_mask: false,
            ..self.clone()
        }
    }
}

/// Serde adapters between GL enum spellings and `vk` values.
mod gl_names {
    macro_rules! gl_enum {
        ($module:ident, $ty:ty, $( $name:literal => $value:expr ),+ $(,)?) => {
            pub mod $module {
                use ash::vk;
                use serde::{de::Error, Deserialize, Deserializer, Serializer};

                pub fn serialize<S: Serializer>(value: &$ty, serializer: S) -> Result<S::Ok, S::Error> {
                    $( if *value == $value { return serializer.serialize_str($name); } )+
                    Err(serde::ser::Error::custom(format!("no GL name for {value:?}")))
                }

                pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<$ty, D::Error> {
                    let name = String::deserialize(deserializer)?;
                    match name.as_str() {
                        $( $name => Ok($value), )+
                        other => Err(D::Error::custom(format!("unknown GL constant {other}"))),
                    }
                }
            }
        };
    }

    gl_enum!(compare_op, vk::CompareOp,
        "GL_NEVER" => vk::CompareOp::NEVER,
        "GL_LESS" => vk::CompareOp::LESS,
        "GL_EQUAL" => vk::CompareOp::EQUAL,
        "GL_LEQUAL" => vk::CompareOp::LESS_OR_EQUAL,
        "GL_GREATER" => vk::CompareOp::GREATER,
        "GL_NOTEQUAL" => vk::CompareOp::NOT_EQUAL,
        "GL_GEQUAL" => vk::CompareOp::GREATER_OR_EQUAL,
        "GL_ALWAYS" => vk::CompareOp::ALWAYS,
    );

    gl_enum!(cull_mode, vk::CullModeFlags,
        "GL_FRONT" => vk::CullModeFlags::FRONT,
        "GL_BACK" => vk::CullModeFlags::BACK,
        "GL_FRONT_AND_BACK" => vk::CullModeFlags::FRONT_AND_BACK,
    );

    gl_enum!(front_face, vk::FrontFace,
        "GL_CCW" => vk::FrontFace::COUNTER_CLOCKWISE,
        "GL_CW" => vk::FrontFace::CLOCKWISE,
    );

    gl_enum!(blend_op, vk::BlendOp,
        "GL_FUNC_ADD" => vk::BlendOp::ADD,
        "GL_FUNC_SUBTRACT" => vk::BlendOp::SUBTRACT,
        "GL_FUNC_REVERSE_SUBTRACT" => vk::BlendOp::REVERSE_SUBTRACT,
        "GL_MIN" => vk::BlendOp::MIN,
        "GL_MAX" => vk::BlendOp::MAX,
    );

    gl_enum!(blend_factor, vk::BlendFactor,
        "GL_ZERO" => vk::BlendFactor::ZERO,
        "GL_ONE" => vk::BlendFactor::ONE,
        "GL_SRC_COLOR" => vk::BlendFactor::SRC_COLOR,
        "GL_ONE_MINUS_SRC_COLOR" => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        "GL_DST_COLOR" => vk::BlendFactor::DST_COLOR,
        "GL_ONE_MINUS_DST_COLOR" => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        "GL_SRC_ALPHA" => vk::BlendFactor::SRC_ALPHA,
        "GL_ONE_MINUS_SRC_ALPHA" => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        "GL_DST_ALPHA" => vk::BlendFactor::DST_ALPHA,
        "GL_ONE_MINUS_DST_ALPHA" => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        "GL_CONSTANT_COLOR" => vk::BlendFactor::CONSTANT_COLOR,
        "GL_ONE_MINUS_CONSTANT_COLOR" => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        "GL_CONSTANT_ALPHA" => vk::BlendFactor::CONSTANT_ALPHA,
        "GL_ONE_MINUS_CONSTANT_ALPHA" => vk::BlendFactor::ONE_MINUS_CONSTANT_ALPHA,
    );
}
