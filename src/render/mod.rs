//! Forward rendering: command extraction, ordering and the multi-pass drawer.

pub mod backend;
pub mod camera;
pub mod command;
pub mod forward;
pub mod light;
pub mod material;
pub mod mesh;
pub mod pipeline;
pub mod postprocess;
pub mod sort;

pub use backend::{
    BackendCommand, DrawRecord, MeshId, RecordingBackend, RenderBackend, RenderTargetId, SamplerDesc,
    SamplerId, ShaderId, TextureFormat, TextureId, UniformValue,
};
pub use camera::{Camera, CameraType};
pub use command::{ActiveCamera, FrameCommands, FrameLight, RenderCommand, RenderCommandExtractor};
pub use forward::{ForwardRenderer, FrameStats, RendererConfig, ShaderPaths};
pub use light::{Attenuation, Light, LightType};
pub use material::{BaseMaterial, LitMaterial, Material, TexturedMaterial, TintedMaterial};
pub use mesh::{Mesh, Submesh, Vertex};
pub use pipeline::{Blending, DepthTesting, FaceCulling, PipelineState};
pub use postprocess::PostProcessCompositor;
pub use sort::TransparencySorter;
