//! GPU rendering subsystem.
//!
//! Frame layout:
//! - lit meshes and the skybox render into the HDR target inside the scene
//!   pass opened by [`BloomCompositor::begin_scene_pass`]
//! - the compositor blurs and tone maps onto the surface
//! - the overlay quads and their text labels draw on top of the composited
//!   surface
//!
//! Each renderer owns its GPU resources (pipelines, buffers, bind groups).

pub mod bloom;
mod common;
mod ctx;
pub mod lit;
pub mod overlay;
pub mod skybox;
pub mod targets;
pub mod text;

pub use bloom::{BloomCompositor, BloomSettings};
pub use common::MeshVertex;
pub use ctx::{RenderCtx, RenderTarget, Viewport};
pub use lit::{GpuModel, LitFrame, LitInstance, LitRenderer, PointLight, ShaderVariant};
pub use overlay::{OverlayQuad, OverlayRenderer};
pub use skybox::SkyboxRenderer;
pub use targets::TargetError;
pub use text::{TextRenderer, TextRun};
