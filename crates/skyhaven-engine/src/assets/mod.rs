//! Asset loading: OBJ and glTF models, 2D textures and cubemaps.
//!
//! Loading is split into a CPU half (decode files into plain data, no GPU
//! needed) and an upload half that creates wgpu resources. Failures are
//! reported as [`AssetError`]; callers decide whether to skip or substitute.

mod error;
mod gltf_loader;
pub mod model;
pub mod texture;

pub use error::AssetError;
pub use model::{load_model, MaterialData, MeshData, ModelData, TextureSource};
pub use texture::{load_cubemap, load_image, ColorSpace, CubemapData, ImageData, Texture};
