use std::path::PathBuf;

/// Failure to load or decode an asset file.
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to load model {}: {source}", path.display())]
    Model {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },

    #[error("failed to import glTF {}: {source}", path.display())]
    Gltf {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },

    #[error("model {} contains no triangles", path.display())]
    EmptyModel { path: PathBuf },

    #[error("cubemap face {} is {width}x{height}; faces must be square and {expected}x{expected}", path.display())]
    CubemapFace {
        path: PathBuf,
        width: u32,
        height: u32,
        expected: u32,
    },

    #[error("cubemap has no faces")]
    NoCubemapFaces,
}
