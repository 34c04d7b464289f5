use std::path::Path;

use gltf::image::Format;

use crate::render::MeshVertex;

use super::model::{MaterialData, MeshData, ModelData, TextureSource};
use super::{AssetError, ImageData};

/// Loads a glTF 2.0 model (`.gltf` with external or data-URI buffers, or `.glb`).
///
/// Every triangle primitive becomes one [`MeshData`]. Node transforms are not
/// applied: meshes come out in their own space and the scene entry places them.
/// Images are decoded by the importer and carried as [`TextureSource::Decoded`].
pub fn load_gltf(path: &Path) -> Result<ModelData, AssetError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let decoded: Vec<Option<ImageData>> = images
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let image = rgba8(data);
            if image.is_none() {
                log::warn!(
                    "{}: image {index} has unsupported format {:?}; using fallback texture",
                    path.display(),
                    data.format
                );
            }
            image
        })
        .collect();

    let texture = |info: Option<gltf::texture::Info<'_>>| -> Option<TextureSource> {
        let index = info?.texture().source().index();
        decoded.get(index)?.clone().map(TextureSource::Decoded)
    };

    let materials: Vec<MaterialData> = document
        .materials()
        .map(|m| {
            let spec_gloss = m.pbr_specular_glossiness();
            let diffuse = m
                .pbr_metallic_roughness()
                .base_color_texture()
                .or_else(|| spec_gloss.as_ref().and_then(|sg| sg.diffuse_texture()));
            MaterialData {
                name: m.name().unwrap_or_default().to_owned(),
                diffuse: texture(diffuse),
                specular: texture(spec_gloss.and_then(|sg| sg.specular_glossiness_texture())),
            }
        })
        .collect();

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        let mesh_name = mesh.name().unwrap_or_default();
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::debug!("{}: skipping {:?} primitive in {mesh_name:?}", path.display(), primitive.mode());
                continue;
            }

            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let Some(positions) = reader.read_positions() else { continue };
            let positions: Vec<[f32; 3]> = positions.collect();

            let normals: Vec<[f32; 3]> = reader.read_normals().map(|n| n.collect()).unwrap_or_default();
            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|t| t.into_f32().collect())
                .unwrap_or_default();

            let vertices = positions
                .iter()
                .enumerate()
                .map(|(i, &position)| MeshVertex {
                    position,
                    normal: normals.get(i).copied().unwrap_or([0.0, 1.0, 0.0]),
                    // glTF texture space is already top-left.
                    uv: uvs.get(i).copied().unwrap_or([0.0, 0.0]),
                })
                .collect();

            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().collect(),
                None => (0..positions.len() as u32).collect(),
            };

            meshes.push(MeshData {
                name: format!("{mesh_name}#{}", primitive.index()),
                vertices,
                indices,
                material: primitive.material().index().filter(|&i| i < materials.len()),
            });
        }
    }

    meshes.retain(|m| m.indices.len() >= 3);
    if meshes.is_empty() {
        return Err(AssetError::EmptyModel { path: path.to_path_buf() });
    }

    Ok(ModelData {
        path: path.to_path_buf(),
        meshes,
        materials,
    })
}

/// Expands an 8-bit importer image to RGBA8. Wider formats are not handled.
fn rgba8(data: &gltf::image::Data) -> Option<ImageData> {
    let rgba = match data.format {
        Format::R8G8B8A8 => data.pixels.clone(),
        Format::R8G8B8 => data.pixels.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect(),
        Format::R8G8 => data.pixels.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect(),
        Format::R8 => data.pixels.iter().flat_map(|&v| [v, v, v, 255]).collect(),
        _ => return None,
    };
    Some(ImageData {
        width: data.width,
        height: data.height,
        rgba,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    // One triangle (positions only, u16 indices) and a 1×1 red PNG, both as data URIs.
    const TRIANGLE_GLTF: &str = r#"{
  "asset": { "version": "2.0" },
  "scene": 0,
  "scenes": [{ "nodes": [0] }],
  "nodes": [{ "mesh": 0 }],
  "meshes": [{
    "name": "tri",
    "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }]
  }],
  "materials": [{
    "name": "red",
    "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } }
  }],
  "textures": [{ "source": 0 }],
  "images": [{
    "uri": "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR4nGP4z8DwHwAFAAH/iZk9HQAAAABJRU5ErkJggg=="
  }],
  "buffers": [{
    "byteLength": 44,
    "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
  }],
  "bufferViews": [
    { "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 },
    { "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }
  ],
  "accessors": [
    { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
      "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
    { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
  ]
}"#;

    fn write_triangle() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        fs::write(&path, TRIANGLE_GLTF).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_embedded_triangle() {
        let (_dir, path) = write_triangle();

        let model = load_gltf(&path).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 1);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        // no NORMAL / TEXCOORD_0 attributes
        assert_eq!(mesh.vertices[2].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[2].uv, [0.0, 0.0]);
        assert_eq!(mesh.material, Some(0));
    }

    #[test]
    fn base_color_texture_is_decoded() {
        let (_dir, path) = write_triangle();

        let model = load_gltf(&path).unwrap();
        let material = &model.materials[0];
        assert_eq!(material.name, "red");
        assert_eq!(material.specular, None);

        let Some(TextureSource::Decoded(image)) = &material.diffuse else {
            panic!("expected a decoded diffuse texture, got {:?}", material.diffuse);
        };
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.rgba, vec![255, 0, 0, 255]);
    }

    #[test]
    fn malformed_document_is_gltf_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.gltf");
        fs::write(&path, "{ not json").unwrap();

        let err = load_gltf(&path).unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
        assert!(err.to_string().contains("broken.gltf"));
    }

    #[test]
    fn expands_rgb_and_gray_to_rgba() {
        let rgb = gltf::image::Data {
            pixels: vec![1, 2, 3, 4, 5, 6],
            format: Format::R8G8B8,
            width: 2,
            height: 1,
        };
        assert_eq!(rgba8(&rgb).unwrap().rgba, vec![1, 2, 3, 255, 4, 5, 6, 255]);

        let gray_alpha = gltf::image::Data {
            pixels: vec![9, 128],
            format: Format::R8G8,
            width: 1,
            height: 1,
        };
        assert_eq!(rgba8(&gray_alpha).unwrap().rgba, vec![9, 9, 9, 128]);
    }

    #[test]
    fn wide_formats_are_rejected() {
        let wide = gltf::image::Data {
            pixels: vec![0; 8],
            format: Format::R16G16B16A16,
            width: 1,
            height: 1,
        };
        assert!(rgba8(&wide).is_none());
    }
}
