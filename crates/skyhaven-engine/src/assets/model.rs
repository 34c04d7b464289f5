use std::path::{Path, PathBuf};

use crate::render::MeshVertex;

use super::{AssetError, ImageData};

/// Where a material's texture comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum TextureSource {
    /// Image file, resolved against the model's directory. Decoded at upload.
    File(PathBuf),
    /// Pixels already decoded by the model importer (glTF images).
    Decoded(ImageData),
}

impl TextureSource {
    pub fn path(&self) -> Option<&Path> {
        match self {
            TextureSource::File(path) => Some(path),
            TextureSource::Decoded(_) => None,
        }
    }
}

/// Texture references of one material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub diffuse: Option<TextureSource>,
    pub specular: Option<TextureSource>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    /// Index into [`ModelData::materials`].
    pub material: Option<usize>,
}

/// CPU-side model: triangulated meshes plus their materials.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelData {
    pub path: PathBuf,
    pub meshes: Vec<MeshData>,
    pub materials: Vec<MaterialData>,
}

impl ModelData {
    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.indices.len() / 3).sum()
    }
}

/// Loads a model, picking the importer from the file extension.
///
/// `.gltf` and `.glb` go through the glTF importer; anything else is read as
/// OBJ.
pub fn load_model(path: &Path) -> Result<ModelData, AssetError> {
    let is_gltf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gltf") || ext.eq_ignore_ascii_case("glb"));

    if is_gltf { super::gltf_loader::load_gltf(path) } else { load_obj(path) }
}

/// Loads an OBJ file (and its MTL library, if any).
///
/// A missing or broken material library is not fatal: the meshes load with
/// no material and get fallback textures at upload.
pub fn load_obj(path: &Path) -> Result<ModelData, AssetError> {
    let options = tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ..Default::default()
    };

    let (models, materials) = tobj::load_obj(path, &options).map_err(|source| AssetError::Model {
        path: path.to_path_buf(),
        source,
    })?;

    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let materials = match materials {
        Ok(materials) => materials
            .into_iter()
            .map(|m| MaterialData {
                name: m.name,
                diffuse: m.diffuse_texture.map(|t| TextureSource::File(resolve_texture(base_dir, &t))),
                specular: m.specular_texture.map(|t| TextureSource::File(resolve_texture(base_dir, &t))),
            })
            .collect(),
        Err(e) => {
            log::warn!("material library for {} not loaded: {e}", path.display());
            Vec::new()
        }
    };

    let meshes: Vec<MeshData> = models
        .into_iter()
        .map(|m| {
            let material = m.mesh.material_id.filter(|&id| id < materials.len());
            MeshData {
                name: m.name,
                vertices: interleave(&m.mesh),
                indices: m.mesh.indices,
                material,
            }
        })
        .filter(|m| !m.indices.is_empty())
        .collect();

    if meshes.is_empty() {
        return Err(AssetError::EmptyModel { path: path.to_path_buf() });
    }

    Ok(ModelData {
        path: path.to_path_buf(),
        meshes,
        materials,
    })
}

fn resolve_texture(base_dir: &Path, name: &str) -> PathBuf {
    // MTL files written on Windows often use backslashes.
    base_dir.join(name.replace('\\', "/"))
}

/// Builds interleaved vertices; missing normals default to +Y and missing
/// texture coordinates to (0, 0). V is flipped to a top-left texture origin.
fn interleave(mesh: &tobj::Mesh) -> Vec<MeshVertex> {
    let count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == mesh.positions.len();
    let has_uvs = mesh.texcoords.len() / 2 == count;

    (0..count)
        .map(|i| {
            let position = [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ];
            let normal = if has_normals {
                [mesh.normals[3 * i], mesh.normals[3 * i + 1], mesh.normals[3 * i + 2]]
            } else {
                [0.0, 1.0, 0.0]
            };
            let uv = if has_uvs {
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0, 0.0]
            };
            MeshVertex { position, normal, uv }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl grass
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    const QUAD_MTL: &str = "\
newmtl grass
map_Kd textures\\grass.png
map_Ks grass_spec.png
";

    #[test]
    fn loads_triangulated_quad_with_material() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        fs::write(dir.path().join("quad.mtl"), QUAD_MTL).unwrap();

        let model = load_obj(&dir.path().join("quad.obj")).unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert_eq!(model.triangle_count(), 2);

        let mesh = &model.meshes[0];
        assert_eq!(mesh.material, Some(0));
        assert!(mesh.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));

        let material = &model.materials[0];
        let diffuse = material.diffuse.as_ref().and_then(TextureSource::path);
        let specular = material.specular.as_ref().and_then(TextureSource::path);
        assert_eq!(diffuse, Some(dir.path().join("textures/grass.png").as_path()));
        assert_eq!(specular, Some(dir.path().join("grass_spec.png").as_path()));
    }

    #[test]
    fn flips_v_coordinate() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();
        fs::write(dir.path().join("quad.mtl"), QUAD_MTL).unwrap();

        let model = load_obj(&dir.path().join("quad.obj")).unwrap();
        let origin = model.meshes[0]
            .vertices
            .iter()
            .find(|v| v.position == [0.0, 0.0, 0.0])
            .unwrap();
        assert_eq!(origin.uv, [0.0, 1.0]);
    }

    #[test]
    fn missing_material_library_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.obj"), QUAD_OBJ).unwrap();

        let model = load_obj(&dir.path().join("quad.obj")).unwrap();
        assert!(model.materials.is_empty());
        assert_eq!(model.meshes[0].material, None);
    }

    #[test]
    fn missing_file_is_model_error() {
        let err = load_obj(Path::new("nope/missing.obj")).unwrap_err();
        assert!(matches!(err, AssetError::Model { .. }));
    }

    #[test]
    fn load_model_reads_obj_by_default() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quad.OBJ"), QUAD_OBJ).unwrap();

        let model = load_model(&dir.path().join("quad.OBJ")).unwrap();
        assert_eq!(model.triangle_count(), 2);
    }

    #[test]
    fn load_model_routes_gltf_extension() {
        // Not valid glTF: the error type shows which importer ran.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.gltf");
        fs::write(&path, QUAD_OBJ).unwrap();

        let err = load_model(&path).unwrap_err();
        assert!(matches!(err, AssetError::Gltf { .. }));
    }

    #[test]
    fn file_without_faces_is_empty_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.obj");
        fs::write(&path, "v 0 0 0\nv 1 0 0\n").unwrap();

        let err = load_obj(&path).unwrap_err();
        assert!(matches!(err, AssetError::EmptyModel { .. }));
    }
}
