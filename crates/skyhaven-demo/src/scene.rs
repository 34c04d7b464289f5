//! Scene descriptor and per-frame transform evaluation.
//!
//! A scene is a flat list of model instances. Each entry has a fixed base
//! transform and bobs vertically by `bob * cos(elapsed)`.

use std::path::{Path, PathBuf};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use skyhaven_engine::render::ShaderVariant;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("failed to read scene `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scene `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Order of the rotation and scale factors after the translation.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOrder {
    /// `T · R · S`
    #[default]
    RotateThenScale,
    /// `T · S · R`
    ScaleThenRotate,
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Shading {
    #[default]
    Lit,
    Blended,
}

impl From<Shading> for ShaderVariant {
    fn from(s: Shading) -> Self {
        match s {
            Shading::Lit => ShaderVariant::Lit,
            Shading::Blended => ShaderVariant::Blended,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Scale {
    Uniform(f32),
    Axes([f32; 3]),
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

impl Scale {
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(s),
            Scale::Axes(a) => Vec3::from_array(a),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct Rotation {
    pub axis: [f32; 3],
    pub degrees: f32,
}

impl Rotation {
    pub const fn new(axis: [f32; 3], degrees: f32) -> Self {
        Self { axis, degrees }
    }

    fn to_quat(self) -> Quat {
        let axis = Vec3::from_array(self.axis).normalize_or_zero();
        if axis == Vec3::ZERO {
            return Quat::IDENTITY;
        }
        Quat::from_axis_angle(axis, self.degrees.to_radians())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BaseTransform {
    pub translation: [f32; 3],
    pub scale: Scale,
    /// Applied left to right, like successive `rotate` calls.
    pub rotations: Vec<Rotation>,
    pub order: TransformOrder,
}

impl BaseTransform {
    /// Model matrix with `lift` added to the vertical translation.
    pub fn matrix(&self, lift: f32) -> Mat4 {
        let translation = Vec3::from_array(self.translation) + Vec3::new(0.0, lift, 0.0);
        let t = Mat4::from_translation(translation);
        let r = self
            .rotations
            .iter()
            .fold(Mat4::IDENTITY, |acc, rot| acc * Mat4::from_quat(rot.to_quat()));
        let s = Mat4::from_scale(self.scale.to_vec3());

        match self.order {
            TransformOrder::RotateThenScale => t * r * s,
            TransformOrder::ScaleThenRotate => t * s * r,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SceneEntry {
    pub model: PathBuf,
    #[serde(default)]
    pub transform: BaseTransform,
    #[serde(default)]
    pub shading: Shading,
    /// Amplitude of the vertical `cos(t)` bob.
    #[serde(default)]
    pub bob: f32,
}

impl SceneEntry {
    pub fn world(&self, elapsed: f32) -> Mat4 {
        self.transform.matrix(self.bob * elapsed.cos())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SceneDescriptor {
    #[serde(default, rename = "entry")]
    pub entries: Vec<SceneEntry>,
}

impl SceneDescriptor {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, SceneError> {
        toml::from_str(text).map_err(|source| SceneError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads `path`; falls back to [`SceneDescriptor::floating_islands`] when
    /// the file is absent or cannot be parsed.
    pub fn load_or_builtin(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no scene file at {}, using built-in scene", path.display());
                return Self::floating_islands();
            }
            Err(source) => {
                let e = SceneError::Read { path: path.to_path_buf(), source };
                log::error!("{e}; using built-in scene");
                return Self::floating_islands();
            }
        };

        match Self::from_toml(path, &text) {
            Ok(scene) => {
                log::info!("loaded {} scene entries from {}", scene.entries.len(), path.display());
                scene
            }
            Err(e) => {
                log::error!("{e}; using built-in scene");
                Self::floating_islands()
            }
        }
    }

    /// Distinct model paths in first-use order.
    pub fn model_paths(&self) -> Vec<&Path> {
        let mut out: Vec<&Path> = Vec::new();
        for entry in &self.entries {
            if !out.contains(&entry.model.as_path()) {
                out.push(&entry.model);
            }
        }
        out
    }

    /// The hand-placed floating-islands layout.
    pub fn floating_islands() -> Self {
        use Shading::{Blended, Lit};
        use TransformOrder::{RotateThenScale as Trs, ScaleThenRotate as Tsr};

        const X: [f32; 3] = [1.0, 0.0, 0.0];
        const Y: [f32; 3] = [0.0, 1.0, 0.0];

        let model = |name: &str| PathBuf::from(format!("resources/objects/{name}/scene.gltf"));
        let entry = |name: &str,
                     translation: [f32; 3],
                     scale: f32,
                     rotations: &[Rotation],
                     order: TransformOrder,
                     shading: Shading,
                     bob: f32| SceneEntry {
            model: model(name),
            transform: BaseTransform {
                translation,
                scale: Scale::Uniform(scale),
                rotations: rotations.to_vec(),
                order,
            },
            shading,
            bob,
        };

        let entries = vec![
            entry("floating_island(1)", [68.0, -11.0, 20.0], 0.1, &[Rotation::new(Y, 45.0)], Tsr, Lit, 0.4),
            entry("floating_island(1)", [86.0, -15.0, 32.0], 0.08, &[], Trs, Lit, 0.2),
            entry("airman", [73.0, -8.6, 24.0], 0.1, &[], Trs, Lit, 0.4),
            entry("base_island", [70.0, -15.0, 40.0], 0.9, &[], Trs, Lit, 0.1),
            entry("steampunk_lighthouse", [67.3, -14.0, 40.8], 0.01, &[Rotation::new(X, -90.0)], Trs, Lit, 0.1),
            entry("da_vincis_-_flying_machine", [67.0, -9.0, 34.3], 0.27, &[Rotation::new(Y, 180.0)], Trs, Lit, 1.4),
            entry("flying_lighthouse", [86.2, -13.8, 40.0], 0.03, &[Rotation::new(X, 90.0)], Trs, Lit, 0.2),
            entry("platano_tree", [89.0, -13.5, 32.0], 0.008, &[Rotation::new(Y, 90.0)], Tsr, Lit, 0.2),
            entry(
                "mill-wind",
                [73.0, -10.5, 45.0],
                0.4,
                &[Rotation::new(Y, 180.0), Rotation::new(X, -90.0)],
                Tsr,
                Lit,
                0.1,
            ),
            entry("trees_low_poly", [75.5, -13.2, 46.0], 0.03, &[Rotation::new(X, -90.0)], Trs, Lit, 0.1),
            entry("trees_low_poly", [72.2, -13.5, 48.5], 0.025, &[Rotation::new(X, -90.0)], Trs, Lit, 0.1),
            entry("trees_low_poly", [69.4, -13.2, 45.2], 0.03, &[Rotation::new(X, -90.0)], Trs, Blended, 0.1),
            entry("platano_tree", [74.0, -13.2, 47.4], 0.008, &[Rotation::new(Y, 90.0)], Trs, Lit, 0.1),
            entry("trees_low_poly", [69.0, -9.8, 14.2], 0.04, &[Rotation::new(X, -90.0)], Trs, Lit, 0.4),
            entry("platano_tree", [87.5, -13.5, 31.0], 0.005, &[Rotation::new(Y, 90.0)], Tsr, Lit, 0.2),
            entry("trees_low_poly", [87.5, -13.9, 32.0], 0.02, &[Rotation::new(X, -90.0)], Trs, Lit, 0.2),
            entry("appa_bison_4", [69.0, -8.4, 20.0], 2.0, &[Rotation::new(X, -90.0)], Trs, Lit, 0.4),
            entry("low_poly_tree_scene_free", [63.7, -13.4, 35.0], 0.2, &[Rotation::new(X, 90.0)], Trs, Lit, 0.1),
        ];

        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    fn bare(bob: f32) -> SceneEntry {
        SceneEntry {
            model: PathBuf::from("m.obj"),
            transform: BaseTransform {
                translation: [1.0, 2.0, 3.0],
                ..BaseTransform::default()
            },
            shading: Shading::Lit,
            bob,
        }
    }

    // ── transform evaluator ───────────────────────────────────────────────

    #[test]
    fn bob_follows_cosine_of_elapsed() {
        let e = bare(0.5);

        let at_zero = e.world(0.0).w_axis;
        assert_relative_eq!(at_zero.y, 2.5, epsilon = 1e-6);

        let at_pi = e.world(PI).w_axis;
        assert_relative_eq!(at_pi.y, 1.5, epsilon = 1e-6);

        // x/z never move
        assert_relative_eq!(at_pi.x, 1.0);
        assert_relative_eq!(at_pi.z, 3.0);
    }

    #[test]
    fn zero_amplitude_is_static() {
        let e = bare(0.0);
        assert_eq!(e.world(0.0), e.world(1.234));
    }

    #[test]
    fn order_changes_result_for_nonuniform_scale() {
        let mut t = BaseTransform {
            scale: Scale::Axes([2.0, 1.0, 1.0]),
            rotations: vec![Rotation::new([0.0, 0.0, 1.0], 90.0)],
            ..BaseTransform::default()
        };

        // T·R·S: scale x first, then rotate x onto y
        let trs = t.matrix(0.0).transform_vector3(Vec3::X);
        assert!(trs.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-5));

        // T·S·R: rotate x onto y, then y is not scaled
        t.order = TransformOrder::ScaleThenRotate;
        let tsr = t.matrix(0.0).transform_vector3(Vec3::X);
        assert!(tsr.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn rotations_compose_in_listed_order() {
        let t = BaseTransform {
            rotations: vec![
                Rotation::new([0.0, 1.0, 0.0], 90.0),
                Rotation::new([1.0, 0.0, 0.0], -90.0),
            ],
            ..BaseTransform::default()
        };
        let expected = Mat4::from_rotation_y(PI / 2.0) * Mat4::from_rotation_x(-PI / 2.0);
        assert!(t.matrix(0.0).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn zero_axis_rotation_is_identity() {
        let t = BaseTransform {
            rotations: vec![Rotation::new([0.0; 3], 45.0)],
            ..BaseTransform::default()
        };
        assert_eq!(t.matrix(0.0), Mat4::IDENTITY);
    }

    // ── descriptor ────────────────────────────────────────────────────────

    #[test]
    fn builtin_scene_layout() {
        let scene = SceneDescriptor::floating_islands();
        assert_eq!(scene.entries.len(), 18);

        let blended: Vec<_> = scene.entries.iter().filter(|e| e.shading == Shading::Blended).collect();
        assert_eq!(blended.len(), 1);

        let paths = scene.model_paths();
        assert_eq!(paths.len(), 11);
        assert!(paths[0].ends_with("floating_island(1)/scene.gltf"));
        assert!(paths.iter().all(|p| p.extension().is_some_and(|e| e == "gltf")));
        assert!(paths.iter().any(|p| p.ends_with("mill-wind/scene.gltf")));
    }

    #[test]
    fn toml_entry_defaults() {
        let text = r#"
            [[entry]]
            model = "a.obj"

            [[entry]]
            model = "b.obj"
            shading = "blended"
            bob = 0.25
            [entry.transform]
            translation = [1.0, 2.0, 3.0]
            scale = [1.0, 2.0, 3.0]
            order = "scale_then_rotate"
            rotations = [{ axis = [0.0, 1.0, 0.0], degrees = 45.0 }]
        "#;
        let scene = SceneDescriptor::from_toml(Path::new("mem"), text).unwrap();

        let a = &scene.entries[0];
        assert_eq!(a.transform, BaseTransform::default());
        assert_eq!(a.shading, Shading::Lit);
        assert_eq!(a.bob, 0.0);

        let b = &scene.entries[1];
        assert_eq!(b.shading, Shading::Blended);
        assert_eq!(b.transform.scale, Scale::Axes([1.0, 2.0, 3.0]));
        assert_eq!(b.transform.order, TransformOrder::ScaleThenRotate);
        assert_eq!(b.transform.rotations.len(), 1);
    }

    #[test]
    fn missing_model_key_is_an_error() {
        let err = SceneDescriptor::from_toml(Path::new("s.toml"), "[[entry]]\nbob = 1.0\n");
        assert!(matches!(err, Err(SceneError::Parse { .. })));
    }

    #[test]
    fn malformed_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.toml");
        std::fs::write(&path, "[[entry]\n").unwrap();

        assert_eq!(SceneDescriptor::load_or_builtin(&path), SceneDescriptor::floating_islands());
    }

    #[test]
    fn shipped_scene_file_matches_builtin() {
        let shipped =
            SceneDescriptor::from_toml(Path::new("scene.toml"), include_str!("../resources/scene.toml"))
                .unwrap();
        let builtin = SceneDescriptor::floating_islands();

        assert_eq!(shipped.entries.len(), builtin.entries.len());
        for (s, b) in shipped.entries.iter().zip(&builtin.entries) {
            assert_eq!(s.model, b.model);
            assert_eq!(s.shading, b.shading);
            assert!(s.world(0.7).abs_diff_eq(b.world(0.7), 1e-4), "{}", s.model.display());
        }
    }
}
