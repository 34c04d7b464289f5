//! Mutable demo state shared by controls, overlay and renderer.
//!
//! Ten values persist between runs in a plain text file, one per line:
//! clear color r g b, overlay flag (0/1), camera position x y z, camera
//! front x y z.

use std::path::{Path, PathBuf};

use glam::Vec3;
use skyhaven_engine::camera::Camera;
use skyhaven_engine::render::{BloomSettings, PointLight};

use crate::config::DemoConfig;

/// Number of persisted values.
pub const PERSISTED_FIELDS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("failed to read state file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write state file `{path}`: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct ProgramState {
    pub clear_color: Vec3,
    pub overlay_enabled: bool,
    pub camera: Camera,
    /// Mouse motion rotates the camera only while set.
    pub mouse_look: bool,
    pub light: PointLight,
    pub blinn: bool,
    pub bloom: BloomSettings,
}

impl Default for ProgramState {
    fn default() -> Self {
        Self {
            clear_color: Vec3::ZERO,
            overlay_enabled: false,
            camera: Camera::new(Vec3::new(0.0, 0.0, 3.0)),
            mouse_look: true,
            light: PointLight::default(),
            blinn: false,
            bloom: BloomSettings::default(),
        }
    }
}

impl ProgramState {
    pub fn from_config(config: &DemoConfig) -> Self {
        let mut state = Self::default();
        state.camera.movement_speed = config.camera.speed;
        state.camera.mouse_sensitivity = config.camera.sensitivity;
        state.bloom = config.bloom.settings();
        state
    }

    /// Renders the persisted values, newline-terminated.
    ///
    /// Floats use the shortest representation that parses back to the same bits.
    pub fn to_state_text(&self) -> String {
        let c = self.clear_color;
        let p = self.camera.position;
        let f = self.camera.front;

        let lines: Vec<String> = [c.x, c.y, c.z]
            .iter()
            .map(f32::to_string)
            .chain([u8::from(self.overlay_enabled).to_string()])
            .chain([p.x, p.y, p.z, f.x, f.y, f.z].iter().map(f32::to_string))
            .collect();
        format!("{}\n", lines.join("\n"))
    }

    /// Applies persisted values in order, stopping at the first token that
    /// does not parse. Returns how many fields were applied.
    pub fn apply_state_text(&mut self, text: &str) -> usize {
        let mut tokens = text.split_whitespace();
        let mut floats = [0.0f32; PERSISTED_FIELDS];
        let mut applied = 0;

        while applied < PERSISTED_FIELDS {
            let Some(token) = tokens.next() else { break };
            let parsed = if applied == 3 {
                match token {
                    "0" => Some(0.0),
                    "1" => Some(1.0),
                    _ => None,
                }
            } else {
                token.parse::<f32>().ok()
            };

            match parsed {
                Some(v) => floats[applied] = v,
                None => {
                    log::warn!("state file: bad value `{token}` for field {}", applied + 1);
                    break;
                }
            }
            applied += 1;
        }

        let v = &floats;
        let set = |i: usize, slot: &mut f32| {
            if i < applied {
                *slot = v[i];
            }
        };

        set(0, &mut self.clear_color.x);
        set(1, &mut self.clear_color.y);
        set(2, &mut self.clear_color.z);
        if applied > 3 {
            self.overlay_enabled = v[3] != 0.0;
        }
        set(4, &mut self.camera.position.x);
        set(5, &mut self.camera.position.y);
        set(6, &mut self.camera.position.z);

        if applied > 7 {
            let mut front = self.camera.front;
            set(7, &mut front.x);
            set(8, &mut front.y);
            set(9, &mut front.z);
            self.camera.set_front(front);
        }

        // The overlay owns the cursor while it is open.
        if self.overlay_enabled {
            self.mouse_look = false;
        }

        applied
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), StateError> {
        std::fs::write(path, self.to_state_text()).map_err(|source| StateError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads persisted values from `path`. A missing file leaves the state
    /// untouched and is not an error.
    pub fn load_from_file(&mut self, path: &Path) -> Result<(), StateError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("no state file at {}", path.display());
                return Ok(());
            }
            Err(source) => {
                return Err(StateError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let applied = self.apply_state_text(&text);
        if applied < PERSISTED_FIELDS {
            log::warn!(
                "state file {} provided {applied} of {PERSISTED_FIELDS} values",
                path.display()
            );
        } else {
            log::info!("restored state from {}", path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> ProgramState {
        let mut s = ProgramState::default();
        s.clear_color = Vec3::new(0.1, 1.0 / 3.0, 0.7);
        s.overlay_enabled = true;
        s.camera.position = Vec3::new(72.123_456, -9.87, 31.000_002);
        s.camera.set_front(Vec3::new(0.301_2, -0.2, -0.931_7));
        s
    }

    // ── persistence ───────────────────────────────────────────────────────

    #[test]
    fn save_then_load_is_bit_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("program_state.txt");

        let saved = sample();
        saved.save_to_file(&path).unwrap();

        let mut loaded = ProgramState::default();
        loaded.load_from_file(&path).unwrap();

        assert_eq!(loaded.clear_color.to_array().map(f32::to_bits), saved.clear_color.to_array().map(f32::to_bits));
        assert_eq!(loaded.overlay_enabled, saved.overlay_enabled);
        assert_eq!(loaded.camera.position.to_array().map(f32::to_bits), saved.camera.position.to_array().map(f32::to_bits));
        assert_eq!(loaded.camera.front.to_array().map(f32::to_bits), saved.camera.front.to_array().map(f32::to_bits));
    }

    #[test]
    fn file_has_ten_newline_terminated_lines() {
        let state = sample();
        let text = state.to_state_text();
        assert_eq!(text.lines().count(), PERSISTED_FIELDS);
        assert!(text.ends_with('\n') && !text.ends_with("\n\n"));
        assert_eq!(text.lines().nth(3), Some("1"));

        let expected_last = state.camera.front.z.to_string();
        assert_eq!(text.lines().last(), Some(expected_last.as_str()));
    }

    #[test]
    fn missing_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = ProgramState::default();
        state.load_from_file(&dir.path().join("nope.txt")).unwrap();

        assert_eq!(state.clear_color, Vec3::ZERO);
        assert_eq!(state.camera.position, Vec3::new(0.0, 0.0, 3.0));
        assert!(!state.overlay_enabled);
    }

    #[test]
    fn malformed_file_applies_leading_fields_only() {
        let mut state = ProgramState::default();
        let applied = state.apply_state_text("0.5\n0.25\noops\n1\n9\n9\n9\n0\n0\n-1\n");

        assert_eq!(applied, 2);
        assert_eq!(state.clear_color, Vec3::new(0.5, 0.25, 0.0));
        assert!(!state.overlay_enabled);
        assert_eq!(state.camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn overlay_flag_accepts_only_zero_or_one() {
        let mut state = ProgramState::default();
        assert_eq!(state.apply_state_text("0 0 0 true 1 2 3"), 3);
        assert!(!state.overlay_enabled);
    }

    #[test]
    fn restored_overlay_disables_mouse_look() {
        let mut state = ProgramState::default();
        state.apply_state_text("0 0 0 1");
        assert!(state.overlay_enabled);
        assert!(!state.mouse_look);
    }

    // ── camera ────────────────────────────────────────────────────────────

    #[test]
    fn loaded_front_rederives_yaw_and_pitch() {
        let mut state = ProgramState::default();
        state.apply_state_text("0 0 0 0 0 0 0 1 0 0");

        assert_relative_eq!(state.camera.yaw, 0.0, epsilon = 1e-4);
        assert_relative_eq!(state.camera.pitch, 0.0, epsilon = 1e-4);
        assert_eq!(state.camera.front, Vec3::X);
    }

    #[test]
    fn config_feeds_camera_and_bloom() {
        let mut config = DemoConfig::default();
        config.camera.speed = 7.5;
        config.bloom.exposure = 0.4;

        let state = ProgramState::from_config(&config);
        assert_eq!(state.camera.movement_speed, 7.5);
        assert_eq!(state.bloom.exposure, 0.4);
    }
}
