//! Keyboard and mouse bindings.

use skyhaven_engine::camera::CameraMovement;
use skyhaven_engine::input::{InputFrame, InputState, Key};

use crate::program_state::ProgramState;

/// Exposure change per second while Q or E is held.
pub const EXPOSURE_RATE: f32 = 1.0;
pub const EXPOSURE_MIN: f32 = 0.05;
pub const EXPOSURE_MAX: f32 = 5.0;

/// Side effects the caller applies to the window/runtime.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ControlOutcome {
    pub exit: bool,
    /// `Some(true)` to capture the cursor for mouse-look, `Some(false)` to release it.
    pub capture_cursor: Option<bool>,
}

/// Applies one frame of input to `state`.
///
/// Held keys act every frame scaled by `dt`; toggles fire on the press edge
/// only, so key-repeat and held keys never flip them twice. While
/// `pointer_on_panel` is set the mouse drives the overlay, not the camera.
pub fn apply_controls(
    state: &mut ProgramState,
    input: &InputState,
    frame: &InputFrame,
    dt: f32,
    pointer_on_panel: bool,
) -> ControlOutcome {
    let mut outcome = ControlOutcome::default();

    if input.key_down(Key::Escape) {
        outcome.exit = true;
        return outcome;
    }

    for (key, movement) in [
        (Key::W, CameraMovement::Forward),
        (Key::S, CameraMovement::Backward),
        (Key::A, CameraMovement::Left),
        (Key::D, CameraMovement::Right),
    ] {
        if input.key_down(key) {
            state.camera.process_keyboard(movement, dt);
        }
    }

    if frame.pressed(Key::B) {
        state.blinn = !state.blinn;
        log::info!("lighting: {}", if state.blinn { "Blinn-Phong" } else { "Phong" });
    }

    if frame.pressed(Key::Space) {
        state.bloom.enabled = !state.bloom.enabled;
        log::info!("bloom {}", if state.bloom.enabled { "on" } else { "off" });
    }

    let mut exposure_dir = 0.0;
    if input.key_down(Key::E) {
        exposure_dir += 1.0;
    }
    if input.key_down(Key::Q) {
        exposure_dir -= 1.0;
    }
    if exposure_dir != 0.0 {
        state.bloom.exposure =
            (state.bloom.exposure + exposure_dir * EXPOSURE_RATE * dt).clamp(EXPOSURE_MIN, EXPOSURE_MAX);
    }

    if frame.pressed(Key::F1) {
        state.overlay_enabled = !state.overlay_enabled;
        state.mouse_look = !state.overlay_enabled;
        outcome.capture_cursor = Some(state.mouse_look);
        log::debug!("overlay {}", if state.overlay_enabled { "opened" } else { "closed" });
    }

    if pointer_on_panel {
        return outcome;
    }

    let (dx, dy) = frame.mouse_delta;
    if state.mouse_look && (dx != 0.0 || dy != 0.0) {
        // Screen y grows downward; pitch grows upward.
        state.camera.process_mouse_movement(dx, -dy, true);
    }

    if frame.wheel_lines != 0.0 {
        state.camera.process_mouse_scroll(frame.wheel_lines);
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Vec3;
    use skyhaven_engine::input::{InputEvent, KeyState, Modifiers};

    struct Harness {
        state: ProgramState,
        input: InputState,
        frame: InputFrame,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                state: ProgramState::default(),
                input: InputState::default(),
                frame: InputFrame::default(),
            }
        }

        fn key(&mut self, key: Key, state: KeyState, repeat: bool) {
            let ev = InputEvent::Key { key, state, modifiers: Modifiers::default(), repeat };
            self.input.apply_event(&mut self.frame, ev);
        }

        fn step(&mut self, dt: f32) -> ControlOutcome {
            let out = apply_controls(&mut self.state, &self.input, &self.frame, dt, false);
            self.frame.clear();
            out
        }
    }

    // ── toggles ───────────────────────────────────────────────────────────

    #[test]
    fn held_b_toggles_blinn_once() {
        let mut h = Harness::new();
        h.key(Key::B, KeyState::Pressed, false);
        h.step(0.016);
        assert!(h.state.blinn);

        h.key(Key::B, KeyState::Pressed, true);
        h.step(0.016);
        h.step(0.016);
        assert!(h.state.blinn, "held key must not re-toggle");

        h.key(Key::B, KeyState::Released, false);
        h.key(Key::B, KeyState::Pressed, false);
        h.step(0.016);
        assert!(!h.state.blinn);
    }

    #[test]
    fn f1_swaps_overlay_and_cursor_capture() {
        let mut h = Harness::new();
        h.key(Key::F1, KeyState::Pressed, false);
        let out = h.step(0.016);
        assert!(h.state.overlay_enabled);
        assert!(!h.state.mouse_look);
        assert_eq!(out.capture_cursor, Some(false));

        h.key(Key::F1, KeyState::Released, false);
        h.key(Key::F1, KeyState::Pressed, false);
        let out = h.step(0.016);
        assert!(!h.state.overlay_enabled);
        assert!(h.state.mouse_look);
        assert_eq!(out.capture_cursor, Some(true));
    }

    #[test]
    fn space_toggles_bloom() {
        let mut h = Harness::new();
        assert!(h.state.bloom.enabled);
        h.key(Key::Space, KeyState::Pressed, false);
        h.step(0.016);
        assert!(!h.state.bloom.enabled);
    }

    #[test]
    fn escape_requests_exit() {
        let mut h = Harness::new();
        h.key(Key::Escape, KeyState::Pressed, false);
        assert!(h.step(0.016).exit);
    }

    // ── continuous ────────────────────────────────────────────────────────

    #[test]
    fn w_moves_along_front_scaled_by_dt() {
        let mut h = Harness::new();
        let start = h.state.camera.position;
        h.key(Key::W, KeyState::Pressed, false);
        h.step(0.5);

        let moved = h.state.camera.position - start;
        assert!(moved.abs_diff_eq(Vec3::NEG_Z * 2.5 * 0.5, 1e-5));
    }

    #[test]
    fn exposure_keys_clamp() {
        let mut h = Harness::new();
        h.key(Key::Q, KeyState::Pressed, false);
        for _ in 0..20 {
            h.step(1.0);
        }
        assert_relative_eq!(h.state.bloom.exposure, EXPOSURE_MIN);

        h.key(Key::Q, KeyState::Released, false);
        h.key(Key::E, KeyState::Pressed, false);
        h.step(0.5);
        assert_relative_eq!(h.state.bloom.exposure, EXPOSURE_MIN + 0.5);
    }

    #[test]
    fn mouse_motion_ignored_without_mouse_look() {
        let mut h = Harness::new();
        h.state.mouse_look = false;
        h.input.apply_event(&mut h.frame, InputEvent::MouseMotion { dx: 40.0, dy: 0.0 });
        h.step(0.016);
        assert_eq!(h.state.camera.yaw, -90.0);

        h.state.mouse_look = true;
        h.input.apply_event(&mut h.frame, InputEvent::MouseMotion { dx: 40.0, dy: 10.0 });
        h.step(0.016);
        assert_relative_eq!(h.state.camera.yaw, -86.0, epsilon = 1e-4);
        assert_relative_eq!(h.state.camera.pitch, -1.0, epsilon = 1e-4);
    }

    #[test]
    fn panel_drag_does_not_turn_camera() {
        let mut h = Harness::new();
        h.input.apply_event(&mut h.frame, InputEvent::MouseMotion { dx: 40.0, dy: 0.0 });
        apply_controls(&mut h.state, &h.input, &h.frame, 0.016, true);
        assert_eq!(h.state.camera.yaw, -90.0);
    }
}
