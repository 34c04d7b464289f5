//! Fly-through camera driven by Euler angles.
//!
//! Angles are in degrees. Yaw −90° looks down −Z; pitch is clamped to ±89°
//! when mouse input is constrained so the view never flips over the pole.

use glam::{Mat4, Vec3};

pub const DEFAULT_YAW: f32 = -90.0;
pub const DEFAULT_PITCH: f32 = 0.0;
pub const DEFAULT_SPEED: f32 = 2.5;
pub const DEFAULT_SENSITIVITY: f32 = 0.1;
pub const DEFAULT_ZOOM: f32 = 45.0;

pub const PITCH_LIMIT: f32 = 89.0;
pub const ZOOM_MIN: f32 = 1.0;
pub const ZOOM_MAX: f32 = 45.0;

/// Keyboard-driven movement direction, relative to where the camera looks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    /// Vertical field of view in degrees.
    pub zoom: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(Vec3::new(0.0, 0.0, 3.0))
    }
}

impl Camera {
    pub fn new(position: Vec3) -> Self {
        let mut camera = Self {
            position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: DEFAULT_YAW,
            pitch: DEFAULT_PITCH,
            movement_speed: DEFAULT_SPEED,
            mouse_sensitivity: DEFAULT_SENSITIVITY,
            zoom: DEFAULT_ZOOM,
        };
        camera.update_vectors();
        camera
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// Perspective projection with the current zoom as vertical FOV.
    pub fn projection_matrix(&self, aspect_ratio: f32, near: f32, far: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect_ratio, near, far)
    }

    /// Moves `movement_speed * dt` along the given direction.
    pub fn process_keyboard(&mut self, direction: CameraMovement, dt: f32) {
        let velocity = self.movement_speed * dt;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Rotates by a mouse offset in pixels (positive y looks up).
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    /// Narrows (positive) or widens (negative) the field of view.
    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(ZOOM_MIN, ZOOM_MAX);
    }

    /// Points the camera along `front` and re-derives yaw and pitch from it.
    ///
    /// `front` is stored unchanged; zero-length or non-finite input is ignored.
    pub fn set_front(&mut self, front: Vec3) {
        if !front.is_finite() || front.length_squared() <= f32::EPSILON {
            log::warn!("ignoring degenerate camera front {front}");
            return;
        }

        let dir = front.normalize();
        self.pitch = dir.y.clamp(-1.0, 1.0).asin().to_degrees().clamp(-PITCH_LIMIT, PITCH_LIMIT);
        self.yaw = dir.z.atan2(dir.x).to_degrees();

        self.front = front;
        self.update_basis();
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos()).normalize();
        self.update_basis();
    }

    fn update_basis(&mut self) {
        let front = self.front.normalize();
        self.right = front.cross(self.world_up).normalize();
        self.up = self.right.cross(front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_vec_eq(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a} != {b}");
    }

    // ── defaults ──────────────────────────────────────────────────────────

    #[test]
    fn default_camera_looks_down_negative_z() {
        let cam = Camera::default();
        assert_eq!(cam.position, Vec3::new(0.0, 0.0, 3.0));
        assert_vec_eq(cam.front, Vec3::NEG_Z);
        assert_vec_eq(cam.right, Vec3::X);
        assert_vec_eq(cam.up, Vec3::Y);
        assert_eq!(cam.zoom, 45.0);
    }

    #[test]
    fn view_matrix_maps_front_to_negative_z() {
        let mut cam = Camera::new(Vec3::new(5.0, 1.0, -2.0));
        cam.process_mouse_movement(300.0, 120.0, true);

        let target = cam.position + cam.front * 4.0;
        let in_view = cam.view_matrix().transform_point3(target);
        assert_vec_eq(in_view, Vec3::new(0.0, 0.0, -4.0));
    }

    // ── movement ──────────────────────────────────────────────────────────

    #[test]
    fn keyboard_moves_speed_times_dt() {
        let mut cam = Camera::default();
        cam.process_keyboard(CameraMovement::Forward, 0.5);
        assert_vec_eq(cam.position, Vec3::new(0.0, 0.0, 3.0 - 1.25));

        cam.process_keyboard(CameraMovement::Right, 1.0);
        assert_vec_eq(cam.position, Vec3::new(2.5, 0.0, 1.75));

        cam.process_keyboard(CameraMovement::Left, 1.0);
        cam.process_keyboard(CameraMovement::Backward, 0.5);
        assert_vec_eq(cam.position, Vec3::new(0.0, 0.0, 3.0));
    }

    // ── mouse ─────────────────────────────────────────────────────────────

    #[test]
    fn pitch_is_clamped_when_constrained() {
        let mut cam = Camera::default();
        cam.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(cam.pitch, PITCH_LIMIT);
        cam.process_mouse_movement(0.0, -20_000.0, true);
        assert_eq!(cam.pitch, -PITCH_LIMIT);
    }

    #[test]
    fn pitch_is_free_when_unconstrained() {
        let mut cam = Camera::default();
        cam.process_mouse_movement(0.0, 1000.0, false);
        assert_relative_eq!(cam.pitch, 100.0);
    }

    #[test]
    fn mouse_offset_scales_by_sensitivity() {
        let mut cam = Camera::default();
        cam.process_mouse_movement(900.0, 0.0, true);
        assert_relative_eq!(cam.yaw, 0.0, epsilon = 1e-4);
        assert_vec_eq(cam.front, Vec3::X);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = Camera::default();
        cam.process_mouse_scroll(100.0);
        assert_eq!(cam.zoom, ZOOM_MIN);
        cam.process_mouse_scroll(-100.0);
        assert_eq!(cam.zoom, ZOOM_MAX);
        cam.process_mouse_scroll(5.0);
        assert_eq!(cam.zoom, 40.0);
    }

    // ── set_front ─────────────────────────────────────────────────────────

    #[test]
    fn set_front_derives_yaw_and_pitch() {
        let mut reference = Camera::default();
        reference.process_mouse_movement(375.0, -210.0, true);

        let mut cam = Camera::default();
        cam.set_front(reference.front);
        assert_relative_eq!(cam.yaw, reference.yaw, epsilon = 1e-3);
        assert_relative_eq!(cam.pitch, reference.pitch, epsilon = 1e-3);
        assert_eq!(cam.front, reference.front);

        // Mouse-look continues identically from the restored angles.
        reference.process_mouse_movement(10.0, 10.0, true);
        cam.process_mouse_movement(10.0, 10.0, true);
        assert!(cam.front.abs_diff_eq(reference.front, 1e-4));
    }

    #[test]
    fn set_front_ignores_zero_vector() {
        let mut cam = Camera::default();
        cam.set_front(Vec3::ZERO);
        assert_vec_eq(cam.front, Vec3::NEG_Z);
        assert_eq!(cam.yaw, DEFAULT_YAW);
    }
}
