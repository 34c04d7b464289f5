//! Immediate-mode debug panel drawn as solid quads plus text labels.
//!
//! Rows are laid out top to bottom in a fixed-width panel: a label column on
//! the left, the control on the right. Sliders map the pointer x across the
//! track to `[min, max]`; checkboxes toggle on press. A read-only camera box
//! sits under the panel.

use std::path::{Path, PathBuf};

use skyhaven_engine::camera::Camera;
use skyhaven_engine::input::{InputFrame, InputState, MouseButton};
use skyhaven_engine::render::{OverlayQuad, TextRun};
use skyhaven_engine::text::{FontId, FontSystem};

use crate::controls::{EXPOSURE_MAX, EXPOSURE_MIN};
use crate::program_state::ProgramState;

const PANEL_X: f32 = 12.0;
const PANEL_Y: f32 = 12.0;
const PANEL_W: f32 = 300.0;
const LABEL_W: f32 = 118.0;
const PADDING: f32 = 8.0;
const ROW_H: f32 = 22.0;
const CONTROL_H: f32 = 14.0;
const GROUP_GAP: f32 = 8.0;
const BOX_GAP: f32 = 8.0;
const LINE_H: f32 = 18.0;
const FONT_SIZE: f32 = 13.0;

const PANEL_BG: [f32; 4] = [0.08, 0.09, 0.12, 0.85];
const TRACK_BG: [f32; 4] = [0.22, 0.24, 0.30, 1.0];
const FILL: [f32; 4] = [0.36, 0.62, 0.95, 1.0];
const FILL_ACTIVE: [f32; 4] = [0.55, 0.78, 1.0, 1.0];
const LABEL: [f32; 4] = [0.86, 0.88, 0.92, 1.0];
const VALUE: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

const CAMERA_LINES: usize = 3;

/// Fonts tried after the configured one.
const SYSTEM_FONTS: [&str; 5] = [
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Knob {
    ClearR,
    ClearG,
    ClearB,
    Blinn,
    LightConstant,
    LightLinear,
    LightQuadratic,
    Bloom,
    Exposure,
    Threshold,
    MouseLook,
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Widget {
    Slider { min: f32, max: f32 },
    Checkbox,
}

struct Row {
    knob: Knob,
    label: &'static str,
    widget: Widget,
    /// First row of a visual group gets extra space above it.
    group_start: bool,
}

const fn slider(knob: Knob, label: &'static str, min: f32, max: f32, group_start: bool) -> Row {
    Row { knob, label, widget: Widget::Slider { min, max }, group_start }
}

const fn checkbox(knob: Knob, label: &'static str, group_start: bool) -> Row {
    Row { knob, label, widget: Widget::Checkbox, group_start }
}

const ROWS: [Row; 11] = [
    slider(Knob::ClearR, "clear red", 0.0, 1.0, false),
    slider(Knob::ClearG, "clear green", 0.0, 1.0, false),
    slider(Knob::ClearB, "clear blue", 0.0, 1.0, false),
    checkbox(Knob::Blinn, "Blinn-Phong (B)", true),
    slider(Knob::LightConstant, "light constant", 0.0, 1.0, false),
    slider(Knob::LightLinear, "light linear", 0.0, 1.0, false),
    slider(Knob::LightQuadratic, "light quadratic", 0.0, 1.0, false),
    checkbox(Knob::Bloom, "bloom (Space)", true),
    slider(Knob::Exposure, "exposure (Q/E)", EXPOSURE_MIN, EXPOSURE_MAX, false),
    slider(Knob::Threshold, "bright threshold", 0.0, 4.0, false),
    checkbox(Knob::MouseLook, "mouse look", true),
];

fn value(state: &ProgramState, knob: Knob) -> f32 {
    match knob {
        Knob::ClearR => state.clear_color.x,
        Knob::ClearG => state.clear_color.y,
        Knob::ClearB => state.clear_color.z,
        Knob::LightConstant => state.light.constant,
        Knob::LightLinear => state.light.linear,
        Knob::LightQuadratic => state.light.quadratic,
        Knob::Exposure => state.bloom.exposure,
        Knob::Threshold => state.bloom.threshold,
        Knob::Blinn => f32::from(u8::from(state.blinn)),
        Knob::Bloom => f32::from(u8::from(state.bloom.enabled)),
        Knob::MouseLook => f32::from(u8::from(state.mouse_look)),
    }
}

fn flag_mut(state: &mut ProgramState, knob: Knob) -> Option<&mut bool> {
    match knob {
        Knob::Blinn => Some(&mut state.blinn),
        Knob::Bloom => Some(&mut state.bloom.enabled),
        Knob::MouseLook => Some(&mut state.mouse_look),
        _ => None,
    }
}

fn scalar_mut(state: &mut ProgramState, knob: Knob) -> Option<&mut f32> {
    match knob {
        Knob::ClearR => Some(&mut state.clear_color.x),
        Knob::ClearG => Some(&mut state.clear_color.y),
        Knob::ClearB => Some(&mut state.clear_color.z),
        Knob::LightConstant => Some(&mut state.light.constant),
        Knob::LightLinear => Some(&mut state.light.linear),
        Knob::LightQuadratic => Some(&mut state.light.quadratic),
        Knob::Exposure => Some(&mut state.bloom.exposure),
        Knob::Threshold => Some(&mut state.bloom.threshold),
        _ => None,
    }
}

/// Maps pointer `x` across `track` to `[min, max]`, clamped at the ends.
pub fn slider_value(track: &OverlayQuad, min: f32, max: f32, x: f32) -> f32 {
    let w = track.size[0];
    if w <= 0.0 {
        return min;
    }
    let t = ((x - track.origin[0]) / w).clamp(0.0, 1.0);
    min + t * (max - min)
}

/// Fraction of `track` filled for `value`.
fn slider_fill(min: f32, max: f32, value: f32) -> f32 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

/// Top of row `index`.
fn row_y(index: usize) -> f32 {
    let gaps = ROWS[..=index].iter().filter(|r| r.group_start).count() as f32;
    PANEL_Y + PADDING + index as f32 * ROW_H + gaps * GROUP_GAP
}

/// Track (or checkbox square) of row `index`.
fn control_rect(index: usize) -> OverlayQuad {
    let y = row_y(index) + (ROW_H - CONTROL_H) * 0.5;
    let x = PANEL_X + PADDING + LABEL_W;

    match ROWS[index].widget {
        Widget::Slider { .. } => OverlayQuad::new(x, y, PANEL_W - 2.0 * PADDING - LABEL_W, CONTROL_H, TRACK_BG),
        Widget::Checkbox => OverlayQuad::new(x, y, CONTROL_H, CONTROL_H, TRACK_BG),
    }
}

fn panel_rect() -> OverlayQuad {
    let gaps = ROWS.iter().filter(|r| r.group_start).count() as f32;
    let h = 2.0 * PADDING + ROWS.len() as f32 * ROW_H + gaps * GROUP_GAP;
    OverlayQuad::new(PANEL_X, PANEL_Y, PANEL_W, h, PANEL_BG)
}

/// Read-only camera box under the panel.
fn camera_rect() -> OverlayQuad {
    let panel = panel_rect();
    let y = panel.origin[1] + panel.size[1] + BOX_GAP;
    OverlayQuad::new(PANEL_X, y, PANEL_W, 2.0 * PADDING + CAMERA_LINES as f32 * LINE_H, PANEL_BG)
}

/// Top of a text line centred in a band of height `band_h` starting at `top`.
fn text_top(top: f32, band_h: f32) -> f32 {
    top + (band_h - FONT_SIZE) * 0.5
}

/// The three camera readouts: position, yaw/pitch, front.
pub fn camera_lines(camera: &Camera) -> [String; CAMERA_LINES] {
    let p = camera.position;
    let f = camera.front;
    [
        format!("position  ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z),
        format!("yaw / pitch  ({:.1}, {:.1})", camera.yaw, camera.pitch),
        format!("front  ({:.3}, {:.3}, {:.3})", f.x, f.y, f.z),
    ]
}

/// Font files to try for labels, the configured one first.
fn font_candidates(configured: Option<&Path>) -> Vec<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .into_iter()
        .chain(SYSTEM_FONTS.iter().map(PathBuf::from))
        .collect()
}

/// Loads the label font into `fonts`.
///
/// Returns `None` (panel drawn without text) when no candidate loads.
pub fn load_label_font(fonts: &mut FontSystem, configured: Option<&Path>) -> Option<FontId> {
    for path in font_candidates(configured) {
        match fonts.load_font_file(&path) {
            Ok(id) => {
                log::info!("overlay font: {}", path.display());
                return Some(id);
            }
            Err(e) if configured == Some(path.as_path()) => log::warn!("{e}"),
            Err(e) => log::debug!("{e}"),
        }
    }
    log::warn!("no overlay font found; panel labels disabled");
    None
}

/// Debug panel interaction state. Only the dragged slider survives between frames.
#[derive(Debug, Default)]
pub struct DebugPanel {
    active: Option<usize>,
}

impl DebugPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handles pointer input against the panel and writes changes into `state`.
    ///
    /// Returns true when the pointer interacted with the panel this frame.
    pub fn update(&mut self, state: &mut ProgramState, input: &InputState, frame: &InputFrame) -> bool {
        if frame.buttons_released.contains(&MouseButton::Left) && !input.button_down(MouseButton::Left) {
            self.active = None;
        }

        let Some((x, y)) = input.pointer_pos else { return false };

        if frame.buttons_pressed.contains(&MouseButton::Left) {
            self.active = None;
            let hit = (0..ROWS.len()).find(|&i| control_rect(i).contains(x, y));
            let Some(index) = hit else {
                return panel_rect().contains(x, y) || camera_rect().contains(x, y);
            };

            let row = &ROWS[index];
            match row.widget {
                Widget::Checkbox => {
                    if let Some(flag) = flag_mut(state, row.knob) {
                        *flag = !*flag;
                        log::debug!("{:?} = {}", row.knob, *flag);
                    }
                }
                Widget::Slider { .. } => {
                    self.active = Some(index);
                    self.drag(state, index, x);
                }
            }
            return true;
        }

        if let Some(index) = self.active {
            if input.button_down(MouseButton::Left) {
                self.drag(state, index, x);
                return true;
            }
            self.active = None;
        }

        false
    }

    fn drag(&self, state: &mut ProgramState, index: usize, x: f32) {
        let row = &ROWS[index];
        let Widget::Slider { min, max } = row.widget else { return };
        let v = slider_value(&control_rect(index), min, max, x);

        if let Some(slot) = scalar_mut(state, row.knob) {
            if *slot != v {
                *slot = v;
                log::debug!("{:?} = {v:.3}", row.knob);
            }
        }
    }

    /// Quads for the current frame, back to front.
    pub fn quads(&self, state: &ProgramState) -> Vec<OverlayQuad> {
        let mut out = Vec::with_capacity(2 + ROWS.len() * 2);
        out.push(panel_rect());
        out.push(camera_rect());

        for (index, row) in ROWS.iter().enumerate() {
            let rect = control_rect(index);
            out.push(rect);

            let fill_color = if self.active == Some(index) { FILL_ACTIVE } else { FILL };
            let v = value(state, row.knob);
            match row.widget {
                Widget::Slider { min, max } => {
                    let w = rect.size[0] * slider_fill(min, max, v);
                    out.push(OverlayQuad::new(rect.origin[0], rect.origin[1], w, rect.size[1], fill_color));
                }
                Widget::Checkbox if v != 0.0 => {
                    let inset = 3.0;
                    out.push(OverlayQuad::new(
                        rect.origin[0] + inset,
                        rect.origin[1] + inset,
                        rect.size[0] - 2.0 * inset,
                        rect.size[1] - 2.0 * inset,
                        fill_color,
                    ));
                }
                Widget::Checkbox => {}
            }
        }

        out
    }

    /// Row labels, slider values and camera readouts, drawn over [`Self::quads`].
    pub fn texts(&self, state: &ProgramState) -> Vec<TextRun> {
        let mut out = Vec::with_capacity(ROWS.len() * 2 + CAMERA_LINES);

        for (index, row) in ROWS.iter().enumerate() {
            let y = text_top(row_y(index), ROW_H);
            out.push(TextRun::new(PANEL_X + PADDING, y, row.label, FONT_SIZE, LABEL));

            if let Widget::Slider { .. } = row.widget {
                let track = control_rect(index);
                let v = value(state, row.knob);
                out.push(TextRun::new(track.origin[0] + 4.0, y, format!("{v:.3}"), FONT_SIZE, VALUE));
            }
        }

        let camera_box = camera_rect();
        for (line, text) in camera_lines(&state.camera).into_iter().enumerate() {
            let top = camera_box.origin[1] + PADDING + line as f32 * LINE_H;
            out.push(TextRun::new(PANEL_X + PADDING, text_top(top, LINE_H), text, FONT_SIZE, LABEL));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use skyhaven_engine::input::{InputEvent, Modifiers, MouseButtonState, PointerButtonEvent};

    fn row_of(knob: Knob) -> usize {
        ROWS.iter().position(|r| r.knob == knob).unwrap()
    }

    fn center(rect: &OverlayQuad) -> (f32, f32) {
        (rect.origin[0] + rect.size[0] * 0.5, rect.origin[1] + rect.size[1] * 0.5)
    }

    fn button(input: &mut InputState, frame: &mut InputFrame, state: MouseButtonState, x: f32, y: f32) {
        let ev = InputEvent::PointerButton(PointerButtonEvent {
            button: MouseButton::Left,
            state,
            x,
            y,
            modifiers: Modifiers::default(),
        });
        input.apply_event(frame, ev);
    }

    // ── layout ────────────────────────────────────────────────────────────

    #[test]
    fn slider_value_clamps_to_range() {
        let track = OverlayQuad::new(10.0, 0.0, 100.0, 10.0, TRACK_BG);
        assert_relative_eq!(slider_value(&track, 0.0, 4.0, 10.0), 0.0);
        assert_relative_eq!(slider_value(&track, 0.0, 4.0, 60.0), 2.0);
        assert_relative_eq!(slider_value(&track, 0.0, 4.0, 500.0), 4.0);
        assert_relative_eq!(slider_value(&track, 0.0, 4.0, -5.0), 0.0);
    }

    #[test]
    fn controls_sit_right_of_the_label_column() {
        for i in 0..ROWS.len() {
            let rect = control_rect(i);
            assert!(rect.origin[0] >= PANEL_X + PADDING + LABEL_W);
            assert!(rect.origin[0] + rect.size[0] <= PANEL_X + PANEL_W - PADDING + 1e-3);
        }
    }

    #[test]
    fn camera_box_is_below_panel() {
        let panel = panel_rect();
        let camera = camera_rect();
        assert!(camera.origin[1] >= panel.origin[1] + panel.size[1]);
    }

    #[test]
    fn rows_do_not_overlap_and_fit_panel() {
        let panel = panel_rect();
        for i in 1..ROWS.len() {
            let prev = control_rect(i - 1);
            let cur = control_rect(i);
            assert!(cur.origin[1] >= prev.origin[1] + prev.size[1]);
        }
        let last = control_rect(ROWS.len() - 1);
        assert!(last.origin[1] + last.size[1] <= panel.origin[1] + panel.size[1]);
    }

    // ── interaction ───────────────────────────────────────────────────────

    #[test]
    fn clicking_checkbox_toggles_blinn() {
        let mut panel = DebugPanel::new();
        let mut state = ProgramState::default();
        let mut input = InputState::default();
        let mut frame = InputFrame::default();

        let (x, y) = center(&control_rect(row_of(Knob::Blinn)));
        button(&mut input, &mut frame, MouseButtonState::Pressed, x, y);

        assert!(panel.update(&mut state, &input, &frame));
        assert!(state.blinn);
    }

    #[test]
    fn dragging_slider_tracks_pointer_until_release() {
        let mut panel = DebugPanel::new();
        let mut state = ProgramState::default();
        let mut input = InputState::default();
        let mut frame = InputFrame::default();

        let idx = row_of(Knob::Threshold);
        let track = control_rect(idx);
        let (x, y) = center(&track);

        button(&mut input, &mut frame, MouseButtonState::Pressed, x, y);
        panel.update(&mut state, &input, &frame);
        assert_relative_eq!(state.bloom.threshold, 2.0, epsilon = 1e-4);
        frame.clear();

        // drag past the end, off the row
        input.apply_event(&mut frame, InputEvent::PointerMoved { x: 1000.0, y: 400.0 });
        assert!(panel.update(&mut state, &input, &frame));
        assert_relative_eq!(state.bloom.threshold, 4.0);
        frame.clear();

        button(&mut input, &mut frame, MouseButtonState::Released, 1000.0, 400.0);
        panel.update(&mut state, &input, &frame);
        frame.clear();

        input.apply_event(&mut frame, InputEvent::PointerMoved { x: track.origin[0], y });
        assert!(!panel.update(&mut state, &input, &frame));
        assert_relative_eq!(state.bloom.threshold, 4.0);
    }

    #[test]
    fn click_outside_panel_is_not_consumed() {
        let mut panel = DebugPanel::new();
        let mut state = ProgramState::default();
        let mut input = InputState::default();
        let mut frame = InputFrame::default();

        button(&mut input, &mut frame, MouseButtonState::Pressed, 600.0, 500.0);
        assert!(!panel.update(&mut state, &input, &frame));
    }

    #[test]
    fn quads_reflect_state() {
        let panel = DebugPanel::new();
        let mut state = ProgramState::default();
        state.blinn = false;
        state.bloom.enabled = true;
        state.mouse_look = false;

        let quads = panel.quads(&state);
        let sliders = ROWS.iter().filter(|r| matches!(r.widget, Widget::Slider { .. })).count();
        // panel + camera box + every control + a fill per slider + one checked box (bloom)
        assert_eq!(quads.len(), 2 + ROWS.len() + sliders + 1);
    }

    // ── labels ────────────────────────────────────────────────────────────

    #[test]
    fn every_row_has_a_distinct_label() {
        let mut labels: Vec<&str> = ROWS.iter().map(|r| r.label).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), ROWS.len());
        assert!(ROWS.iter().all(|r| !r.label.is_empty()));
    }

    #[test]
    fn texts_label_rows_and_show_slider_values() {
        let panel = DebugPanel::new();
        let mut state = ProgramState::default();
        state.bloom.exposure = 1.25;

        let texts = panel.texts(&state);
        let exposure_row = row_of(Knob::Exposure);
        let label = texts.iter().find(|t| t.text == "exposure (Q/E)").unwrap();
        let value = texts.iter().find(|t| t.text == "1.250").unwrap();

        // same row, value inside the track
        assert_relative_eq!(label.origin[1], value.origin[1]);
        assert!(value.origin[0] >= control_rect(exposure_row).origin[0]);
        assert!(label.origin[0] < control_rect(exposure_row).origin[0]);
    }

    #[test]
    fn texts_include_camera_readouts() {
        let panel = DebugPanel::new();
        let mut state = ProgramState::default();
        state.camera.position = glam::Vec3::new(1.0, -2.5, 30.0);

        let texts = panel.texts(&state);
        let sliders = ROWS.iter().filter(|r| matches!(r.widget, Widget::Slider { .. })).count();
        assert_eq!(texts.len(), ROWS.len() + sliders + CAMERA_LINES);
        assert!(texts.iter().any(|t| t.text == "position  (1.00, -2.50, 30.00)"));

        let camera_box = camera_rect();
        let readouts = &texts[texts.len() - CAMERA_LINES..];
        assert!(readouts.iter().all(|t| camera_box.contains(t.origin[0], t.origin[1])));
    }

    #[test]
    fn camera_lines_report_yaw_pitch_and_front() {
        let camera = Camera::default();
        let [_, angles, front] = camera_lines(&camera);
        assert_eq!(angles, "yaw / pitch  (-90.0, 0.0)");
        assert!(front.starts_with("front  ("));
        assert!(front.contains("-1.000"));
    }

    #[test]
    fn configured_font_is_tried_first() {
        let configured = Path::new("fonts/label.ttf");
        let candidates = font_candidates(Some(configured));
        assert_eq!(candidates[0], configured);
        assert_eq!(candidates.len(), SYSTEM_FONTS.len() + 1);
        assert_eq!(font_candidates(None).len(), SYSTEM_FONTS.len());
    }
}
