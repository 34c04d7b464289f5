use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{
    InputEvent,
    Key,
    KeyState,
    Modifiers,
    MouseButton,
    MouseButtonState,
    PointerButtonEvent,
};

/// Current input state for the window.
///
/// Holds "is down" information and the pointer position. Per-frame
/// transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    pub modifiers: Modifiers,

    pub focused: bool,

    /// Pointer position in logical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    pub keys_down: HashSet<Key>,

    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies an input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::ModifiersChanged(m) => {
                self.modifiers = *m;
            }

            InputEvent::Focused(f) => {
                self.focused = *f;
                if !*f {
                    // Focus loss mid-press would otherwise leave keys stuck down.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                self.pointer_pos = Some((*x, *y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, modifiers, .. } => {
                self.modifiers = *modifiers;

                match state {
                    KeyState::Pressed => {
                        if self.keys_down.insert(*key) {
                            frame.keys_pressed.insert(*key);
                        }
                    }
                    KeyState::Released => {
                        if self.keys_down.remove(key) {
                            frame.keys_released.insert(*key);
                        }
                    }
                }
            }

            InputEvent::PointerButton(PointerButtonEvent {
                button,
                state,
                x,
                y,
                modifiers,
            }) => {
                self.pointer_pos = Some((*x, *y));
                self.modifiers = *modifiers;

                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(*button) {
                            frame.buttons_pressed.insert(*button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(button) {
                            frame.buttons_released.insert(*button);
                        }
                    }
                }
            }

            InputEvent::MouseMotion { dx, dy } => {
                frame.mouse_delta.0 += *dx;
                frame.mouse_delta.1 += *dy;
            }

            InputEvent::MouseWheel { delta, modifiers } => {
                self.modifiers = *modifiers;
                frame.wheel_lines += delta.lines_y();
            }
        }

        frame.push_event(ev);
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;

    fn key(key: Key, state: KeyState, repeat: bool) -> InputEvent {
        InputEvent::Key { key, state, modifiers: Modifiers::default(), repeat }
    }

    // ── keys ──────────────────────────────────────────────────────────────

    #[test]
    fn press_is_reported_once_per_transition() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::B, KeyState::Pressed, false));
        assert!(frame.pressed(Key::B));
        assert!(state.key_down(Key::B));

        frame.clear();
        state.apply_event(&mut frame, key(Key::B, KeyState::Pressed, true));
        assert!(!frame.pressed(Key::B), "key-repeat must not count as a new press");
        assert!(state.key_down(Key::B));
    }

    #[test]
    fn release_then_press_reports_again() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::B, KeyState::Pressed, false));
        state.apply_event(&mut frame, key(Key::B, KeyState::Released, false));
        assert!(frame.keys_released.contains(&Key::B));

        frame.clear();
        state.apply_event(&mut frame, key(Key::B, KeyState::Pressed, false));
        assert!(frame.pressed(Key::B));
    }

    #[test]
    fn focus_loss_clears_held_keys() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, key(Key::W, KeyState::Pressed, false));
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(!state.key_down(Key::W));
    }

    // ── mouse ─────────────────────────────────────────────────────────────

    #[test]
    fn motion_accumulates_until_cleared() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 2.0, dy: -1.0 });
        state.apply_event(&mut frame, InputEvent::MouseMotion { dx: 3.0, dy: 4.0 });
        assert_eq!(frame.mouse_delta, (5.0, 3.0));

        frame.clear();
        assert_eq!(frame.mouse_delta, (0.0, 0.0));
    }

    #[test]
    fn wheel_pixels_convert_to_lines() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(
            &mut frame,
            InputEvent::MouseWheel {
                delta: MouseWheelDelta::Pixel { x: 0.0, y: 240.0 },
                modifiers: Modifiers::default(),
            },
        );
        state.apply_event(
            &mut frame,
            InputEvent::MouseWheel {
                delta: MouseWheelDelta::Line { x: 0.0, y: -1.0 },
                modifiers: Modifiers::default(),
            },
        );
        assert_eq!(frame.wheel_lines, 1.0);
    }

    #[test]
    fn button_press_updates_pointer_position() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(
            &mut frame,
            InputEvent::PointerButton(PointerButtonEvent {
                button: MouseButton::Left,
                state: MouseButtonState::Pressed,
                x: 10.0,
                y: 20.0,
                modifiers: Modifiers::default(),
            }),
        );
        assert_eq!(state.pointer_pos, Some((10.0, 20.0)));
        assert!(frame.buttons_pressed.contains(&MouseButton::Left));
        assert!(state.button_down(MouseButton::Left));
    }
}
