// Input module for TriCam

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Accumulates window events between frames.
///
/// Once per frame the app takes an [`InputSnapshot`] and then calls
/// [`InputState::begin_frame`] to clear the per-frame edges.
#[derive(Debug, Default)]
pub struct InputState {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_down: HashSet<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call at the start of each frame to reset per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = Vec2::ZERO;
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    self.set_key(key, event.state == ElementState::Pressed);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons_down.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons_down.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                self.move_cursor(Vec2::new(position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
            }
            WindowEvent::Focused(false) => {
                self.keys_down.clear();
                self.mouse_buttons_down.clear();
            }
            _ => {}
        }
    }

    fn set_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            if self.keys_down.insert(key) {
                self.keys_pressed.insert(key);
            }
        } else {
            self.keys_down.remove(&key);
        }
    }

    fn move_cursor(&mut self, position: Vec2) {
        // The first sample after entering the window only establishes a reference.
        if let Some(last) = self.mouse_position {
            self.mouse_delta += position - last;
        }
        self.mouse_position = Some(position);
    }

    /// Freezes the current state. Keyboard or mouse queries on the snapshot
    /// report nothing when the overlay has claimed that device.
    pub fn snapshot(&self, capture: InputCapture) -> InputSnapshot {
        InputSnapshot {
            keys_down: if capture.keyboard {
                HashSet::new()
            } else {
                self.keys_down.clone()
            },
            keys_pressed: if capture.keyboard {
                HashSet::new()
            } else {
                self.keys_pressed.clone()
            },
            primary_down: !capture.mouse && self.mouse_buttons_down.contains(&MouseButton::Left),
            mouse_delta: if capture.mouse { Vec2::ZERO } else { self.mouse_delta },
        }
    }
}

/// Which devices the debug overlay currently wants for itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputCapture {
    pub keyboard: bool,
    pub mouse: bool,
}

/// Immutable input for one frame, passed explicitly into every update.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    keys_down: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,
    primary_down: bool,
    mouse_delta: Vec2,
}

impl InputSnapshot {
    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }

    /// Returns true if the key went down this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Returns true while the left mouse button is held.
    pub fn primary_down(&self) -> bool {
        self.primary_down
    }

    /// Cursor movement since the previous frame, in pixels.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }
}

#[cfg(test)]
impl InputSnapshot {
    pub fn with_key_down(mut self, key: KeyCode) -> Self {
        self.keys_down.insert(key);
        self
    }

    pub fn with_key_pressed(mut self, key: KeyCode) -> Self {
        self.keys_down.insert(key);
        self.keys_pressed.insert(key);
        self
    }

    pub fn with_mouse_drag(mut self, delta: Vec2) -> Self {
        self.primary_down = true;
        self.mouse_delta = delta;
        self
    }
}
