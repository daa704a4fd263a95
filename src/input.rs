use std::collections::HashMap;

use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent},
    keyboard::Key as LogicalKey,
};

use crate::{
    cmd::Cmd,
    config::{CommandVerb, Key},
    math::{vec2, Vec2f},
};

/// Tracks the mouse and the drawing finger between window events.
///
/// The mouse and the first touch each drive a single pointer; additional fingers are ignored.
#[derive(Debug, Default)]
pub struct PointerState {
    cursor_pos: Option<Vec2f>,
    mouse_down: bool,
    /// The button went down before the cursor position was known.
    press_pending: bool,
    /// The touch that is currently drawing.
    active_touch: Option<u64>,
}

impl PointerState {
    /// Turns pointer, keyboard and file-drop events into commands.
    pub fn translate(
        &mut self,
        event: WindowEvent,
        bind: &HashMap<Key, CommandVerb>,
    ) -> Option<Cmd> {
        match event {
            WindowEvent::CursorMoved { position, .. } => self.cursor_moved(to_view(position)),
            WindowEvent::CursorLeft { .. } => self.cursor_left(),
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => self.mouse_button(state == ElementState::Pressed),
            WindowEvent::Touch(Touch {
                phase, location, id, ..
            }) => self.touch(phase, id, to_view(location)),
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return None;
                }
                let LogicalKey::Character(text) = &event.logical_key else {
                    return None;
                };
                key_command(text, bind)
            }
            WindowEvent::DroppedFile(path) => Some(Cmd::SetBackground { path }),
            _ => None,
        }
    }

    pub fn cursor_moved(&mut self, position: Vec2f) -> Option<Cmd> {
        self.cursor_pos = Some(position);
        if self.press_pending {
            self.press_pending = false;
            self.mouse_down = true;
            return Some(Cmd::PointerDown { position });
        }
        self.mouse_down.then_some(Cmd::PointerMove { position })
    }

    /// Leaving the window lifts the mouse.
    pub fn cursor_left(&mut self) -> Option<Cmd> {
        self.cursor_pos = None;
        self.press_pending = false;
        if self.mouse_down {
            self.mouse_down = false;
            return Some(Cmd::PointerUp);
        }
        None
    }

    pub fn mouse_button(&mut self, pressed: bool) -> Option<Cmd> {
        if !pressed {
            self.press_pending = false;
            if self.mouse_down {
                self.mouse_down = false;
                return Some(Cmd::PointerUp);
            }
            return None;
        }
        match self.cursor_pos {
            Some(position) => {
                self.mouse_down = true;
                Some(Cmd::PointerDown { position })
            }
            None => {
                log::debug!("mouse pressed before cursor position is known, waiting for a move");
                self.press_pending = true;
                None
            }
        }
    }

    pub fn touch(&mut self, phase: TouchPhase, id: u64, position: Vec2f) -> Option<Cmd> {
        match phase {
            TouchPhase::Started if self.active_touch.is_none() => {
                self.active_touch = Some(id);
                Some(Cmd::PointerDown { position })
            }
            TouchPhase::Moved if self.active_touch == Some(id) => {
                Some(Cmd::PointerMove { position })
            }
            TouchPhase::Ended if self.active_touch == Some(id) => {
                self.active_touch = None;
                Some(Cmd::PointerUp)
            }
            TouchPhase::Cancelled if self.active_touch == Some(id) => {
                self.active_touch = None;
                Some(Cmd::PointerCancel)
            }
            _ => None,
        }
    }
}

/// Looks up the command bound to a typed character. Bindings ignore case.
pub fn key_command(text: &str, bind: &HashMap<Key, CommandVerb>) -> Option<Cmd> {
    let verb = bind.get(&Key::from_text(text)?)?;
    log::debug!("key '{text}' -> {verb:?}");
    Some(Cmd::from(verb))
}

fn to_view(position: PhysicalPosition<f64>) -> Vec2f {
    vec2(position.x as f32, position.y as f32)
}
