use std::collections::HashSet;

use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Tracks which keys are physically held.
///
/// This is a level view of the keyboard: it answers "is the key down right
/// now" and nothing else. Edge detection lives in [`KeyToggle`].
#[derive(Debug, Default)]
pub struct Input {
    keys_down: HashSet<KeyCode>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event and update input state.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    match event.state {
                        ElementState::Pressed => {
                            self.keys_down.insert(key);
                        }
                        ElementState::Released => {
                            self.keys_down.remove(&key);
                        }
                    }
                }
            }
            // Key-ups that happen while unfocused never reach us.
            WindowEvent::Focused(false) => self.keys_down.clear(),
            _ => {}
        }
    }

    /// Marks a key as held. Mostly useful for driving the viewer without a window.
    pub fn press(&mut self, key: KeyCode) {
        self.keys_down.insert(key);
    }

    pub fn release(&mut self, key: KeyCode) {
        self.keys_down.remove(&key);
    }

    /// Returns true if the key is currently held down.
    pub fn key_down(&self, key: KeyCode) -> bool {
        self.keys_down.contains(&key)
    }
}

/// Debounced state of a single key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyState {
    #[default]
    Released,
    Pressed,
}

/// Turns per-frame "is the key held" samples into one-shot press events.
///
/// [`update`](Self::update) returns `true` only on the frame where the key
/// goes from released to held, so an action fires once per physical press no
/// matter how many frames the key stays down. Use one instance per key.
///
/// ```
/// use meshview::KeyToggle;
///
/// let mut toggle = KeyToggle::new();
/// assert!(toggle.update(true));
/// assert!(!toggle.update(true));
/// assert!(!toggle.update(false));
/// assert!(toggle.update(true));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct KeyToggle {
    state: KeyState,
}

impl KeyToggle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds this frame's sample and reports whether the press edge happened.
    pub fn update(&mut self, down: bool) -> bool {
        let fired = down && self.state == KeyState::Released;
        self.state = if down {
            KeyState::Pressed
        } else {
            KeyState::Released
        };
        fired
    }

    pub fn state(&self) -> KeyState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fires_while_held(frames: usize) -> usize {
        let mut toggle = KeyToggle::new();
        let mut fired = 0;
        for _ in 0..frames {
            if toggle.update(true) {
                fired += 1;
            }
        }
        if toggle.update(false) {
            fired += 1;
        }
        fired
    }

    #[test]
    fn holding_fires_once() {
        for frames in [1, 5, 100] {
            assert_eq!(fires_while_held(frames), 1, "held for {frames} frames");
        }
    }

    #[test]
    fn each_press_release_cycle_fires_once() {
        let mut toggle = KeyToggle::new();
        let samples = [
            false, true, true, false, false, true, false, true, true, true, false,
        ];
        let fired = samples.iter().filter(|&&down| toggle.update(down)).count();
        assert_eq!(fired, 3);
    }

    #[test]
    fn toggles_do_not_share_state() {
        let mut normals = KeyToggle::new();
        let mut screenshot = KeyToggle::new();

        assert!(normals.update(true));
        assert_eq!(normals.state(), KeyState::Pressed);
        assert_eq!(screenshot.state(), KeyState::Released);
        assert!(screenshot.update(true));
        assert!(!normals.update(true));
    }

    #[test]
    fn input_tracks_held_keys() {
        let mut input = Input::new();
        input.press(KeyCode::KeyN);
        assert!(input.key_down(KeyCode::KeyN));
        assert!(!input.key_down(KeyCode::F11));

        input.handle_event(&WindowEvent::Focused(false));
        assert!(!input.key_down(KeyCode::KeyN));
    }
}
