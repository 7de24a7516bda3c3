/// Keyboard input.
///
/// Tracks which keys are held so movement continues while a key is down,
/// and which were freshly pressed this frame for one-shot actions
/// (weapon switch, pause, quit, restart).
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't support it.
///
/// Bindings:
///   move        arrows / WASD
///   attack      Z / Space / J
///   fire bow    X / K
///   weapon      [ / ] (previous / next)
///   pause       P / F1
///   restart     R / Enter (after game over)
///   quit        Esc / Q / Ctrl+C

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_ATTACK: &[KeyCode] = &[KeyCode::Char('z'), KeyCode::Char('Z'), KeyCode::Char(' '), KeyCode::Char('j'), KeyCode::Char('J')];
const KEYS_BOW: &[KeyCode] = &[KeyCode::Char('x'), KeyCode::Char('X'), KeyCode::Char('k'), KeyCode::Char('K')];
const KEYS_PREV_WEAPON: &[KeyCode] = &[KeyCode::Char('[')];
const KEYS_NEXT_WEAPON: &[KeyCode] = &[KeyCode::Char(']')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::F(1)];
const KEYS_RESTART: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R'), KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

/// One-shot requests outside the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MetaInput {
    pub quit: bool,
    pub pause: bool,
    pub restart: bool,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the most recent
    /// drain_events() call.
    fresh_presses: Vec<KeyCode>,

    ctrl_c: bool,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release: false,
        }
    }

    /// Drain all pending terminal events and update key states.
    /// Call this once per frame, before the simulation step.
    pub fn drain_events(&mut self) {
        self.begin_frame();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }

        // Expire keys that have timed out (fallback for terminals without Release)
        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Movement and action buttons for this frame.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            up: self.any_held(KEYS_UP),
            down: self.any_held(KEYS_DOWN),
            left: self.any_held(KEYS_LEFT),
            right: self.any_held(KEYS_RIGHT),
            south: self.any_held(KEYS_ATTACK),
            east: self.any_held(KEYS_BOW),
            left_shoulder: self.any_held(KEYS_PREV_WEAPON),
            right_shoulder: self.any_held(KEYS_NEXT_WEAPON),
        }
    }

    pub fn meta_input(&self) -> MetaInput {
        MetaInput {
            quit: self.ctrl_c || self.any_pressed(KEYS_QUIT),
            pause: self.any_pressed(KEYS_PAUSE),
            restart: self.any_pressed(KEYS_RESTART),
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code)
            .map(|t| t.elapsed() < HOLD_TIMEOUT)
            .unwrap_or(false)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    // ── Internal ──

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }

        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            // Without enhancement, release is left to the timeout.
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent { code, modifiers: KeyModifiers::NONE, kind, state: KeyEventState::NONE }
    }

    #[test]
    fn held_keys_map_to_frame_input() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Char('d'), KeyEventKind::Press), Instant::now());
        input.apply(key(KeyCode::Char('z'), KeyEventKind::Press), Instant::now());
        let f = input.frame_input();
        assert!(f.right && f.south);
        assert!(!f.left && !f.east && !f.up);
    }

    #[test]
    fn repeat_is_not_a_fresh_press() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Char('p'), KeyEventKind::Press), Instant::now());
        assert!(input.meta_input().pause);

        input.begin_frame();
        input.apply(key(KeyCode::Char('p'), KeyEventKind::Repeat), Instant::now());
        assert!(!input.meta_input().pause);
    }

    #[test]
    fn release_honored_only_with_enhancement() {
        let mut input = InputState::new();
        input.apply(key(KeyCode::Left, KeyEventKind::Press), Instant::now());
        input.apply(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(input.frame_input().left);

        input.honor_release = true;
        input.apply(key(KeyCode::Left, KeyEventKind::Release), Instant::now());
        assert!(!input.frame_input().left);
    }

    #[test]
    fn ctrl_c_quits() {
        let mut input = InputState::new();
        let mut ev = key(KeyCode::Char('c'), KeyEventKind::Press);
        ev.modifiers = KeyModifiers::CONTROL;
        input.apply(ev, Instant::now());
        assert!(input.meta_input().quit);
        assert!(!input.is_held(KeyCode::Char('c')));
    }

    #[test]
    fn stale_keys_expire() {
        let mut input = InputState::new();
        let old = Instant::now() - HOLD_TIMEOUT * 2;
        input.apply(key(KeyCode::Up, KeyEventKind::Press), old);
        assert!(!input.frame_input().up);
    }
}
