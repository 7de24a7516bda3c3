/// Gamepad input using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml.
/// Default mapping:
///   D-pad / Left Stick    →  Movement
///   A                     →  Attack (equipped weapon)
///   B / X                 →  Fire bow
///   L1 / R1               →  Previous / next weapon
///   Start                 →  Pause, restart after game over
///   Select                →  Quit

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
use tracing::{info, warn};

use crate::config::GamepadConfig;
use crate::domain::entity::{Direction, FrameInput};
use super::input::MetaInput;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Face buttons use the Xbox layout names; aliases accept compass names.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,
    B,
    X,
    Y,
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
}

const BTN_COUNT: usize = 10;

/// Config names, matched case-insensitively.
const BUTTON_NAMES: &[(&str, Btn)] = &[
    ("a", Btn::A), ("south", Btn::A),
    ("b", Btn::B), ("east", Btn::B),
    ("x", Btn::X), ("west", Btn::X),
    ("y", Btn::Y), ("north", Btn::Y),
    ("l1", Btn::L1), ("lb", Btn::L1), ("lefttrigger", Btn::L1),
    ("r1", Btn::R1), ("rb", Btn::R1), ("righttrigger", Btn::R1),
    ("l2", Btn::L2), ("lt", Btn::L2), ("lefttrigger2", Btn::L2),
    ("r2", Btn::R2), ("rt", Btn::R2), ("righttrigger2", Btn::R2),
    ("start", Btn::Start),
    ("select", Btn::Select), ("back", Btn::Select),
];

#[cfg(feature = "gamepad")]
const GILRS_BUTTONS: [(Button, Btn); BTN_COUNT] = [
    (Button::South, Btn::A),
    (Button::East, Btn::B),
    (Button::West, Btn::X),
    (Button::North, Btn::Y),
    (Button::LeftTrigger, Btn::L1),
    (Button::RightTrigger, Btn::R1),
    (Button::LeftTrigger2, Btn::L2),
    (Button::RightTrigger2, Btn::R2),
    (Button::Start, Btn::Start),
    (Button::Select, Btn::Select),
];

impl Btn {
    fn from_name(name: &str) -> Option<Btn> {
        let name = name.trim();
        BUTTON_NAMES.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|&(_, b)| b)
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        GILRS_BUTTONS.iter().find(|(g, _)| *g == btn).map(|&(_, b)| b)
    }
}

/// `held` is level-triggered, `just_pressed` is set for one frame.
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held { self.just_pressed = true; }
        self.held = held;
    }
}

/// Action-to-button mapping.
#[derive(Debug)]
struct ActionMap {
    attack: Vec<Btn>,
    fire_bow: Vec<Btn>,
    prev_weapon: Vec<Btn>,
    next_weapon: Vec<Btn>,
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
}

impl ActionMap {
    /// Unknown names are skipped; an action left with no buttons keeps
    /// its default.
    fn from_config(cfg: &GamepadConfig) -> Self {
        fn parse_list(names: &[String], fallback: &[Btn]) -> Vec<Btn> {
            let mut out = Vec::new();
            for name in names {
                match Btn::from_name(name) {
                    Some(b) => out.push(b),
                    None => warn!(name = %name, "unknown gamepad button name"),
                }
            }
            if out.is_empty() { fallback.to_vec() } else { out }
        }
        ActionMap {
            attack: parse_list(&cfg.attack, &[Btn::A]),
            fire_bow: parse_list(&cfg.fire_bow, &[Btn::B, Btn::X]),
            prev_weapon: parse_list(&cfg.prev_weapon, &[Btn::L1]),
            next_weapon: parse_list(&cfg.next_weapon, &[Btn::R1]),
            confirm: parse_list(&cfg.confirm, &[Btn::Start]),
            cancel: parse_list(&cfg.cancel, &[Btn::Select]),
        }
    }
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    /// Indexed by `Btn as usize`.
    buttons: [BtnState; BTN_COUNT],
    /// Indexed by `Direction::index()`.
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

impl GamepadState {
    pub fn new(cfg: &GamepadConfig) -> Self {
        #[cfg(feature = "gamepad")]
        let gilrs = Gilrs::new()
            .map_err(|e| warn!("gamepad support unavailable: {e}"))
            .ok();
        #[cfg(feature = "gamepad")]
        let connected = gilrs.as_ref().is_some_and(|g| g.gamepads().next().is_some());
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        if connected { info!("gamepad connected"); }

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs,
            buttons: [BtnState::default(); BTN_COUNT],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::from_config(cfg),
            connected,
        }
    }

    /// Call once per frame, before reading inputs.
    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = self.gilrs.as_mut() else { return };

        let pending: Vec<EventType> = std::iter::from_fn(|| gilrs.next_event()).map(|e| e.event).collect();

        for event in pending {
            match event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_gilrs_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_gilrs_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.derive_stick();
    }

    #[cfg(feature = "gamepad")]
    fn set_gilrs_button(&mut self, gilrs_btn: Button, held: bool) {
        let dir = match gilrs_btn {
            Button::DPadUp => Some(Direction::Up),
            Button::DPadDown => Some(Direction::Down),
            Button::DPadLeft => Some(Direction::Left),
            Button::DPadRight => Some(Direction::Right),
            _ => None,
        };
        if let Some(dir) = dir {
            self.dpad[dir.index()].set(held);
        } else if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.set_button(btn, held);
        }
    }

    fn set_button(&mut self, btn: Btn, held: bool) {
        self.buttons[btn as usize].set(held);
    }

    /// Digital directions from the analog stick (y up is positive).
    fn derive_stick(&mut self) {
        let (x, y) = (self.stick_x, self.stick_y);
        self.stick[Direction::Left.index()].set(x < -STICK_DEADZONE);
        self.stick[Direction::Right.index()].set(x > STICK_DEADZONE);
        self.stick[Direction::Up.index()].set(y > STICK_DEADZONE);
        self.stick[Direction::Down.index()].set(y < -STICK_DEADZONE);
    }

    // ── Action queries (config-driven) ──

    fn any_held(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].held)
    }

    fn any_just_pressed(&self, btns: &[Btn]) -> bool {
        btns.iter().any(|&b| self.buttons[b as usize].just_pressed)
    }

    fn dir_held(&self, dir: Direction) -> bool {
        self.dpad[dir.index()].held || self.stick[dir.index()].held
    }

    pub fn frame_input(&self) -> FrameInput {
        let map = &self.action_map;
        FrameInput {
            up: self.dir_held(Direction::Up),
            down: self.dir_held(Direction::Down),
            left: self.dir_held(Direction::Left),
            right: self.dir_held(Direction::Right),
            south: self.any_held(&map.attack),
            east: self.any_held(&map.fire_bow),
            left_shoulder: self.any_held(&map.prev_weapon),
            right_shoulder: self.any_held(&map.next_weapon),
        }
    }

    /// Confirm doubles as pause and restart; the caller picks by phase.
    pub fn meta_input(&self) -> MetaInput {
        let confirm = self.any_just_pressed(&self.action_map.confirm);
        MetaInput {
            quit: self.any_just_pressed(&self.action_map.cancel),
            pause: confirm,
            restart: confirm,
        }
    }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}
