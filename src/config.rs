/// `config.toml` loader.
///
/// Sections: `[tuning]` simulation constants, `[gamepad]` button names per
/// action, `[general]` world file and RNG seed. Every key is optional; a
/// missing or broken file means defaults.

use serde::Deserialize;
use std::path::PathBuf;
use tracing::{info, warn};

// ── Resolved config ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub tuning: TuningConfig,
    pub gamepad: GamepadConfig,
    /// Resolved world file; `None` means the built-in world.
    pub world_file: Option<PathBuf>,
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TuningConfig {
    /// Player walking speed, tiles per second.
    pub player_speed: f32,
    /// Upper bound on one frame's delta time.
    pub max_frame_ms: u64,
    pub transition_ms: u64,
    /// Chance of a heart appearing when a screen is cleared.
    pub bonus_drop_chance: f32,
    pub frame_sleep_ms: u64,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub attack: Vec<String>,
    pub fire_bow: Vec<String>,
    pub prev_weapon: Vec<String>,
    pub next_weapon: Vec<String>,
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
}

impl Default for TuningConfig {
    fn default() -> Self {
        let t = TomlTuning::default();
        TuningConfig {
            player_speed: t.player_speed,
            max_frame_ms: t.max_frame_ms,
            transition_ms: t.transition_ms,
            bonus_drop_chance: t.bonus_drop_chance,
            frame_sleep_ms: t.frame_sleep_ms,
        }
    }
}

// ── TOML schema ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    tuning: TomlTuning,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTuning {
    #[serde(default = "default_player_speed")]
    player_speed: f32,
    #[serde(default = "default_max_frame")]
    max_frame_ms: u64,
    #[serde(default = "default_transition")]
    transition_ms: u64,
    #[serde(default = "default_bonus_drop")]
    bonus_drop_chance: f32,
    #[serde(default = "default_frame_sleep")]
    frame_sleep_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_attack")]
    attack: Vec<String>,
    #[serde(default = "default_fire_bow")]
    fire_bow: Vec<String>,
    #[serde(default = "default_prev_weapon")]
    prev_weapon: Vec<String>,
    #[serde(default = "default_next_weapon")]
    next_weapon: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    world_file: Option<String>,
    #[serde(default)]
    seed: Option<u64>,
}

// ── Defaults ──

fn default_player_speed() -> f32 { 4.0 }
fn default_max_frame() -> u64 { 32 }
fn default_transition() -> u64 { 500 }
fn default_bonus_drop() -> f32 { 0.3 }
fn default_frame_sleep() -> u64 { 8 }

fn default_attack() -> Vec<String> { vec!["A".into()] }
fn default_fire_bow() -> Vec<String> { vec!["B".into(), "X".into()] }
fn default_prev_weapon() -> Vec<String> { vec!["L1".into()] }
fn default_next_weapon() -> Vec<String> { vec!["R1".into()] }
fn default_confirm() -> Vec<String> { vec!["Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }

impl Default for TomlTuning {
    fn default() -> Self {
        TomlTuning {
            player_speed: default_player_speed(),
            max_frame_ms: default_max_frame(),
            transition_ms: default_transition(),
            bonus_drop_chance: default_bonus_drop(),
            frame_sleep_ms: default_frame_sleep(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            attack: default_attack(),
            fire_bow: default_fire_bow(),
            prev_weapon: default_prev_weapon(),
            next_weapon: default_next_weapon(),
            confirm: default_confirm(),
            cancel: default_cancel(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::from_toml(toml_cfg, &search_dirs)
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Relative world paths are searched next to the config
        let world_file = toml_cfg.general.world_file.map(|name| {
            let path = PathBuf::from(&name);
            if path.is_absolute() {
                path
            } else {
                search_dirs.iter()
                    .map(|d| d.join(&name))
                    .find(|p| p.is_file())
                    .unwrap_or(path)
            }
        });

        let t = toml_cfg.tuning;
        if !(0.0..=1.0).contains(&t.bonus_drop_chance) {
            warn!(chance = t.bonus_drop_chance, "bonus_drop_chance outside [0, 1], clamping");
        }

        GameConfig {
            tuning: TuningConfig {
                player_speed: t.player_speed.max(0.1),
                max_frame_ms: t.max_frame_ms.max(1),
                transition_ms: t.transition_ms,
                bonus_drop_chance: t.bonus_drop_chance.clamp(0.0, 1.0),
                frame_sleep_ms: t.frame_sleep_ms,
            },
            gamepad: GamepadConfig {
                attack: toml_cfg.gamepad.attack,
                fire_bow: toml_cfg.gamepad.fire_bow,
                prev_weapon: toml_cfg.gamepad.prev_weapon,
                next_weapon: toml_cfg.gamepad.next_weapon,
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
            },
            world_file,
            seed: toml_cfg.general.seed,
        }
    }
}

/// Directories searched for config.toml: the executable's, then the
/// working directory. Never empty.
fn candidate_dirs() -> Vec<PathBuf> {
    let exe_dir = std::env::current_exe()
        .ok()
        .map(|exe| exe.canonicalize().unwrap_or(exe))
        .and_then(|exe| exe.parent().map(PathBuf::from));
    let cwd = std::env::current_dir().ok();

    let mut dirs: Vec<PathBuf> = Vec::with_capacity(2);
    for dir in [exe_dir, cwd].into_iter().flatten() {
        if !dirs.contains(&dir) {
            dirs.push(dir);
        }
    }
    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }
    dirs
}

/// First readable config.toml in `search_dirs`, or defaults.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    let found = search_dirs.iter().map(|d| d.join("config.toml")).find(|p| p.is_file());
    let Some(path) = found else { return TomlConfig::default() };
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!(path = %path.display(), "config loaded");
            parse_toml(&text)
        }
        Err(e) => {
            warn!(path = %path.display(), "could not read config: {e}");
            TomlConfig::default()
        }
    }
}

fn parse_toml(text: &str) -> TomlConfig {
    match toml::from_str::<TomlConfig>(text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("config.toml parse error, using defaults: {e}");
            TomlConfig::default()
        }
    }
}
