/// Entry point and game loop.

mod config;
mod domain;
mod logging;
mod sim;
mod ui;

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags};
use crossterm::execute;
use rand::RngCore;
use tracing::{error, info, warn};

use config::GameConfig;
use domain::entity::FrameInput;
use sim::event::GameEvent;
use sim::game::GameState;
use sim::level::{self, LevelError, LoadedWorld};
use sim::step;
use ui::gamepad::GamepadState;
use ui::input::{InputState, MetaInput};
use ui::renderer::Renderer;
use ui::sound::{Cue, SoundEngine};

fn main() {
    logging::init();
    let config = GameConfig::load();

    let mut rng = GameState::make_rng(config.seed);
    let loaded = match load_world(&config, &mut rng) {
        Ok(l) => l,
        Err(e) => {
            error!("no playable world: {e}");
            eprintln!("Could not load a world: {e}");
            return;
        }
    };
    let mut game = GameState::new(loaded, config.tuning.clone(), rng);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut kb = InputState::new();
    kb.honor_release = enable_key_release();

    let sound = SoundEngine::new();

    let result = game_loop(&mut game, &mut renderer, &mut kb, sound.as_ref(), &config);

    if kb.honor_release {
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
    }
    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    let world = &game.world;
    let cleared = (0..world.rows())
        .flat_map(|r| (0..world.cols()).map(move |c| (c, r)))
        .filter(|&(c, r)| world.screen_at(c, r).is_some_and(|s| s.cleared && s.visited))
        .count();
    println!();
    println!("Thanks for playing Overworld!");
    println!("Screens cleared: {cleared}");
}

fn game_loop(
    game: &mut GameState,
    renderer: &mut Renderer,
    kb: &mut InputState,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut gp = GamepadState::new(&config.gamepad);
    let frame_sleep = Duration::from_millis(config.tuning.frame_sleep_ms);
    let mut last_frame = Instant::now();

    loop {
        kb.drain_events();
        gp.update();

        let meta = merge_meta(kb.meta_input(), gp.meta_input());
        if meta.quit {
            info!("quit requested");
            break;
        }
        if game.is_over() {
            if meta.restart {
                restart(game, config)?;
                renderer.invalidate();
            }
        } else if meta.pause {
            game.toggle_pause();
        }

        let now = Instant::now();
        let dt_ms = now.duration_since(last_frame).as_secs_f32() * 1000.0;
        last_frame = now;

        let input = merge_input(kb.frame_input(), gp.frame_input());
        let events = step::step(game, input, dt_ms);
        process_sound_events(sound, &events);

        renderer.gamepad_connected = gp.connected;
        renderer.render(game)?;
        std::thread::sleep(frame_sleep);
    }

    Ok(())
}

/// The configured world file, or the built-in world when there is none
/// or it fails to load.
fn load_world(config: &GameConfig, rng: &mut dyn RngCore) -> Result<LoadedWorld, LevelError> {
    if let Some(path) = &config.world_file {
        match level::load_world_file(path, rng) {
            Ok(loaded) => return Ok(loaded),
            Err(e) => warn!("{e}; falling back to the built-in world"),
        }
    }
    level::builtin_world(rng)
}

fn restart(game: &mut GameState, config: &GameConfig) -> Result<(), LevelError> {
    let mut rng = GameState::make_rng(config.seed);
    let loaded = load_world(config, &mut rng)?;
    *game = GameState::new(loaded, config.tuning.clone(), rng);
    info!("game restarted");
    Ok(())
}

/// Ask the terminal for key release events. Returns true if it agreed.
fn enable_key_release() -> bool {
    if !crossterm::terminal::supports_keyboard_enhancement().unwrap_or(false) {
        return false;
    }
    execute!(
        io::stdout(),
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    )
    .is_ok()
}

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for cue in events.iter().filter_map(Cue::for_event) {
        sfx.play(cue);
    }
}

fn merge_input(a: FrameInput, b: FrameInput) -> FrameInput {
    FrameInput {
        up: a.up || b.up,
        down: a.down || b.down,
        left: a.left || b.left,
        right: a.right || b.right,
        south: a.south || b.south,
        east: a.east || b.east,
        left_shoulder: a.left_shoulder || b.left_shoulder,
        right_shoulder: a.right_shoulder || b.right_shoulder,
    }
}

fn merge_meta(a: MetaInput, b: MetaInput) -> MetaInput {
    MetaInput {
        quit: a.quit || b.quit,
        pause: a.pause || b.pause,
        restart: a.restart || b.restart,
    }
}
