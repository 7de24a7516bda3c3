/// The session aggregate: world, player, combat and the transition
/// controller, plus the run phase and the RNG everything draws from.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::info;

use crate::config::TuningConfig;
use crate::domain::combat::CombatSystem;
use crate::domain::entity::{FrameInput, Player};
use super::level::LoadedWorld;
use super::transition::TransitionController;
use super::world::World;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// A screen transition is running; the simulation is suspended.
    Transition,
    GameOver,
}

#[derive(Debug)]
pub struct GameState {
    pub world: World,
    pub player: Player,
    pub combat: CombatSystem,
    pub transition: TransitionController,
    pub phase: Phase,
    pub paused: bool,
    pub tuning: TuningConfig,
    pub rng: SmallRng,
    /// Previous frame's input, for edge-triggered buttons.
    pub last_input: FrameInput,
    pub elapsed_ms: f32,
    /// Status line text and how long it stays up.
    pub message: String,
    pub message_ms: f32,
}

impl GameState {
    pub fn new(loaded: LoadedWorld, tuning: TuningConfig, rng: SmallRng) -> Self {
        let LoadedWorld { mut world, start } = loaded;
        world.bonus_drop_chance = tuning.bonus_drop_chance;

        let mut player = Player::new(start.0, start.1);
        let (x, y) = world.map_view().unstuck(player.x, player.y, player.hitbox, false);
        player.x = x;
        player.y = y;

        GameState {
            world,
            player,
            combat: CombatSystem::new(),
            transition: TransitionController::new(tuning.transition_ms as f32),
            phase: Phase::Playing,
            paused: false,
            tuning,
            rng,
            last_input: FrameInput::default(),
            elapsed_ms: 0.0,
            message: String::new(),
            message_ms: 0.0,
        }
    }

    /// Seeded when `seed` is given, otherwise from OS entropy.
    pub fn make_rng(seed: Option<u64>) -> SmallRng {
        match seed {
            Some(s) => SmallRng::seed_from_u64(s),
            None => SmallRng::from_entropy(),
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.phase == Phase::GameOver { return; }
        self.paused = !self.paused;
        info!(paused = self.paused, "pause toggled");
    }

    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }
}
