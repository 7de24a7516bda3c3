/// Screen transitions.
///
/// Steady → Transitioning when the player's hitbox edge crosses a screen
/// edge that has a neighbour. At that moment the player is moved to the
/// mirrored entry point on the far side (inset by half the hitbox plus
/// `TRANSITION_BUFFER`). While transitioning the caller suspends the
/// simulation; `progress()` drives the slide. When the duration has
/// elapsed the world cursor advances in one step.
///
/// This is the only code that moves the world cursor.

use rand::RngCore;
use tracing::{debug, trace};

use crate::domain::entity::{Direction, Player};
use crate::domain::physics::{MapView, TRANSITION_BUFFER};
use super::world::World;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TransitionState {
    Steady,
    Transitioning { direction: Direction, elapsed_ms: f32 },
}

#[derive(Clone, Debug)]
pub struct TransitionController {
    pub state: TransitionState,
    pub duration_ms: f32,
}

impl TransitionController {
    pub fn new(duration_ms: f32) -> Self {
        TransitionController { state: TransitionState::Steady, duration_ms }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, TransitionState::Transitioning { .. })
    }

    pub fn direction(&self) -> Option<Direction> {
        match self.state {
            TransitionState::Transitioning { direction, .. } => Some(direction),
            TransitionState::Steady => None,
        }
    }

    /// Slide progress in [0, 1]; 0 when steady.
    pub fn progress(&self) -> f32 {
        match self.state {
            TransitionState::Transitioning { elapsed_ms, .. } if self.duration_ms > 0.0 => {
                (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
            }
            TransitionState::Transitioning { .. } => 1.0,
            TransitionState::Steady => 0.0,
        }
    }

    /// Check the player against the screen edges. Starts a transition and
    /// returns its direction if the player crossed into a neighbour;
    /// otherwise keeps the player inside the current screen.
    pub fn check(&mut self, player: &mut Player, map: &MapView) -> Option<Direction> {
        if self.is_active() { return None; }

        let half = player.hitbox / 2.0;
        let w = map.width as f32;
        let h = map.height as f32;

        let crossing = [
            (Direction::Right, player.x + half > w),
            (Direction::Left, player.x - half < 0.0),
            (Direction::Down, player.y + half > h),
            (Direction::Up, player.y - half < 0.0),
        ]
        .into_iter()
        .find(|&(dir, crossed)| crossed && map.has_exit(dir))
        .map(|(dir, _)| dir);

        let Some(direction) = crossing else {
            let (x, y) = map.clamp_inside(player.x, player.y, player.hitbox);
            if (x, y) != (player.x, player.y) {
                trace!(x, y, "clamped player inside screen");
            }
            player.x = x;
            player.y = y;
            return None;
        };

        let inset = half + TRANSITION_BUFFER;
        match direction {
            Direction::Right => player.x = inset,
            Direction::Left => player.x = w - inset,
            Direction::Down => player.y = inset,
            Direction::Up => player.y = h - inset,
        }
        debug!(?direction, "transition started");
        self.state = TransitionState::Transitioning { direction, elapsed_ms: 0.0 };
        Some(direction)
    }

    /// Advance a running transition. On completion the world cursor moves
    /// and the player is freed from any wall at the entry point. Returns
    /// true on the frame the transition completes.
    pub fn update(&mut self, dt_ms: f32, world: &mut World, player: &mut Player, rng: &mut dyn RngCore) -> bool {
        let TransitionState::Transitioning { direction, elapsed_ms } = self.state else {
            return false;
        };
        let elapsed_ms = elapsed_ms + dt_ms;
        if elapsed_ms < self.duration_ms {
            self.state = TransitionState::Transitioning { direction, elapsed_ms };
            return false;
        }

        self.state = TransitionState::Steady;
        world.change_screen(direction, rng);
        let map = world.map_view();
        let has_key = player.inventory.has_key();
        let (x, y) = map.unstuck(player.x, player.y, player.hitbox, has_key);
        player.x = x;
        player.y = y;
        true
    }

    /// Abort a running transition without moving the cursor. The player
    /// keeps the entry-point position.
    #[cfg(test)]
    pub fn cancel(&mut self) {
        self.state = TransitionState::Steady;
    }
}
