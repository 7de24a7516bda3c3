/// The step function: advances the game by one frame.
///
/// Processing order:
///   1. Frame delta clamp, pause / game-over gate
///   2. Running transition (nothing else moves while it runs)
///   3. Player timers
///   4. Player movement + collision (knockback or input)
///   5. Player actions (attack, bow, weapon switch)
///   6. Item pickup
///   7. Combat (attacks, particles, contact damage)
///   8. Enemy AI (bury dead, behaviors, clear check) + enemy shots
///   9. Death check
///  10. Screen-edge check (may start a transition)
///  11. Status message
///
/// Combat sees the player's new position; enemies act after combat, so an
/// enemy killed this frame never gets a turn.

use crate::domain::combat::CombatEvent;
use crate::domain::entity::{AttackOwner, Direction, FrameInput, PlayerState, Weapon};
use super::event::GameEvent;
use super::game::{GameState, Phase};

const MESSAGE_MS: f32 = 2000.0;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(game: &mut GameState, input: FrameInput, dt_ms: f32) -> Vec<GameEvent> {
    let dt_ms = dt_ms.clamp(0.0, game.tuning.max_frame_ms as f32);
    let prev_input = std::mem::replace(&mut game.last_input, input);
    if game.paused || game.phase == Phase::GameOver { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    game.elapsed_ms += dt_ms;
    advance(game, input, prev_input, dt_ms, &mut events);
    resolve_message(game, dt_ms, &events);
    events
}

fn advance(game: &mut GameState, input: FrameInput, prev_input: FrameInput, dt_ms: f32, events: &mut Vec<GameEvent>) {
    if game.phase == Phase::Transition {
        resolve_transition(game, dt_ms, events);
        return;
    }

    game.player.tick_timers(dt_ms);
    resolve_player_movement(game, input, dt_ms);
    resolve_player_actions(game, input, prev_input, events);
    resolve_pickup(game, events);
    resolve_combat(game, dt_ms, events);
    resolve_enemies(game, dt_ms, events);
    if resolve_death(game, events) { return; }
    resolve_screen_edge(game, events);
}

/// The newest describable event replaces the status line.
fn resolve_message(game: &mut GameState, dt_ms: f32, events: &[GameEvent]) {
    game.message_ms = (game.message_ms - dt_ms).max(0.0);
    if game.message_ms == 0.0 {
        game.message.clear();
    }
    if let Some(text) = events.iter().rev().find_map(GameEvent::describe) {
        game.message = text;
        game.message_ms = MESSAGE_MS;
    }
}

// ══════════════════════════════════════════════════════════════
// Transition
// ══════════════════════════════════════════════════════════════

fn resolve_transition(game: &mut GameState, dt_ms: f32, events: &mut Vec<GameEvent>) {
    let done = game.transition.update(dt_ms, &mut game.world, &mut game.player, &mut game.rng);
    if done {
        game.phase = Phase::Playing;
        events.push(GameEvent::ScreenEntered { screen: game.world.cursor() });
    }
}

fn resolve_screen_edge(game: &mut GameState, events: &mut Vec<GameEvent>) {
    let map = game.world.map_view();
    if let Some(direction) = game.transition.check(&mut game.player, &map) {
        game.combat.clear();
        game.phase = Phase::Transition;
        events.push(GameEvent::TransitionStarted { direction });
    }
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

fn resolve_player_movement(game: &mut GameState, input: FrameInput, dt_ms: f32) {
    let player = &mut game.player;
    let map = game.world.map_view();
    let has_key = player.inventory.has_key();
    let from = (player.x, player.y);

    if let Some(mut kb) = player.knockback {
        if let Some((dx, dy)) = kb.advance(dt_ms) {
            let to = map.resolve_move(from, (from.0 + dx, from.1 + dy), player.hitbox, has_key);
            player.x = to.0;
            player.y = to.1;
        }
        player.knockback = if kb.is_active() { Some(kb) } else { None };
        return;
    }
    if !player.is_free() { return; }

    let (dx, dy) = input.movement();
    if dx == 0.0 && dy == 0.0 {
        player.set_state(PlayerState::Idle);
        return;
    }

    // Diagonal speed equals straight speed.
    let len = (dx * dx + dy * dy).sqrt();
    let dist = game.tuning.player_speed * dt_ms / 1000.0;
    let to = (from.0 + dx / len * dist, from.1 + dy / len * dist);
    let to = map.resolve_move(from, to, player.hitbox, has_key);
    player.x = to.0;
    player.y = to.1;
    player.direction = if dy != 0.0 {
        if dy > 0.0 { Direction::Down } else { Direction::Up }
    } else {
        Direction::facing(dx, dy)
    };
    player.set_state(PlayerState::Walking);
}

fn resolve_player_actions(game: &mut GameState, input: FrameInput, prev: FrameInput, events: &mut Vec<GameEvent>) {
    let player = &mut game.player;
    if !player.is_free() { return; }

    if input.left_shoulder && !prev.left_shoulder || input.right_shoulder && !prev.right_shoulder {
        let before = player.equipped;
        player.cycle_weapon(input.right_shoulder);
        if let Some(weapon) = player.equipped.filter(|_| player.equipped != before) {
            events.push(GameEvent::WeaponSwitched { weapon });
        }
    }

    if player.attack_cooldown_ms > 0.0 { return; }
    let weapon = if input.south {
        player.equipped
    } else if input.east {
        Some(Weapon::Bow)
    } else {
        None
    };
    let Some(weapon) = weapon.filter(|w| player.can_use(*w)) else { return };

    if weapon == Weapon::Bow {
        player.inventory.arrows -= 1;
    }
    player.set_state(PlayerState::Attacking);
    player.attack_cooldown_ms = weapon.spec().cooldown_ms;

    let mut cev = Vec::new();
    game.combat.create_attack(&game.player, weapon, &mut cev);
    forward_combat_events(game, cev, events);
}

fn resolve_pickup(game: &mut GameState, events: &mut Vec<GameEvent>) {
    let (x, y) = (game.player.x, game.player.y);
    if x < 0.0 || y < 0.0 { return; }
    let (tx, ty) = (x.floor() as usize, y.floor() as usize);
    let Some(item) = game.world.item_at(tx, ty) else { return };
    if game.world.remove_item(tx, ty) {
        game.player.add_item(item);
        events.push(GameEvent::ItemCollected { item });
    }
}

fn resolve_death(game: &mut GameState, events: &mut Vec<GameEvent>) -> bool {
    if !game.player.is_dead() { return false; }
    tracing::info!(screen = ?game.world.cursor(), "player died");
    game.phase = Phase::GameOver;
    events.push(GameEvent::PlayerDied);
    true
}

// ══════════════════════════════════════════════════════════════
// Combat and enemies
// ══════════════════════════════════════════════════════════════

fn resolve_combat(game: &mut GameState, dt_ms: f32, events: &mut Vec<GameEvent>) {
    let mut cev = Vec::new();
    let (map, enemies) = game.world.combat_parts();
    game.combat.update(dt_ms, &mut game.player, enemies, &map, &mut cev);
    forward_combat_events(game, cev, events);
}

fn resolve_enemies(game: &mut GameState, dt_ms: f32, events: &mut Vec<GameEvent>) {
    let shots = game.world.update(dt_ms, &game.player, &mut game.rng, events);
    let mut cev = Vec::new();
    for shot in &shots {
        game.combat.spawn_shot(shot, &mut cev);
    }
    forward_combat_events(game, cev, events);
}

fn forward_combat_events(game: &GameState, cev: Vec<CombatEvent>, events: &mut Vec<GameEvent>) {
    events.extend(cev.into_iter().map(|e| match e {
        CombatEvent::Launched { owner, weapon } => GameEvent::AttackLaunched {
            weapon,
            by_player: owner == AttackOwner::Player,
        },
        CombatEvent::EnemyHit { id, x, y, .. } => GameEvent::EnemyHit { id, x, y },
        CombatEvent::PlayerHit { damage, .. } => GameEvent::PlayerHurt { damage, health: game.player.health },
        CombatEvent::Blocked { x, y } => GameEvent::AttackBlocked { x, y },
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningConfig;
    use crate::domain::bestiary::EnemyKind;
    use crate::domain::entity::{Item, PLAYER_HITBOX};
    use crate::domain::tile::Tile;
    use crate::sim::level::LoadedWorld;
    use crate::sim::world::{Screen, Spawn, World, SCREEN_HEIGHT, SCREEN_WIDTH};

    fn open_layout() -> Vec<Vec<Tile>> {
        vec![vec![Tile::Empty; SCREEN_WIDTH]; SCREEN_HEIGHT]
    }

    fn game_with(screens: Vec<Vec<Screen>>, start: (f32, f32)) -> GameState {
        let mut rng = GameState::make_rng(Some(3));
        let world = World::new(screens, (0, 0), &mut rng).unwrap();
        GameState::new(LoadedWorld { world, start }, TuningConfig::default(), rng)
    }

    fn open_game(start: (f32, f32)) -> GameState {
        game_with(vec![vec![Screen::new(open_layout(), vec![], None)]], start)
    }

    fn run(game: &mut GameState, input: FrameInput, frames: usize) -> Vec<GameEvent> {
        (0..frames).flat_map(|_| step(game, input, 16.0)).collect()
    }

    #[test]
    fn walking_moves_at_player_speed() {
        let mut g = open_game((5.5, 5.5));
        let right = FrameInput { right: true, ..Default::default() };
        run(&mut g, right, 10);
        assert!((g.player.x - (5.5 + 4.0 * 0.16)).abs() < 1e-3);
        assert_eq!(g.player.direction, Direction::Right);
        assert_eq!(g.player.state, PlayerState::Walking);
        run(&mut g, FrameInput::default(), 1);
        assert_eq!(g.player.state, PlayerState::Idle);
    }

    #[test]
    fn large_frames_are_clamped() {
        let mut g = open_game((5.5, 5.5));
        let right = FrameInput { right: true, ..Default::default() };
        step(&mut g, right, 5000.0);
        assert!((g.player.x - (5.5 + 4.0 * 0.032)).abs() < 1e-3);
    }

    #[test]
    fn pickup_and_attack_with_sword() {
        let mut layout = open_layout();
        layout[5][6] = Tile::Sword;
        let mut g = game_with(vec![vec![Screen::new(layout, vec![], None)]], (6.5, 5.5));

        let events = run(&mut g, FrameInput::default(), 1);
        assert!(events.contains(&GameEvent::ItemCollected { item: Item::Sword }));
        assert_eq!(g.message, "Got a sword");
        assert_eq!(g.player.equipped, Some(Weapon::Sword));
        assert_eq!(g.world.item_at(6, 5), None);

        let events = run(&mut g, FrameInput { south: true, ..Default::default() }, 1);
        assert!(events.contains(&GameEvent::AttackLaunched { weapon: Weapon::Sword, by_player: true }));
        assert_eq!(g.player.state, PlayerState::Attacking);
        assert_eq!(g.combat.attacks.len(), 1);

        // Cooldown: holding the button does not swing again immediately.
        let events = run(&mut g, FrameInput { south: true, ..Default::default() }, 1);
        assert!(!events.iter().any(|e| matches!(e, GameEvent::AttackLaunched { .. })));
    }

    #[test]
    fn bow_needs_and_spends_arrows() {
        let mut g = open_game((5.5, 5.5));
        g.player.add_item(Item::Bow);
        let fire = FrameInput { east: true, ..Default::default() };
        let events = run(&mut g, fire, 1);
        assert!(events.is_empty());

        g.player.add_item(Item::Arrow);
        let events = run(&mut g, fire, 1);
        assert!(events.contains(&GameEvent::AttackLaunched { weapon: Weapon::Bow, by_player: true }));
        assert_eq!(g.player.inventory.arrows, 4);
    }

    #[test]
    fn shoulder_switch_is_edge_triggered() {
        let mut g = open_game((5.5, 5.5));
        g.player.add_item(Item::Sword);
        g.player.add_item(Item::Bow);
        let next = FrameInput { right_shoulder: true, ..Default::default() };
        let events = run(&mut g, next, 5);
        let switches = events.iter().filter(|e| matches!(e, GameEvent::WeaponSwitched { .. })).count();
        assert_eq!(switches, 1);
        assert_eq!(g.player.equipped, Some(Weapon::Bow));
    }

    #[test]
    fn killing_the_last_enemy_clears_the_screen() {
        let spawns = vec![Spawn { kind: EnemyKind::Slime, x: 7.5, y: 5.5 }];
        let mut g = game_with(vec![vec![Screen::new(open_layout(), spawns, None)]], (5.5, 5.5));
        g.world.bonus_drop_chance = 0.0;
        g.player.add_item(Item::Sword);
        g.player.direction = Direction::Right;
        g.player.max_health = 50;
        g.player.health = 50;

        let mut events = Vec::new();
        let attack = FrameInput { south: true, ..Default::default() };
        for _ in 0..400 {
            events.extend(step(&mut g, attack, 16.0));
            if events.iter().any(|e| matches!(e, GameEvent::ScreenCleared { .. })) { break; }
        }
        assert!(events.iter().any(|e| matches!(e, GameEvent::EnemyKilled { kind: EnemyKind::Slime, .. })));
        assert!(events.contains(&GameEvent::ScreenCleared { screen: (0, 0) }));
        assert!(g.world.current().cleared);
    }

    #[test]
    fn death_ends_the_game() {
        let mut g = open_game((5.5, 5.5));
        g.player.health = 0;
        let events = run(&mut g, FrameInput::default(), 1);
        assert_eq!(events, vec![GameEvent::PlayerDied]);
        assert_eq!(g.phase, Phase::GameOver);
        assert!(run(&mut g, FrameInput { right: true, ..Default::default() }, 3).is_empty());
    }

    #[test]
    fn paused_game_does_not_advance() {
        let mut g = open_game((5.5, 5.5));
        g.toggle_pause();
        run(&mut g, FrameInput { right: true, ..Default::default() }, 10);
        assert_eq!(g.player.x, 5.5);
    }

    #[test]
    fn walking_off_the_edge_transitions() {
        let screens = vec![vec![
            Screen::new(open_layout(), vec![], None),
            Screen::new(open_layout(), vec![], None),
        ]];
        let mut g = game_with(screens, (SCREEN_WIDTH as f32 - 0.5, 6.5));
        let right = FrameInput { right: true, ..Default::default() };

        let events = run(&mut g, right, 10);
        assert!(events.contains(&GameEvent::TransitionStarted { direction: Direction::Right }));
        assert_eq!(g.phase, Phase::Transition);
        assert!(g.combat.attacks.is_empty());

        // The player is frozen at the entry point while the slide runs.
        let entry_x = g.player.x;
        assert!(entry_x < 1.0 + PLAYER_HITBOX);
        let events = run(&mut g, right, 40);
        assert!(events.contains(&GameEvent::ScreenEntered { screen: (1, 0) }));
        assert_eq!(g.world.cursor(), (1, 0));
        assert_eq!(g.phase, Phase::Playing);
    }
}
