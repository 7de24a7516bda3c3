/// Enemy AI: one strategy object per behavior kind.
///
/// Strategies are stateless unit structs; all per-enemy scratch lives on
/// the `Enemy` itself. Each update may change position, facing, state and
/// the enemy's own timers, and may request projectiles through the context.
///
/// Strategies propose positions freely (except teleport, which validates
/// its own target). The caller runs the proposal through collision.
///
///   Chase     walk straight at the player while in range.
///   Patrol    walk a square around the spawn point; chase when in range.
///   Ambush    wait unseen, then lunge fast; re-arm when the player
///             is very close or gets away.
///   Ranged    hold a band of distance and shoot.
///   Swarm     orbit the player on a slowly rotating circle.
///   Teleport  blink to a random spot near the player when too close
///             or too far.

use std::f32::consts::TAU;
use std::fmt;

use rand::{Rng, RngCore};

use super::entity::{Direction, Enemy, EnemyId, EnemyState, Weapon};
use super::physics::MapView;

/// Distance at which a chaser switches to its attack pose.
const ATTACK_RANGE: f32 = 1.5;

const PATROL_RADIUS: f32 = 2.0;
const PATROL_ARRIVE: f32 = 0.1;

/// An ambush re-arms when the player comes closer than this...
const AMBUSH_RELEASE_NEAR: f32 = 1.0;
/// ...or gets farther than this multiple of the detection range.
const AMBUSH_RELEASE_FACTOR: f32 = 2.0;

const RANGED_NEAR: f32 = 4.0;
const RANGED_FAR: f32 = 6.0;

const SWARM_RADIUS: f32 = 3.0;
/// Orbit angular speed, radians per millisecond.
const SWARM_RATE: f32 = 0.001;

const TELEPORT_NEAR: f32 = 2.0;
const TELEPORT_FAR: f32 = 5.0;
const TELEPORT_ATTEMPTS: usize = 10;
const TELEPORT_MIN_RADIUS: f32 = 3.0;
const TELEPORT_SPREAD: f32 = 2.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BehaviorKind {
    Chase,
    Patrol,
    Ambush,
    Ranged,
    Swarm,
    Teleport,
}

/// A projectile an enemy wants fired this frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shot {
    pub owner: EnemyId,
    pub weapon: Weapon,
    pub x: f32,
    pub y: f32,
    /// Unit direction toward the target.
    pub dx: f32,
    pub dy: f32,
    pub damage: i32,
}

/// Everything a strategy may look at or emit for one enemy update.
pub struct BehaviorCtx<'a, 'm> {
    pub dt_ms: f32,
    pub player_x: f32,
    pub player_y: f32,
    /// Euclidean distance enemy → player at the start of the update.
    pub dist: f32,
    pub map: &'a MapView<'m>,
    pub rng: &'a mut dyn RngCore,
    pub shots: &'a mut Vec<Shot>,
}

pub trait EnemyBehavior: fmt::Debug + Sync {
    fn kind(&self) -> BehaviorKind;
    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx);
}

#[derive(Debug)]
pub struct Chase;
#[derive(Debug)]
pub struct Patrol;
#[derive(Debug)]
pub struct Ambush;
#[derive(Debug)]
pub struct Ranged;
#[derive(Debug)]
pub struct Swarm;
#[derive(Debug)]
pub struct Teleport;

static CHASE: Chase = Chase;
static PATROL: Patrol = Patrol;
static AMBUSH: Ambush = Ambush;
static RANGED: Ranged = Ranged;
static SWARM: Swarm = Swarm;
static TELEPORT: Teleport = Teleport;

pub fn behavior_for(kind: BehaviorKind) -> &'static dyn EnemyBehavior {
    match kind {
        BehaviorKind::Chase => &CHASE,
        BehaviorKind::Patrol => &PATROL,
        BehaviorKind::Ambush => &AMBUSH,
        BehaviorKind::Ranged => &RANGED,
        BehaviorKind::Swarm => &SWARM,
        BehaviorKind::Teleport => &TELEPORT,
    }
}

// ── Movement helpers ──

/// Step toward (tx, ty) at `speed` tiles/s, never overshooting.
/// Updates facing.
fn move_toward(enemy: &mut Enemy, tx: f32, ty: f32, speed: f32, dt_ms: f32) {
    let dx = tx - enemy.x;
    let dy = ty - enemy.y;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= f32::EPSILON { return; }
    enemy.direction = Direction::facing(dx, dy);
    let step = speed * dt_ms / 1000.0;
    if step >= dist {
        enemy.x = tx;
        enemy.y = ty;
    } else {
        enemy.x += dx / dist * step;
        enemy.y += dy / dist * step;
    }
}

/// Step directly away from (tx, ty). Keeps facing the threat.
fn move_away(enemy: &mut Enemy, tx: f32, ty: f32, speed: f32, dt_ms: f32) {
    let dx = enemy.x - tx;
    let dy = enemy.y - ty;
    let dist = (dx * dx + dy * dy).sqrt();
    if dist <= f32::EPSILON { return; }
    enemy.direction = Direction::facing(-dx, -dy);
    let step = speed * dt_ms / 1000.0;
    enemy.x += dx / dist * step;
    enemy.y += dy / dist * step;
}

fn face_player(enemy: &mut Enemy, ctx: &BehaviorCtx) {
    let dx = ctx.player_x - enemy.x;
    let dy = ctx.player_y - enemy.y;
    if dx != 0.0 || dy != 0.0 {
        enemy.direction = Direction::facing(dx, dy);
    }
}

// ── Strategies ──

impl EnemyBehavior for Chase {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Chase }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        if ctx.dist > enemy.stats().detection_range {
            enemy.state = EnemyState::Idle;
            return;
        }
        move_toward(enemy, ctx.player_x, ctx.player_y, enemy.speed, ctx.dt_ms);
        enemy.state = if ctx.dist < ATTACK_RANGE { EnemyState::Attacking } else { EnemyState::Moving };
    }
}

impl EnemyBehavior for Patrol {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Patrol }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        if ctx.dist <= enemy.stats().detection_range {
            CHASE.update(enemy, ctx);
            return;
        }

        if enemy.patrol_points.is_empty() {
            let (sx, sy) = (enemy.spawn_x, enemy.spawn_y);
            enemy.patrol_points = vec![
                (sx - PATROL_RADIUS, sy - PATROL_RADIUS),
                (sx + PATROL_RADIUS, sy - PATROL_RADIUS),
                (sx + PATROL_RADIUS, sy + PATROL_RADIUS),
                (sx - PATROL_RADIUS, sy + PATROL_RADIUS),
            ];
            enemy.patrol_index = 0;
        }

        let (tx, ty) = enemy.patrol_points[enemy.patrol_index];
        if enemy.distance_to(tx, ty) < PATROL_ARRIVE {
            enemy.patrol_index = (enemy.patrol_index + 1) % enemy.patrol_points.len();
            return;
        }
        move_toward(enemy, tx, ty, enemy.speed, ctx.dt_ms);
        enemy.state = EnemyState::Moving;
    }
}

impl EnemyBehavior for Ambush {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Ambush }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        let stats = enemy.stats();
        if !enemy.ambush_triggered {
            if ctx.dist > stats.detection_range {
                enemy.state = EnemyState::Idle;
                return;
            }
            enemy.ambush_triggered = true;
        }

        // Lunges from the frame it springs.
        move_toward(enemy, ctx.player_x, ctx.player_y, stats.ambush_speed, ctx.dt_ms);
        enemy.state = EnemyState::Ambush;

        if ctx.dist < AMBUSH_RELEASE_NEAR || ctx.dist > stats.detection_range * AMBUSH_RELEASE_FACTOR {
            enemy.ambush_triggered = false;
            enemy.state = EnemyState::Idle;
        }
    }
}

impl EnemyBehavior for Ranged {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Ranged }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        let stats = enemy.stats();
        enemy.shoot_cooldown_ms = (enemy.shoot_cooldown_ms - ctx.dt_ms).max(0.0);

        if ctx.dist > stats.detection_range {
            enemy.state = EnemyState::Idle;
            return;
        }

        if ctx.dist < RANGED_NEAR {
            move_away(enemy, ctx.player_x, ctx.player_y, enemy.speed, ctx.dt_ms);
            enemy.state = EnemyState::Moving;
        } else if ctx.dist > RANGED_FAR {
            move_toward(enemy, ctx.player_x, ctx.player_y, enemy.speed, ctx.dt_ms);
            enemy.state = EnemyState::Moving;
        } else {
            face_player(enemy, ctx);
            if enemy.shoot_cooldown_ms <= 0.0 && ctx.dist > f32::EPSILON {
                ctx.shots.push(Shot {
                    owner: enemy.id,
                    weapon: stats.projectile,
                    x: enemy.x,
                    y: enemy.y,
                    dx: (ctx.player_x - enemy.x) / ctx.dist,
                    dy: (ctx.player_y - enemy.y) / ctx.dist,
                    damage: enemy.damage,
                });
                enemy.shoot_cooldown_ms = stats.shoot_cooldown_ms;
                enemy.state = EnemyState::Casting;
            } else {
                enemy.state = EnemyState::Idle;
            }
        }
    }
}

impl EnemyBehavior for Swarm {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Swarm }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        if ctx.dist > enemy.stats().detection_range {
            enemy.state = EnemyState::Idle;
            return;
        }
        let angle = enemy.behavior_ms * SWARM_RATE + enemy.swarm_offset;
        let tx = ctx.player_x + angle.cos() * SWARM_RADIUS;
        let ty = ctx.player_y + angle.sin() * SWARM_RADIUS;
        move_toward(enemy, tx, ty, enemy.speed, ctx.dt_ms);
        enemy.state = EnemyState::Moving;
    }
}

impl EnemyBehavior for Teleport {
    fn kind(&self) -> BehaviorKind { BehaviorKind::Teleport }

    fn update(&self, enemy: &mut Enemy, ctx: &mut BehaviorCtx) {
        if enemy.teleport_cooldown_ms > 0.0 {
            enemy.teleport_cooldown_ms = (enemy.teleport_cooldown_ms - ctx.dt_ms).max(0.0);
            return;
        }

        let stats = enemy.stats();
        if ctx.dist > stats.detection_range {
            enemy.state = EnemyState::Idle;
            return;
        }

        if ctx.dist < TELEPORT_NEAR || ctx.dist > TELEPORT_FAR {
            for _ in 0..TELEPORT_ATTEMPTS {
                let angle = ctx.rng.gen::<f32>() * TAU;
                let radius = TELEPORT_MIN_RADIUS + ctx.rng.gen::<f32>() * TELEPORT_SPREAD;
                let nx = ctx.player_x + angle.cos() * radius;
                let ny = ctx.player_y + angle.sin() * radius;
                if ctx.map.contains(nx, ny, enemy.hitbox)
                    && ctx.map.is_walkable(nx, ny, enemy.hitbox, false)
                {
                    enemy.x = nx;
                    enemy.y = ny;
                    face_player(enemy, ctx);
                    break;
                }
            }
            // Failed attempts still cost the cooldown.
            enemy.teleport_cooldown_ms = stats.teleport_cooldown_ms;
            enemy.state = EnemyState::Fading;
        } else {
            move_toward(enemy, ctx.player_x, ctx.player_y, enemy.speed, ctx.dt_ms);
            enemy.state = EnemyState::Moving;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::bestiary::EnemyKind;
    use crate::domain::tile::Tile;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const W: usize = 20;
    const H: usize = 12;

    fn open_tiles() -> Vec<Vec<Tile>> {
        vec![vec![Tile::Empty; W]; H]
    }

    fn view(tiles: &[Vec<Tile>]) -> MapView<'_> {
        MapView { tiles, width: W, height: H, exits: [false; 4] }
    }

    /// Run one update of `enemy` against a player at (px, py).
    fn tick(enemy: &mut Enemy, px: f32, py: f32, dt_ms: f32, map: &MapView, rng: &mut StdRng) -> Vec<Shot> {
        let mut shots = Vec::new();
        let dist = enemy.distance_to(px, py);
        let mut ctx = BehaviorCtx {
            dt_ms, player_x: px, player_y: py, dist,
            map, rng, shots: &mut shots,
        };
        let behavior = enemy.behavior;
        behavior.update(enemy, &mut ctx);
        enemy.behavior_ms += dt_ms;
        shots
    }

    #[test]
    fn behavior_objects_report_their_kind() {
        for kind in [
            BehaviorKind::Chase, BehaviorKind::Patrol, BehaviorKind::Ambush,
            BehaviorKind::Ranged, BehaviorKind::Swarm, BehaviorKind::Teleport,
        ] {
            assert_eq!(behavior_for(kind).kind(), kind);
        }
    }

    // ── Chase ──

    #[test]
    fn chaser_closes_distance_in_range() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(1);
        let mut e = Enemy::new(0, EnemyKind::Slime, 5.0, 5.0, &mut rng);
        let before = e.distance_to(8.0, 5.0);
        tick(&mut e, 8.0, 5.0, 100.0, &map, &mut rng);
        assert!(e.distance_to(8.0, 5.0) < before);
        assert_eq!(e.direction, Direction::Right);
        assert_eq!(e.state, EnemyState::Moving);
    }

    #[test]
    fn chaser_ignores_distant_player() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(1);
        let mut e = Enemy::new(0, EnemyKind::Slime, 1.0, 1.0, &mut rng);
        tick(&mut e, 15.0, 10.0, 100.0, &map, &mut rng);
        assert_eq!((e.x, e.y), (1.0, 1.0));
        assert_eq!(e.state, EnemyState::Idle);
    }

    // ── Patrol ──

    #[test]
    fn patrol_walks_square_around_spawn() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(2);
        let mut e = Enemy::new(0, EnemyKind::Skeleton, 10.0, 6.0, &mut rng);
        // Player far away: skeleton range is 6
        for _ in 0..200 {
            tick(&mut e, 0.5, 0.5, 16.0, &map, &mut rng);
            assert!((e.x - 10.0).abs() <= PATROL_RADIUS + 1e-3);
            assert!((e.y - 6.0).abs() <= PATROL_RADIUS + 1e-3);
        }
        assert_eq!(e.patrol_points.len(), 4);
        assert!(e.patrol_index > 0);
    }

    #[test]
    fn patrol_chases_when_player_near() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(2);
        let mut e = Enemy::new(0, EnemyKind::Skeleton, 10.0, 6.0, &mut rng);
        tick(&mut e, 12.0, 6.0, 100.0, &map, &mut rng);
        assert!(e.x > 10.0);
        assert!(e.patrol_points.is_empty());
    }

    // ── Ambush ──

    #[test]
    fn ambush_springs_then_rearms_up_close() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(3);
        let mut e = Enemy::new(0, EnemyKind::Spider, 5.0, 5.0, &mut rng);

        tick(&mut e, 8.0, 5.0, 16.0, &map, &mut rng);
        assert!(e.ambush_triggered);
        assert_eq!(e.state, EnemyState::Ambush);
        assert!(e.x > 5.0);
        assert_eq!(e.direction, Direction::Right);

        let sprung_x = e.x;
        tick(&mut e, 8.0, 5.0, 100.0, &map, &mut rng);
        assert!(e.x > sprung_x);

        // Player right on top of it: re-arm
        let (x, y) = (e.x + 0.5, e.y);
        tick(&mut e, x, y, 16.0, &map, &mut rng);
        assert!(!e.ambush_triggered);
        assert_eq!(e.state, EnemyState::Idle);
    }

    #[test]
    fn ambush_rearms_when_player_escapes() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(3);
        let mut e = Enemy::new(0, EnemyKind::Spider, 2.0, 2.0, &mut rng);
        e.ambush_triggered = true;
        tick(&mut e, 19.0, 11.0, 16.0, &map, &mut rng);
        assert!(!e.ambush_triggered);
    }

    // ── Ranged ──

    #[test]
    fn ranged_in_band_shoots_without_moving() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(4);
        let mut e = Enemy::new(7, EnemyKind::Wizard, 5.0, 5.0, &mut rng);
        e.shoot_cooldown_ms = 0.0;

        let shots = tick(&mut e, 10.0, 5.0, 16.0, &map, &mut rng);
        assert_eq!((e.x, e.y), (5.0, 5.0));
        assert_eq!(shots.len(), 1);
        let s = shots[0];
        assert_eq!(s.owner, 7);
        assert_eq!(s.weapon, Weapon::Dagger);
        assert!((s.dx - 1.0).abs() < 1e-6 && s.dy.abs() < 1e-6);
        assert_eq!(e.shoot_cooldown_ms, EnemyKind::Wizard.stats().shoot_cooldown_ms);

        // On cooldown: no second shot
        let shots = tick(&mut e, 10.0, 5.0, 16.0, &map, &mut rng);
        assert!(shots.is_empty());
    }

    #[test]
    fn ranged_keeps_its_distance() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(4);

        let mut close = Enemy::new(0, EnemyKind::Wizard, 8.0, 5.0, &mut rng);
        tick(&mut close, 10.0, 5.0, 100.0, &map, &mut rng);
        assert!(close.x < 8.0, "retreats from a close player");

        let mut far = Enemy::new(1, EnemyKind::Wizard, 3.0, 5.0, &mut rng);
        tick(&mut far, 10.5, 5.0, 100.0, &map, &mut rng);
        assert!(far.x > 3.0, "advances on a far player");
    }

    // ── Swarm ──

    #[test]
    fn swarm_converges_on_orbit() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(5);
        let mut e = Enemy::new(0, EnemyKind::Bat, 8.0, 6.0, &mut rng);
        // Faster than the orbit point, so it catches up and then rides it.
        for _ in 0..1000 {
            tick(&mut e, 10.0, 6.0, 16.0, &map, &mut rng);
        }
        let r = e.distance_to(10.0, 6.0);
        assert!((r - SWARM_RADIUS).abs() < 0.2, "orbit radius {r}");
    }

    // ── Teleport ──

    #[test]
    fn teleport_lands_in_annulus_on_walkable_ground() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(6);
        let mut e = Enemy::new(0, EnemyKind::Ghost, 10.0, 6.0, &mut rng);

        tick(&mut e, 10.5, 6.0, 16.0, &map, &mut rng);
        let d = e.distance_to(10.5, 6.0);
        assert!((TELEPORT_MIN_RADIUS - 1e-3..=TELEPORT_MIN_RADIUS + TELEPORT_SPREAD + 1e-3).contains(&d), "landed at {d}");
        assert!(map.is_walkable(e.x, e.y, e.hitbox, false));
        assert_eq!(e.state, EnemyState::Fading);
        assert_eq!(e.teleport_cooldown_ms, EnemyKind::Ghost.stats().teleport_cooldown_ms);

        // Cooling down: frozen in place
        let (x, y) = (e.x, e.y);
        tick(&mut e, 10.5, 6.0, 16.0, &map, &mut rng);
        assert_eq!((e.x, e.y), (x, y));
    }

    #[test]
    fn teleport_without_room_stays_put() {
        let mut tiles = vec![vec![Tile::Wall; W]; H];
        tiles[6][10] = Tile::Empty;
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(6);
        let mut e = Enemy::new(0, EnemyKind::Ghost, 10.5, 6.5, &mut rng);
        tick(&mut e, 11.0, 6.5, 16.0, &map, &mut rng);
        assert_eq!((e.x, e.y), (10.5, 6.5));
        assert!(e.teleport_cooldown_ms > 0.0);
    }

    #[test]
    fn teleport_walks_in_mid_band() {
        let tiles = open_tiles();
        let map = view(&tiles);
        let mut rng = StdRng::seed_from_u64(6);
        let mut e = Enemy::new(0, EnemyKind::Ghost, 5.0, 6.0, &mut rng);
        tick(&mut e, 8.0, 6.0, 100.0, &map, &mut rng);
        assert!(e.x > 5.0 && e.x < 6.0);
        assert_eq!(e.state, EnemyState::Moving);
    }
}
