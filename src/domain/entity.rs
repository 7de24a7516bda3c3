/// Entities: Player, Enemy, Attack, Particle.
///
/// Positions are entity centers in tile units (one integer step = one grid
/// cell), so `floor()` of a coordinate is the tile index it sits on.
/// Timers are milliseconds, speeds are tiles per second.

use rand::{Rng, RngCore};

use super::ai::{self, EnemyBehavior};
use super::bestiary::{EnemyKind, KindStats};
use super::tile::Tile;

pub const PLAYER_HITBOX: f32 = 0.75;
pub const PLAYER_MAX_HEALTH: i32 = 3;
pub const PLAYER_ATTACK_MS: f32 = 250.0;
pub const PLAYER_HURT_MS: f32 = 500.0;
pub const PLAYER_INVINCIBLE_MS: f32 = 1000.0;
pub const ARROWS_PER_PICKUP: u32 = 5;

/// Knockback lasts this long regardless of who is pushed.
pub const KNOCKBACK_MS: f32 = 150.0;
/// Raw knockback direction is scaled down by this before becoming a velocity.
pub const KNOCKBACK_SCALE: f32 = 0.5;
/// Velocity (tiles/s) of a unit knockback before scaling.
pub const KNOCKBACK_SPEED: f32 = 12.0;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    /// Unit vector in tile space (y grows downward).
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::Up => (0.0, -1.0),
            Direction::Down => (0.0, 1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
        }
    }

    /// Grid step for screen-cursor moves.
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Four-way facing for a free vector: the dominant axis wins,
    /// ties go vertical.
    pub fn facing(dx: f32, dy: f32) -> Direction {
        if dx.abs() > dy.abs() {
            if dx > 0.0 { Direction::Right } else { Direction::Left }
        } else if dy > 0.0 {
            Direction::Down
        } else {
            Direction::Up
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// One frame of digital buttons. Analog values are not needed.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Primary action: attack with the equipped weapon.
    pub south: bool,
    /// Secondary action: fire the bow.
    pub east: bool,
    pub left_shoulder: bool,
    pub right_shoulder: bool,
}

impl FrameInput {
    /// Movement vector from held directions (not normalized).
    pub fn movement(&self) -> (f32, f32) {
        let dx = if self.left { -1.0 } else if self.right { 1.0 } else { 0.0 };
        let dy = if self.up { -1.0 } else if self.down { 1.0 } else { 0.0 };
        (dx, dy)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Item {
    Key,
    Sword,
    Heart,
    Bow,
    Arrow,
}

// ── Weapons ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttackKind {
    Melee,
    Projectile,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Weapon {
    Sword,
    Bow,
    Dagger,
}

#[derive(Clone, Copy, Debug)]
pub struct WeaponSpec {
    pub kind: AttackKind,
    pub damage: i32,
    pub size: f32,
    pub speed: f32,
    pub lifetime_ms: f32,
    /// Time before the wielder may attack again.
    pub cooldown_ms: f32,
}

impl Weapon {
    pub fn spec(self) -> WeaponSpec {
        match self {
            Weapon::Sword => WeaponSpec {
                kind: AttackKind::Melee,
                damage: 1,
                size: 1.0,
                speed: 0.0,
                lifetime_ms: 200.0,
                cooldown_ms: PLAYER_ATTACK_MS + 100.0,
            },
            Weapon::Bow => WeaponSpec {
                kind: AttackKind::Projectile,
                damage: 1,
                size: 0.5,
                speed: 10.0,
                lifetime_ms: 1000.0,
                cooldown_ms: PLAYER_ATTACK_MS + 200.0,
            },
            Weapon::Dagger => WeaponSpec {
                kind: AttackKind::Projectile,
                damage: 1,
                size: 0.4,
                speed: 6.0,
                lifetime_ms: 2000.0,
                cooldown_ms: PLAYER_ATTACK_MS,
            },
        }
    }

    /// Is an attack of this weapon destroyed on contact with `tile`?
    /// Doors stay shut to attacks even for key holders.
    /// Daggers skim over water; arrows and bushes do not mix.
    pub fn stopped_by(self, tile: Tile) -> bool {
        match tile {
            Tile::Wall | Tile::Door => true,
            Tile::Bush => self != Weapon::Sword,
            Tile::Water => self == Weapon::Bow,
            _ => false,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Weapon::Sword => "sword",
            Weapon::Bow => "bow",
            Weapon::Dagger => "dagger",
        }
    }
}

// ── Shared combat state ──

/// Active knockback: a velocity applied until `remaining_ms` runs out.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Knockback {
    pub vx: f32,
    pub vy: f32,
    pub remaining_ms: f32,
}

impl Knockback {
    /// Build from a raw push direction (typically an attack's travel vector).
    pub fn from_direction(dx: f32, dy: f32) -> Self {
        Knockback {
            vx: dx * KNOCKBACK_SCALE * KNOCKBACK_SPEED,
            vy: dy * KNOCKBACK_SCALE * KNOCKBACK_SPEED,
            remaining_ms: KNOCKBACK_MS,
        }
    }

    /// Displacement for this frame; consumes time. Returns None when spent.
    pub fn advance(&mut self, dt_ms: f32) -> Option<(f32, f32)> {
        if self.remaining_ms <= 0.0 { return None; }
        let used = dt_ms.min(self.remaining_ms);
        self.remaining_ms -= used;
        let secs = used / 1000.0;
        Some((self.vx * secs, self.vy * secs))
    }

    pub fn is_active(&self) -> bool {
        self.remaining_ms > 0.0
    }
}

// ── Player ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PlayerState {
    Idle,
    Walking,
    Attacking,
    Hurt,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub keys: u32,
    pub sword: bool,
    pub bow: bool,
    pub arrows: u32,
}

impl Inventory {
    /// Doors open for anyone who has ever picked up a key; keys are never spent.
    pub fn has_key(&self) -> bool {
        self.keys > 0
    }

    pub fn owns(&self, weapon: Weapon) -> bool {
        match weapon {
            Weapon::Sword => self.sword,
            Weapon::Bow => self.bow,
            Weapon::Dagger => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    pub x: f32,
    pub y: f32,
    pub hitbox: f32,
    pub health: i32,
    pub max_health: i32,
    pub state: PlayerState,
    pub state_ms: f32,
    pub direction: Direction,
    pub inventory: Inventory,
    pub equipped: Option<Weapon>,
    pub attack_cooldown_ms: f32,
    pub invincible_ms: f32,
    pub knockback: Option<Knockback>,
}

impl Player {
    pub fn new(x: f32, y: f32) -> Self {
        Player {
            x, y,
            hitbox: PLAYER_HITBOX,
            health: PLAYER_MAX_HEALTH,
            max_health: PLAYER_MAX_HEALTH,
            state: PlayerState::Idle,
            state_ms: 0.0,
            direction: Direction::Down,
            inventory: Inventory::default(),
            equipped: None,
            attack_cooldown_ms: 0.0,
            invincible_ms: 0.0,
            knockback: None,
        }
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    pub fn is_invincible(&self) -> bool {
        self.invincible_ms > 0.0
    }

    /// Can the player act on input this frame?
    pub fn is_free(&self) -> bool {
        matches!(self.state, PlayerState::Idle | PlayerState::Walking) && self.knockback.is_none()
    }

    pub fn set_state(&mut self, state: PlayerState) {
        if self.state != state {
            self.state = state;
            self.state_ms = 0.0;
        }
    }

    /// Advance timers: invincibility, attack cooldown, timed states.
    pub fn tick_timers(&mut self, dt_ms: f32) {
        self.state_ms += dt_ms;
        self.invincible_ms = (self.invincible_ms - dt_ms).max(0.0);
        self.attack_cooldown_ms = (self.attack_cooldown_ms - dt_ms).max(0.0);
        match self.state {
            PlayerState::Attacking if self.state_ms >= PLAYER_ATTACK_MS => {
                self.set_state(PlayerState::Idle);
            }
            PlayerState::Hurt if self.state_ms >= PLAYER_HURT_MS => {
                self.set_state(PlayerState::Idle);
            }
            _ => {}
        }
    }

    /// Apply damage unless invincible. Returns true if the hit landed.
    pub fn hurt(&mut self, damage: i32, push: Option<(f32, f32)>) -> bool {
        if self.is_invincible() || self.is_dead() { return false; }
        self.health = (self.health - damage).max(0);
        self.state = PlayerState::Hurt;
        self.state_ms = 0.0;
        self.invincible_ms = PLAYER_INVINCIBLE_MS;
        if let Some((dx, dy)) = push {
            self.knockback = Some(Knockback::from_direction(dx, dy));
        }
        true
    }

    pub fn heal(&mut self, amount: i32) {
        self.health = (self.health + amount).min(self.max_health);
    }

    pub fn add_item(&mut self, item: Item) {
        match item {
            Item::Key => self.inventory.keys += 1,
            Item::Sword => {
                self.inventory.sword = true;
                if self.equipped.is_none() { self.equipped = Some(Weapon::Sword); }
            }
            Item::Bow => {
                self.inventory.bow = true;
                if self.equipped.is_none() { self.equipped = Some(Weapon::Bow); }
            }
            Item::Arrow => self.inventory.arrows += ARROWS_PER_PICKUP,
            Item::Heart => self.heal(1),
        }
    }

    /// Step the equipped weapon through the owned ones.
    pub fn cycle_weapon(&mut self, forward: bool) {
        let owned: Vec<Weapon> = [Weapon::Sword, Weapon::Bow]
            .into_iter()
            .filter(|w| self.inventory.owns(*w))
            .collect();
        if owned.is_empty() { return; }
        let current = self.equipped.and_then(|w| owned.iter().position(|o| *o == w));
        let next = match current {
            None => 0,
            Some(i) if forward => (i + 1) % owned.len(),
            Some(i) => (i + owned.len() - 1) % owned.len(),
        };
        self.equipped = Some(owned[next]);
    }

    /// Can the player attack with `weapon` right now (ignoring cooldown)?
    pub fn can_use(&self, weapon: Weapon) -> bool {
        match weapon {
            Weapon::Sword => self.inventory.sword,
            Weapon::Bow => self.inventory.bow && self.inventory.arrows > 0,
            Weapon::Dagger => false,
        }
    }
}

// ── Enemy ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EnemyState {
    Idle,
    Moving,
    Attacking,
    Ambush,
    Casting,
    Fading,
}

pub type EnemyId = u32;

#[derive(Clone, Debug)]
pub struct Enemy {
    pub id: EnemyId,
    pub kind: EnemyKind,
    pub behavior: &'static dyn EnemyBehavior,
    pub x: f32,
    pub y: f32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub hitbox: f32,
    pub health: i32,
    pub speed: f32,
    pub damage: i32,
    pub state: EnemyState,
    pub direction: Direction,
    pub knockback: Option<Knockback>,
    pub invincible_ms: f32,
    /// Contact damage is rate-limited by this timer.
    pub contact_cooldown_ms: f32,
    pub behavior_ms: f32,

    // ── Behavior scratch ──
    pub patrol_points: Vec<(f32, f32)>,
    pub patrol_index: usize,
    pub ambush_triggered: bool,
    pub teleport_cooldown_ms: f32,
    pub shoot_cooldown_ms: f32,
    /// Phase offset (radians) on the swarm orbit.
    pub swarm_offset: f32,
}

impl Enemy {
    pub fn new(id: EnemyId, kind: EnemyKind, x: f32, y: f32, rng: &mut dyn RngCore) -> Self {
        let stats = kind.stats();
        Enemy {
            id, kind,
            behavior: ai::behavior_for(stats.behavior),
            x, y,
            spawn_x: x,
            spawn_y: y,
            hitbox: stats.hitbox,
            health: stats.health,
            speed: stats.speed,
            damage: stats.damage,
            state: EnemyState::Idle,
            direction: Direction::Down,
            knockback: None,
            invincible_ms: 0.0,
            contact_cooldown_ms: 0.0,
            behavior_ms: 0.0,
            patrol_points: Vec::new(),
            patrol_index: 0,
            ambush_triggered: false,
            teleport_cooldown_ms: 0.0,
            shoot_cooldown_ms: stats.shoot_cooldown_ms,
            swarm_offset: rng.gen::<f32>() * std::f32::consts::TAU,
        }
    }

    pub fn stats(&self) -> &'static KindStats {
        self.kind.stats()
    }

    pub fn is_dead(&self) -> bool {
        self.health <= 0
    }

    /// Apply damage unless invincible. Returns true if the hit landed.
    pub fn hurt(&mut self, damage: i32, push: Option<(f32, f32)>) -> bool {
        if self.invincible_ms > 0.0 || self.is_dead() { return false; }
        self.health -= damage;
        self.invincible_ms = self.stats().invincible_ms;
        if let Some((dx, dy)) = push {
            self.knockback = Some(Knockback::from_direction(dx, dy));
        }
        true
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((x - self.x).powi(2) + (y - self.y).powi(2)).sqrt()
    }

    /// Advance the timers owned by the entity itself. Behavior timers
    /// (shoot, teleport) are advanced by their behaviors.
    pub fn tick_timers(&mut self, dt_ms: f32) {
        self.invincible_ms = (self.invincible_ms - dt_ms).max(0.0);
        self.contact_cooldown_ms = (self.contact_cooldown_ms - dt_ms).max(0.0);
        self.behavior_ms += dt_ms;
    }
}

// ── Attacks & particles ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum AttackOwner {
    Player,
    Enemy(EnemyId),
}

/// A live melee swing or projectile.
#[derive(Clone, Debug)]
pub struct Attack {
    pub owner: AttackOwner,
    pub weapon: Weapon,
    pub kind: AttackKind,
    pub x: f32,
    pub y: f32,
    /// Unit travel vector.
    pub dx: f32,
    pub dy: f32,
    pub speed: f32,
    pub size: f32,
    pub damage: i32,
    pub lifetime_ms: f32,
    /// Targets already struck (melee hits each target once).
    pub struck: Vec<EnemyId>,
    pub struck_player: bool,
}

/// Cosmetic spark; no gameplay effect.
#[derive(Clone, Debug)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub dx: f32,
    pub dy: f32,
    pub size: f32,
    pub initial_size: f32,
    pub lifetime_ms: f32,
    pub initial_lifetime_ms: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn facing_prefers_dominant_axis() {
        assert_eq!(Direction::facing(2.0, 1.0), Direction::Right);
        assert_eq!(Direction::facing(-2.0, 1.0), Direction::Left);
        assert_eq!(Direction::facing(0.5, -1.0), Direction::Up);
        assert_eq!(Direction::facing(1.0, 1.0), Direction::Down);
    }

    #[test]
    fn knockback_runs_out() {
        let mut kb = Knockback::from_direction(1.0, 0.0);
        let (dx, dy) = kb.advance(100.0).unwrap();
        assert!(dx > 0.0);
        assert_eq!(dy, 0.0);
        assert!(kb.advance(100.0).is_some()); // 50ms left, consumed
        assert!(!kb.is_active());
        assert!(kb.advance(16.0).is_none());
    }

    #[test]
    fn player_invincibility_blocks_second_hit() {
        let mut p = Player::new(5.0, 5.0);
        assert!(p.hurt(1, None));
        assert!(!p.hurt(1, None));
        assert_eq!(p.health, PLAYER_MAX_HEALTH - 1);
        assert_eq!(p.state, PlayerState::Hurt);

        p.tick_timers(PLAYER_INVINCIBLE_MS);
        assert_eq!(p.state, PlayerState::Idle);
        assert!(p.hurt(1, None));
        assert_eq!(p.health, PLAYER_MAX_HEALTH - 2);
    }

    #[test]
    fn health_never_negative() {
        let mut p = Player::new(0.0, 0.0);
        p.hurt(10, None);
        assert_eq!(p.health, 0);
        assert!(p.is_dead());
    }

    #[test]
    fn items_update_inventory() {
        let mut p = Player::new(0.0, 0.0);
        assert!(!p.inventory.has_key());
        p.add_item(Item::Key);
        assert!(p.inventory.has_key());

        p.add_item(Item::Bow);
        assert_eq!(p.equipped, Some(Weapon::Bow));
        assert!(!p.can_use(Weapon::Bow)); // no arrows yet
        p.add_item(Item::Arrow);
        assert_eq!(p.inventory.arrows, ARROWS_PER_PICKUP);
        assert!(p.can_use(Weapon::Bow));

        p.health = 1;
        p.add_item(Item::Heart);
        p.add_item(Item::Heart);
        p.add_item(Item::Heart);
        assert_eq!(p.health, p.max_health);
    }

    #[test]
    fn weapon_cycle_wraps() {
        let mut p = Player::new(0.0, 0.0);
        p.cycle_weapon(true);
        assert_eq!(p.equipped, None);
        p.add_item(Item::Sword);
        p.add_item(Item::Bow);
        assert_eq!(p.equipped, Some(Weapon::Sword));
        p.cycle_weapon(true);
        assert_eq!(p.equipped, Some(Weapon::Bow));
        p.cycle_weapon(true);
        assert_eq!(p.equipped, Some(Weapon::Sword));
        p.cycle_weapon(false);
        assert_eq!(p.equipped, Some(Weapon::Bow));
    }

    #[test]
    fn dagger_passes_water_arrow_does_not() {
        assert!(Weapon::Bow.stopped_by(Tile::Water));
        assert!(!Weapon::Dagger.stopped_by(Tile::Water));
        assert!(Weapon::Dagger.stopped_by(Tile::Wall));
        assert!(!Weapon::Bow.stopped_by(Tile::Bridge));
    }

    #[test]
    fn enemy_swarm_offset_is_randomized() {
        let mut rng = StdRng::seed_from_u64(7);
        let a = Enemy::new(0, EnemyKind::Bat, 1.0, 1.0, &mut rng);
        let b = Enemy::new(1, EnemyKind::Bat, 1.0, 1.0, &mut rng);
        assert!(a.swarm_offset != b.swarm_offset);
        assert!((0.0..std::f32::consts::TAU).contains(&a.swarm_offset));
    }
}
