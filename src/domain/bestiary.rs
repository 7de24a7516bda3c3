/// Enemy kinds and their stat table.
///
/// Each kind names the behavior that drives it; the behavior object itself
/// is resolved once, when the enemy is constructed.

use rand::{Rng, RngCore};
use serde::Deserialize;

use super::ai::BehaviorKind;
use super::entity::{Item, Weapon};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnemyKind {
    Slime,
    Bat,
    Skeleton,
    Wizard,
    Ghost,
    Spider,
}

#[derive(Debug)]
pub struct KindStats {
    pub health: i32,
    pub speed: f32,
    pub damage: i32,
    pub hitbox: f32,
    pub behavior: BehaviorKind,
    pub detection_range: f32,
    /// Speed while an ambush is sprung.
    pub ambush_speed: f32,
    pub shoot_cooldown_ms: f32,
    pub projectile: Weapon,
    pub teleport_cooldown_ms: f32,
    pub contact_cooldown_ms: f32,
    pub invincible_ms: f32,
    pub drop_chance: f32,
    pub drops: &'static [Item],
}

const BASE: KindStats = KindStats {
    health: 2,
    speed: 2.0,
    damage: 1,
    hitbox: 1.0,
    behavior: BehaviorKind::Chase,
    detection_range: 5.0,
    ambush_speed: 0.0,
    shoot_cooldown_ms: 0.0,
    projectile: Weapon::Dagger,
    teleport_cooldown_ms: 0.0,
    contact_cooldown_ms: 1000.0,
    invincible_ms: 500.0,
    drop_chance: 0.3,
    drops: &[Item::Heart, Item::Arrow],
};

static SLIME: KindStats = BASE;

static BAT: KindStats = KindStats {
    health: 1,
    speed: 3.5,
    behavior: BehaviorKind::Swarm,
    detection_range: 7.0,
    drop_chance: 0.2,
    drops: &[Item::Arrow],
    ..BASE
};

static SKELETON: KindStats = KindStats {
    health: 3,
    speed: 2.5,
    behavior: BehaviorKind::Patrol,
    detection_range: 6.0,
    drop_chance: 0.4,
    drops: &[Item::Heart, Item::Key, Item::Arrow],
    ..BASE
};

static WIZARD: KindStats = KindStats {
    speed: 1.8,
    behavior: BehaviorKind::Ranged,
    detection_range: 8.0,
    shoot_cooldown_ms: 2000.0,
    drop_chance: 0.5,
    drops: &[Item::Heart, Item::Key, Item::Arrow],
    ..BASE
};

static GHOST: KindStats = KindStats {
    speed: 2.5,
    behavior: BehaviorKind::Teleport,
    detection_range: 6.0,
    teleport_cooldown_ms: 3000.0,
    drops: &[Item::Heart],
    ..BASE
};

static SPIDER: KindStats = KindStats {
    speed: 2.2,
    behavior: BehaviorKind::Ambush,
    detection_range: 4.0,
    ambush_speed: 6.0,
    drop_chance: 0.35,
    ..BASE
};

impl EnemyKind {
    pub fn stats(self) -> &'static KindStats {
        match self {
            EnemyKind::Slime => &SLIME,
            EnemyKind::Bat => &BAT,
            EnemyKind::Skeleton => &SKELETON,
            EnemyKind::Wizard => &WIZARD,
            EnemyKind::Ghost => &GHOST,
            EnemyKind::Spider => &SPIDER,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            EnemyKind::Slime => "slime",
            EnemyKind::Bat => "bat",
            EnemyKind::Skeleton => "skeleton",
            EnemyKind::Wizard => "wizard",
            EnemyKind::Ghost => "ghost",
            EnemyKind::Spider => "spider",
        }
    }

    /// Roll the drop table once.
    pub fn roll_drop(self, rng: &mut dyn RngCore) -> Option<Item> {
        let stats = self.stats();
        if stats.drops.is_empty() || rng.gen::<f32>() >= stats.drop_chance {
            return None;
        }
        Some(stats.drops[rng.gen_range(0..stats.drops.len())])
    }
}
