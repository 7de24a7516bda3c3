/// Combat: live attacks, hit resolution, hit sparks.
///
/// Player-owned attacks hit enemies; enemy-owned attacks hit the player.
/// A melee swing hits each target at most once over its lifetime; a
/// projectile is spent on its first contact. Terrain stops attacks per
/// `Weapon::stopped_by`. Enemy body contact also hurts the player, gated
/// by the enemy's contact cooldown.
///
/// Removal is swap-remove while walking the vector by index, so an entry
/// is either fully updated or gone.

use std::f32::consts::TAU;

use super::ai::Shot;
use super::entity::{
    Attack, AttackKind, AttackOwner, Enemy, EnemyId, Particle, Player, Weapon,
};
use super::physics::{boxes_overlap, MapView};

const PARTICLE_COUNT: usize = 8;
const PARTICLE_LIFETIME_MS: f32 = 200.0;
const PARTICLE_SPEED: f32 = 4.0;
const PARTICLE_SIZE: f32 = 0.25;

/// What happened during a combat update; the sim layer turns these into
/// game events.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CombatEvent {
    Launched { owner: AttackOwner, weapon: Weapon },
    EnemyHit { id: EnemyId, x: f32, y: f32, killed: bool },
    PlayerHit { damage: i32, by: AttackOwner },
    Blocked { x: f32, y: f32 },
}

#[derive(Clone, Debug, Default)]
pub struct CombatSystem {
    pub attacks: Vec<Attack>,
    pub particles: Vec<Particle>,
}

impl CombatSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swing or fire `weapon` from the player's facing. The attack starts
    /// one tile ahead of the player.
    pub fn create_attack(&mut self, player: &Player, weapon: Weapon, events: &mut Vec<CombatEvent>) {
        let (dx, dy) = player.direction.vector();
        self.launch(AttackOwner::Player, weapon, player.x + dx, player.y + dy, dx, dy, 0);
        events.push(CombatEvent::Launched { owner: AttackOwner::Player, weapon });
    }

    /// Fire an enemy projectile requested by its behavior.
    pub fn spawn_shot(&mut self, shot: &Shot, events: &mut Vec<CombatEvent>) {
        let owner = AttackOwner::Enemy(shot.owner);
        self.launch(owner, shot.weapon, shot.x, shot.y, shot.dx, shot.dy, shot.damage);
        events.push(CombatEvent::Launched { owner, weapon: shot.weapon });
    }

    fn launch(&mut self, owner: AttackOwner, weapon: Weapon, x: f32, y: f32, dx: f32, dy: f32, damage: i32) {
        let spec = weapon.spec();
        self.attacks.push(Attack {
            owner,
            weapon,
            kind: spec.kind,
            x, y, dx, dy,
            speed: spec.speed,
            size: spec.size,
            damage: damage.max(spec.damage),
            lifetime_ms: spec.lifetime_ms,
            struck: Vec::new(),
            struck_player: false,
        });
    }

    /// Drop everything in flight (screen change).
    pub fn clear(&mut self) {
        self.attacks.clear();
        self.particles.clear();
    }

    pub fn update(
        &mut self,
        dt_ms: f32,
        player: &mut Player,
        enemies: &mut [Enemy],
        map: &MapView,
        events: &mut Vec<CombatEvent>,
    ) {
        self.update_attacks(dt_ms, player, enemies, map, events);
        self.update_particles(dt_ms);
        resolve_contact(player, enemies, events);
    }

    fn update_attacks(
        &mut self,
        dt_ms: f32,
        player: &mut Player,
        enemies: &mut [Enemy],
        map: &MapView,
        events: &mut Vec<CombatEvent>,
    ) {
        let mut i = 0;
        while i < self.attacks.len() {
            let a = &mut self.attacks[i];
            a.lifetime_ms -= dt_ms;
            if a.lifetime_ms <= 0.0 {
                self.attacks.swap_remove(i);
                continue;
            }

            let secs = dt_ms / 1000.0;
            a.x += a.dx * a.speed * secs;
            a.y += a.dy * a.speed * secs;
            let hitbox = (a.x, a.y, a.size, a.size);

            let mut spent = false;
            match a.owner {
                AttackOwner::Player => {
                    for enemy in enemies.iter_mut() {
                        if enemy.is_dead() || a.struck.contains(&enemy.id) { continue; }
                        if !boxes_overlap(hitbox, (enemy.x, enemy.y, enemy.hitbox, enemy.hitbox)) { continue; }

                        let landed = enemy.hurt(a.damage, Some((a.dx, a.dy)));
                        if landed {
                            a.struck.push(enemy.id);
                            events.push(CombatEvent::EnemyHit {
                                id: enemy.id, x: enemy.x, y: enemy.y, killed: enemy.is_dead(),
                            });
                        }
                        if landed || a.kind == AttackKind::Projectile {
                            burst(&mut self.particles, a.x, a.y);
                        }
                        if a.kind == AttackKind::Projectile {
                            spent = true;
                            break;
                        }
                    }
                }
                AttackOwner::Enemy(_) => {
                    let player_box = (player.x, player.y, player.hitbox, player.hitbox);
                    if !a.struck_player && !player.is_dead() && boxes_overlap(hitbox, player_box) {
                        a.struck_player = true;
                        if player.hurt(a.damage, Some((a.dx, a.dy))) {
                            events.push(CombatEvent::PlayerHit { damage: a.damage, by: a.owner });
                        }
                        burst(&mut self.particles, a.x, a.y);
                        spent = a.kind == AttackKind::Projectile;
                    }
                }
            }

            if !spent && map.blocks_attack(a.x, a.y, a.weapon) {
                events.push(CombatEvent::Blocked { x: a.x, y: a.y });
                burst(&mut self.particles, a.x, a.y);
                spent = true;
            }

            if spent {
                self.attacks.swap_remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn update_particles(&mut self, dt_ms: f32) {
        let secs = dt_ms / 1000.0;
        self.particles.retain_mut(|p| {
            p.lifetime_ms -= dt_ms;
            if p.lifetime_ms <= 0.0 { return false; }
            p.x += p.dx * PARTICLE_SPEED * secs;
            p.y += p.dy * PARTICLE_SPEED * secs;
            p.size = p.initial_size * (p.lifetime_ms / p.initial_lifetime_ms);
            true
        });
    }
}

/// Body contact: each touching enemy off cooldown hurts the player and
/// pushes them away from itself.
fn resolve_contact(player: &mut Player, enemies: &mut [Enemy], events: &mut Vec<CombatEvent>) {
    if player.is_dead() { return; }
    for enemy in enemies.iter_mut() {
        if enemy.is_dead() || enemy.contact_cooldown_ms > 0.0 { continue; }
        let touching = boxes_overlap(
            (player.x, player.y, player.hitbox, player.hitbox),
            (enemy.x, enemy.y, enemy.hitbox, enemy.hitbox),
        );
        if !touching { continue; }

        let dx = player.x - enemy.x;
        let dy = player.y - enemy.y;
        let dist = (dx * dx + dy * dy).sqrt();
        let push = if dist > f32::EPSILON { Some((dx / dist, dy / dist)) } else { None };
        if player.hurt(enemy.damage, push) {
            enemy.contact_cooldown_ms = enemy.stats().contact_cooldown_ms;
            events.push(CombatEvent::PlayerHit { damage: enemy.damage, by: AttackOwner::Enemy(enemy.id) });
        }
    }
}

/// Radial spray of sparks at an impact point.
fn burst(particles: &mut Vec<Particle>, x: f32, y: f32) {
    for i in 0..PARTICLE_COUNT {
        let angle = TAU * i as f32 / PARTICLE_COUNT as f32;
        particles.push(Particle {
            x, y,
            dx: angle.cos(),
            dy: angle.sin(),
            size: PARTICLE_SIZE,
            initial_size: PARTICLE_SIZE,
            lifetime_ms: PARTICLE_LIFETIME_MS,
            initial_lifetime_ms: PARTICLE_LIFETIME_MS,
        });
    }
}
