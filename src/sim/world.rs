/// World: a grid of fixed-size screens plus the current-screen cursor.
///
/// ## Screens
///
/// Each screen keeps its own layout, the set of item cells derived from
/// that layout, its live enemies and the spawn list they come from.
/// Enemies are instantiated lazily, the first time a screen becomes
/// current. Screens are never dropped during a session, so whatever the
/// player leaves behind is still there on return.
///
/// ## Cursor
///
/// Exactly one screen is current. The cursor only moves through
/// `change_screen()`, which the transition controller calls when a slide
/// completes. Everything else reads the current screen through `map_view()`
/// or the accessors below.
///
/// ## Clearing
///
/// A screen becomes `cleared` the instant its enemy set empties. This is
/// edge-triggered: the bonus drop roll happens once per screen.

use std::collections::BTreeSet;

use rand::{Rng, RngCore};
use tracing::{debug, info, trace};

use crate::domain::ai::{BehaviorCtx, Shot};
use crate::domain::bestiary::EnemyKind;
use crate::domain::entity::{Direction, Enemy, EnemyId, Item, Player};
use crate::domain::physics::MapView;
use crate::domain::tile::Tile;
use super::event::GameEvent;

pub const SCREEN_WIDTH: usize = 20;
pub const SCREEN_HEIGHT: usize = 12;

/// Enemy spawn template entry. Position is the enemy's center.
#[derive(Clone, Debug, PartialEq)]
pub struct Spawn {
    pub kind: EnemyKind,
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Debug)]
pub struct Screen {
    /// `SCREEN_HEIGHT` rows of `SCREEN_WIDTH` tiles.
    pub layout: Vec<Vec<Tile>>,
    /// Cells currently holding an item tile. Kept in sync with `layout`.
    pub items: BTreeSet<(usize, usize)>,
    pub enemies: Vec<Enemy>,
    pub spawns: Vec<Spawn>,
    pub visited: bool,
    pub cleared: bool,
    pub background: Option<String>,
}

impl Screen {
    /// Build a screen from a parsed layout. Item cells come from scanning
    /// the layout. A screen without spawns starts out cleared.
    pub fn new(layout: Vec<Vec<Tile>>, spawns: Vec<Spawn>, background: Option<String>) -> Self {
        let mut items = BTreeSet::new();
        for (y, row) in layout.iter().enumerate() {
            for (x, tile) in row.iter().enumerate() {
                if tile.is_item() {
                    items.insert((x, y));
                }
            }
        }
        let cleared = spawns.is_empty();
        Screen {
            layout,
            items,
            enemies: Vec::new(),
            spawns,
            visited: false,
            cleared,
            background,
        }
    }

    /// Closed room: wall border, empty inside.
    pub fn walled() -> Self {
        let mut layout = vec![vec![Tile::Empty; SCREEN_WIDTH]; SCREEN_HEIGHT];
        for (y, row) in layout.iter_mut().enumerate() {
            for (x, tile) in row.iter_mut().enumerate() {
                if x == 0 || y == 0 || x == SCREEN_WIDTH - 1 || y == SCREEN_HEIGHT - 1 {
                    *tile = Tile::Wall;
                }
            }
        }
        Screen::new(layout, Vec::new(), None)
    }

    fn tile(&self, x: usize, y: usize) -> Tile {
        self.layout
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(Tile::Wall)
    }
}

#[derive(Clone, Debug)]
pub struct World {
    /// Indexed `[row][col]`; every row has the same length.
    screens: Vec<Vec<Screen>>,
    /// (col, row) of the current screen.
    cursor: (usize, usize),
    next_enemy_id: EnemyId,
    pub bonus_drop_chance: f32,
}

impl World {
    /// Build from a rectangular grid of screens and make `start` current.
    /// Returns `None` for an empty or ragged grid, or a start outside it.
    pub fn new(screens: Vec<Vec<Screen>>, start: (usize, usize), rng: &mut dyn RngCore) -> Option<Self> {
        let cols = screens.first().map_or(0, |r| r.len());
        if cols == 0 || screens.iter().any(|r| r.len() != cols) {
            return None;
        }
        if start.1 >= screens.len() || start.0 >= cols {
            return None;
        }
        let mut world = World { screens, cursor: start, next_enemy_id: 0, bonus_drop_chance: 0.0 };
        world.enter_current(rng);
        Some(world)
    }

    pub fn cols(&self) -> usize {
        self.screens[0].len()
    }

    pub fn rows(&self) -> usize {
        self.screens.len()
    }

    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    pub fn current(&self) -> &Screen {
        &self.screens[self.cursor.1][self.cursor.0]
    }

    fn current_mut(&mut self) -> &mut Screen {
        &mut self.screens[self.cursor.1][self.cursor.0]
    }

    pub fn screen_at(&self, col: usize, row: usize) -> Option<&Screen> {
        self.screens.get(row).and_then(|r| r.get(col))
    }

    // ── Tile queries ──

    /// Tile at a cell of the current screen; out of bounds reads as wall.
    pub fn get_tile(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 { return Tile::Wall; }
        self.current().tile(x as usize, y as usize)
    }

    pub fn item_at(&self, x: usize, y: usize) -> Option<Item> {
        if !self.current().items.contains(&(x, y)) { return None; }
        self.get_tile(x as i32, y as i32).item()
    }

    /// Take the item at a cell. Returns false if there was none.
    pub fn remove_item(&mut self, x: usize, y: usize) -> bool {
        let screen = self.current_mut();
        if !screen.items.remove(&(x, y)) { return false; }
        screen.layout[y][x] = Tile::Empty;
        true
    }

    /// Put an item on an empty cell. Returns false if the cell is taken or
    /// out of bounds.
    pub fn place_item(&mut self, x: usize, y: usize, item: Item) -> bool {
        let screen = self.current_mut();
        if screen.tile(x, y) != Tile::Empty { return false; }
        screen.layout[y][x] = Tile::from(item);
        screen.items.insert((x, y));
        true
    }

    // ── Screen graph ──

    fn neighbour(&self, dir: Direction) -> Option<(usize, usize)> {
        let (dx, dy) = dir.step();
        let nx = self.cursor.0 as i32 + dx;
        let ny = self.cursor.1 as i32 + dy;
        if nx < 0 || ny < 0 || nx as usize >= self.cols() || ny as usize >= self.rows() {
            return None;
        }
        Some((nx as usize, ny as usize))
    }

    /// Adjacent screen in `dir`, or `None` at the grid edge (no wraparound).
    pub fn get_next_screen(&self, dir: Direction) -> Option<&Screen> {
        self.neighbour(dir).and_then(|(x, y)| self.screen_at(x, y))
    }

    /// Move the cursor one step. On first visit the destination's enemies
    /// are spawned. Returns whether the move happened.
    pub fn change_screen(&mut self, dir: Direction, rng: &mut dyn RngCore) -> bool {
        let Some(next) = self.neighbour(dir) else { return false };
        self.cursor = next;
        info!(col = next.0, row = next.1, "entered screen");
        self.enter_current(rng);
        true
    }

    fn enter_current(&mut self, rng: &mut dyn RngCore) {
        let mut next_id = self.next_enemy_id;
        let screen = self.current_mut();
        if !screen.visited {
            screen.visited = true;
            if screen.enemies.is_empty() {
                for spawn in &screen.spawns {
                    screen.enemies.push(Enemy::new(next_id, spawn.kind, spawn.x, spawn.y, rng));
                    next_id += 1;
                }
                debug!(count = screen.enemies.len(), "spawned enemies");
            }
        }
        self.next_enemy_id = next_id;
    }

    fn exits(&self) -> [bool; 4] {
        let mut exits = [false; 4];
        for dir in Direction::ALL {
            exits[dir.index()] = self.neighbour(dir).is_some();
        }
        exits
    }

    /// Read-only collision view of the current screen.
    pub fn map_view(&self) -> MapView<'_> {
        MapView {
            tiles: &self.current().layout,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            exits: self.exits(),
        }
    }

    /// Collision view plus mutable access to the current screen's enemies.
    pub fn combat_parts(&mut self) -> (MapView<'_>, &mut [Enemy]) {
        let exits = self.exits();
        let (cx, cy) = self.cursor;
        let screen = &mut self.screens[cy][cx];
        let view = MapView { tiles: &screen.layout, width: SCREEN_WIDTH, height: SCREEN_HEIGHT, exits };
        (view, screen.enemies.as_mut_slice())
    }

    // ── Per-frame update ──

    /// Bury enemies killed since the last update, drive the survivors and
    /// check for the clear. Returns projectiles requested by behaviors.
    pub fn update(
        &mut self,
        dt_ms: f32,
        player: &Player,
        rng: &mut dyn RngCore,
        events: &mut Vec<GameEvent>,
    ) -> Vec<Shot> {
        self.bury_dead(rng, events);
        let shots = self.drive_enemies(dt_ms, player, rng);
        self.check_cleared(rng, events);
        shots
    }

    fn bury_dead(&mut self, rng: &mut dyn RngCore, events: &mut Vec<GameEvent>) {
        let screen = self.current_mut();
        let mut dead = Vec::new();
        screen.enemies.retain(|e| {
            if e.is_dead() {
                dead.push((e.id, e.kind, e.x, e.y));
                false
            } else {
                true
            }
        });

        for (id, kind, x, y) in dead {
            debug!(id, kind = kind.name(), "enemy killed");
            events.push(GameEvent::EnemyKilled { id, kind, x, y });
            if let Some(item) = kind.roll_drop(rng) {
                if x < 0.0 || y < 0.0 { continue; }
                let (tx, ty) = (x.floor() as usize, y.floor() as usize);
                if self.place_item(tx, ty, item) {
                    debug!(?item, tx, ty, "enemy dropped item");
                    events.push(GameEvent::ItemDropped { item, x: tx, y: ty });
                }
            }
        }
    }

    fn drive_enemies(&mut self, dt_ms: f32, player: &Player, rng: &mut dyn RngCore) -> Vec<Shot> {
        let mut shots = Vec::new();
        let (map, enemies) = self.combat_parts();

        for enemy in enemies.iter_mut() {
            enemy.tick_timers(dt_ms);
            let from = (enemy.x, enemy.y);

            if let Some(mut kb) = enemy.knockback {
                if let Some((dx, dy)) = kb.advance(dt_ms) {
                    let to = map.resolve_move(from, (from.0 + dx, from.1 + dy), enemy.hitbox, false);
                    enemy.x = to.0;
                    enemy.y = to.1;
                }
                enemy.knockback = if kb.is_active() { Some(kb) } else { None };
            } else {
                let dist = enemy.distance_to(player.x, player.y);
                let mut ctx = BehaviorCtx {
                    dt_ms,
                    player_x: player.x,
                    player_y: player.y,
                    dist,
                    map: &map,
                    rng: &mut *rng,
                    shots: &mut shots,
                };
                let behavior = enemy.behavior;
                behavior.update(enemy, &mut ctx);
                let to = map.resolve_move(from, (enemy.x, enemy.y), enemy.hitbox, false);
                enemy.x = to.0;
                enemy.y = to.1;
            }

            if !map.is_walkable(enemy.x, enemy.y, enemy.hitbox, false) {
                let (x, y) = map.unstuck(enemy.x, enemy.y, enemy.hitbox, false);
                trace!(id = enemy.id, behavior = ?enemy.behavior.kind(), x, y, "unstuck enemy");
                enemy.x = x;
                enemy.y = y;
            }
        }
        shots
    }

    fn check_cleared(&mut self, rng: &mut dyn RngCore, events: &mut Vec<GameEvent>) {
        let cursor = self.cursor;
        let chance = self.bonus_drop_chance;
        let screen = self.current_mut();
        if screen.cleared || !screen.enemies.is_empty() { return; }

        screen.cleared = true;
        info!(col = cursor.0, row = cursor.1, "screen cleared");
        events.push(GameEvent::ScreenCleared { screen: cursor });

        if rng.gen::<f32>() < chance {
            let (cx, cy) = (SCREEN_WIDTH / 2, SCREEN_HEIGHT / 2);
            if self.place_item(cx, cy, Item::Heart) {
                debug!(cx, cy, "bonus heart");
                events.push(GameEvent::BonusDropped { x: cx, y: cy });
            }
        }
    }
}
