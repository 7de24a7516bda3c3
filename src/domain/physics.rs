/// Collision: entity hitboxes against the tile grid of one screen.
///
/// ## Model
///
/// Entities are square hitboxes centered on a continuous position in tile
/// units. A hitbox overlaps every cell in the inclusive range
/// `floor(left) ..= floor(right - ε)` on each axis (right/bottom edges are
/// exclusive, so a box sitting flush against a wall does not touch it).
///
/// ## Walkability
///
/// A position is walkable iff no overlapped cell blocks walking
/// (`Tile::blocks_walking`: walls, and doors without a key).
///
/// Screen edges are special. A hitbox may hang past an edge by at most
/// `TRANSITION_BUFFER`, and only if an adjacent screen exists on that
/// side. While it hangs over, the tile test is clamped to the edge cells
/// nearest the crossing point, so a gap in the boundary wall is what lets
/// an entity through. Everything past the buffer is blocked.
///
/// Out-of-bounds tile queries answer `Tile::Wall`.

use super::entity::{Direction, Weapon};
use super::tile::Tile;

/// How far (tiles) a hitbox may hang past a screen edge before the move is
/// refused. Also the inset used when placing a player on the far side of a
/// screen transition.
pub const TRANSITION_BUFFER: f32 = 0.45;

/// Right/bottom hitbox edges are treated as exclusive by this margin.
pub const EDGE_EPSILON: f32 = 1e-4;

/// Step length for the unstick walk toward the screen center.
const UNSTUCK_STEP: f32 = 0.1;

/// Immutable view of one screen for collision queries.
#[derive(Clone, Copy)]
pub struct MapView<'a> {
    pub tiles: &'a [Vec<Tile>],
    pub width: usize,
    pub height: usize,
    /// Adjacent screen exists, indexed by `Direction::index()`.
    pub exits: [bool; 4],
}

impl<'a> MapView<'a> {
    pub fn tile_at(&self, x: i32, y: i32) -> Tile {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return Tile::Wall; // out of bounds = wall
        }
        self.tiles[y as usize][x as usize]
    }

    pub fn has_exit(&self, dir: Direction) -> bool {
        self.exits[dir.index()]
    }

    /// Geometric center of the screen.
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    /// Is the whole hitbox inside the screen rectangle?
    pub fn contains(&self, x: f32, y: f32, hitbox: f32) -> bool {
        let half = hitbox / 2.0;
        x - half >= 0.0
            && y - half >= 0.0
            && x + half <= self.width as f32
            && y + half <= self.height as f32
    }

    /// See module docs for the full rule.
    pub fn is_walkable(&self, x: f32, y: f32, hitbox: f32, has_key: bool) -> bool {
        if !x.is_finite() || !y.is_finite() { return false; }

        let half = hitbox / 2.0;
        let (left, right) = (x - half, x + half);
        let (top, bottom) = (y - half, y + half);
        let w = self.width as f32;
        let h = self.height as f32;

        let overhangs = [
            (Direction::Left, -left),
            (Direction::Right, right - w),
            (Direction::Up, -top),
            (Direction::Down, bottom - h),
        ];
        for (dir, overhang) in overhangs {
            if overhang > 0.0 && (!self.has_exit(dir) || overhang > TRANSITION_BUFFER) {
                return false;
            }
        }

        let (x0, x1) = cell_span(left, right, self.width);
        let (y0, y1) = cell_span(top, bottom, self.height);
        for ty in y0..=y1 {
            for tx in x0..=x1 {
                if self.tile_at(tx, ty).blocks_walking(has_key) {
                    return false;
                }
            }
        }
        true
    }

    /// Recovery for an entity embedded in a wall: walk from (x, y) toward
    /// the screen center and return the first walkable point. Falls back
    /// to the original position if the whole line is blocked.
    pub fn unstuck(&self, x: f32, y: f32, hitbox: f32, has_key: bool) -> (f32, f32) {
        if self.is_walkable(x, y, hitbox, has_key) {
            return (x, y);
        }
        let (cx, cy) = self.center();
        let dist = ((cx - x).powi(2) + (cy - y).powi(2)).sqrt();
        let steps = (dist / UNSTUCK_STEP).ceil().max(1.0) as usize;
        for i in 1..=steps {
            let t = i as f32 / steps as f32;
            let px = x + (cx - x) * t;
            let py = y + (cy - y) * t;
            if self.is_walkable(px, py, hitbox, has_key) {
                return (px, py);
            }
        }
        (x, y)
    }

    /// Move from `from` toward `to`, sliding along walls: try the full
    /// move, then each axis alone, else stay put.
    pub fn resolve_move(&self, from: (f32, f32), to: (f32, f32), hitbox: f32, has_key: bool) -> (f32, f32) {
        if self.is_walkable(to.0, to.1, hitbox, has_key) {
            return to;
        }
        if to.0 != from.0 && self.is_walkable(to.0, from.1, hitbox, has_key) {
            return (to.0, from.1);
        }
        if to.1 != from.1 && self.is_walkable(from.0, to.1, hitbox, has_key) {
            return (from.0, to.1);
        }
        from
    }

    /// Does the terrain under an attack's center stop it?
    pub fn blocks_attack(&self, x: f32, y: f32, weapon: Weapon) -> bool {
        weapon.stopped_by(self.tile_at(x.floor() as i32, y.floor() as i32))
    }

    /// Pull a hitbox back inside the screen on every side that has no
    /// adjacent screen.
    pub fn clamp_inside(&self, x: f32, y: f32, hitbox: f32) -> (f32, f32) {
        let half = hitbox / 2.0;
        let mut cx = x;
        let mut cy = y;
        if !self.has_exit(Direction::Left) { cx = cx.max(half); }
        if !self.has_exit(Direction::Right) { cx = cx.min(self.width as f32 - half); }
        if !self.has_exit(Direction::Up) { cy = cy.max(half); }
        if !self.has_exit(Direction::Down) { cy = cy.min(self.height as f32 - half); }
        (cx, cy)
    }
}

/// Inclusive cell index range covered by `[lo, hi)`, clamped to the grid.
fn cell_span(lo: f32, hi: f32, cells: usize) -> (i32, i32) {
    let max = cells as i32 - 1;
    let first = lo.max(0.0).floor() as i32;
    let last = (hi.min(cells as f32) - EDGE_EPSILON).floor() as i32;
    let first = first.clamp(0, max);
    let last = last.clamp(first, max);
    (first, last)
}

/// Axis-aligned box overlap. Boxes are (center x, center y, width, height).
/// Touching edges count as overlapping.
pub fn boxes_overlap(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
    let (ax, ay, aw, ah) = a;
    let (bx, by, bw, bh) = b;
    if ax + aw / 2.0 < bx - bw / 2.0 { return false; }
    if ax - aw / 2.0 > bx + bw / 2.0 { return false; }
    if ay + ah / 2.0 < by - bh / 2.0 { return false; }
    if ay - ah / 2.0 > by + bh / 2.0 { return false; }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const W: usize = 20;
    const H: usize = 12;

    fn tiles_from(rows: &[&str]) -> Vec<Vec<Tile>> {
        let mut t = vec![vec![Tile::Empty; W]; H];
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                t[y][x] = Tile::from_char(ch).unwrap();
            }
        }
        t
    }

    fn view(tiles: &[Vec<Tile>], exits: [bool; 4]) -> MapView<'_> {
        MapView { tiles, width: W, height: H, exits }
    }

    const NO_EXITS: [bool; 4] = [false; 4];
    const RIGHT_EXIT: [bool; 4] = [false, false, false, true];

    // ── tile_at ──

    #[test]
    fn out_of_bounds_is_wall() {
        let t = tiles_from(&[]);
        let m = view(&t, NO_EXITS);
        for &(x, y) in &[(-1, 0), (0, -1), (20, 0), (0, 12), (-5, -5), (100, 100)] {
            assert_eq!(m.tile_at(x, y), Tile::Wall, "({x},{y})");
        }
        assert_eq!(m.tile_at(0, 0), Tile::Empty);
    }

    // ── is_walkable ──

    #[test]
    fn open_floor_is_walkable() {
        let t = tiles_from(&[]);
        assert!(view(&t, NO_EXITS).is_walkable(5.5, 5.5, 0.75, false));
    }

    #[test]
    fn wall_in_any_corner_blocks() {
        let t = tiles_from(&["", "", "", "", "", "      x"]);
        let m = view(&t, NO_EXITS);
        // Wall at (6,5). Box centered at (5.9, 5.5) with half 0.375 reaches x=6.275.
        assert!(!m.is_walkable(5.9, 5.5, 0.75, false));
        // Flush against the wall: right edge exactly 6.0 is exclusive.
        assert!(m.is_walkable(5.5, 5.5, 1.0, false));
    }

    #[test]
    fn door_needs_key() {
        let t = tiles_from(&["", "", "", "   d"]);
        let m = view(&t, NO_EXITS);
        assert!(!m.is_walkable(3.5, 3.5, 0.75, false));
        assert!(m.is_walkable(3.5, 3.5, 0.75, true));
    }

    #[test]
    fn water_and_bush_do_not_block_walking() {
        let t = tiles_from(&["", "", "  wb="]);
        let m = view(&t, NO_EXITS);
        assert!(m.is_walkable(2.5, 2.5, 0.75, false));
        assert!(m.is_walkable(3.5, 2.5, 0.75, false));
        assert!(m.is_walkable(4.5, 2.5, 0.75, false));
    }

    #[test]
    fn edge_overhang_needs_an_exit() {
        let t = tiles_from(&[]);
        let closed = view(&t, NO_EXITS);
        let open = view(&t, RIGHT_EXIT);
        // right edge at 20.2: 0.2 past the screen
        assert!(!closed.is_walkable(19.825, 5.5, 0.75, false));
        assert!(open.is_walkable(19.825, 5.5, 0.75, false));
        // left side has no exit in either view
        assert!(!open.is_walkable(0.2, 5.5, 0.75, false));
    }

    #[test]
    fn overhang_limited_to_buffer() {
        let t = tiles_from(&[]);
        let m = view(&t, RIGHT_EXIT);
        let half = 0.375;
        assert!(m.is_walkable(20.0 - half + TRANSITION_BUFFER - 0.01, 5.5, 0.75, false));
        assert!(!m.is_walkable(20.0 - half + TRANSITION_BUFFER + 0.01, 5.5, 0.75, false));
    }

    #[test]
    fn overhang_checks_edge_tile_at_crossing() {
        // Boundary wall on column 19 with a gap on row 5
        let mut rows: Vec<String> = (0..H).map(|_| format!("{:19}x", "")).collect();
        rows[5] = format!("{:20}", "");
        let refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let t = tiles_from(&refs);
        let m = view(&t, RIGHT_EXIT);
        assert!(m.is_walkable(19.9, 5.5, 0.75, false));
        assert!(!m.is_walkable(19.9, 3.5, 0.75, false));
    }

    #[test]
    fn walkable_matches_overlap_set() {
        // Scatter walls, then compare against a brute-force overlap scan.
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut t = vec![vec![Tile::Empty; W]; H];
        for _ in 0..40 {
            let x = rng.gen_range(0..W);
            let y = rng.gen_range(0..H);
            t[y][x] = Tile::Wall;
        }
        let m = view(&t, NO_EXITS);

        for _ in 0..2000 {
            let hitbox = rng.gen_range(0.2f32..1.8);
            let half = hitbox / 2.0;
            let x = rng.gen_range(half..(W as f32 - half));
            let y = rng.gen_range(half..(H as f32 - half));

            let mut any_wall = false;
            for ty in 0..H {
                for tx in 0..W {
                    let overlaps_x = (tx as f32) <= x + half - EDGE_EPSILON && ((tx + 1) as f32) > x - half;
                    let overlaps_y = (ty as f32) <= y + half - EDGE_EPSILON && ((ty + 1) as f32) > y - half;
                    if overlaps_x && overlaps_y && t[ty][tx] == Tile::Wall {
                        any_wall = true;
                    }
                }
            }
            assert_eq!(m.is_walkable(x, y, hitbox, false), !any_wall, "x={x} y={y} hitbox={hitbox}");
        }
    }

    // ── resolve_move ──

    #[test]
    fn approach_stops_short_of_wall_column() {
        let rows: Vec<String> = (0..H).map(|_| "     x".to_string()).collect();
        let refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let t = tiles_from(&refs);
        let m = view(&t, NO_EXITS);

        let mut pos = (3.0, 6.5);
        for _ in 0..100 {
            pos = m.resolve_move(pos, (pos.0 + 0.05, pos.1), 1.0, false);
        }
        assert!(pos.0 <= 4.5 + 1e-3, "advanced to {}", pos.0);
        assert!(pos.0 > 4.4, "stopped early at {}", pos.0);
    }

    #[test]
    fn slides_along_wall() {
        let t = tiles_from(&["", "", "", "", "", "       x"]);
        let m = view(&t, NO_EXITS);
        // Diagonal into the wall at (7,5): x is blocked, y still moves.
        let to = m.resolve_move((6.6, 5.5), (6.7, 5.6), 0.75, false);
        assert_eq!(to.0, 6.6);
        assert!((to.1 - 5.6).abs() < 1e-6);
    }

    // ── unstuck ──

    #[test]
    fn unstuck_walks_toward_center() {
        let t = tiles_from(&["xxxxxxxxxxxxxxxxxxxx", "xxxxxxxxxxxxxxxxxxxx"]);
        let m = view(&t, NO_EXITS);
        let (x, y) = m.unstuck(10.0, 0.5, 0.75, false);
        assert!(m.is_walkable(x, y, 0.75, false));
        assert!(y > 0.5 && y <= 6.0);
        assert!((x - 10.0).abs() < 1e-4);
    }

    #[test]
    fn unstuck_keeps_valid_position() {
        let t = tiles_from(&[]);
        let m = view(&t, NO_EXITS);
        assert_eq!(m.unstuck(3.5, 3.5, 0.75, false), (3.5, 3.5));
    }

    #[test]
    fn unstuck_gives_up_gracefully() {
        let t = vec![vec![Tile::Wall; W]; H];
        let m = view(&t, NO_EXITS);
        assert_eq!(m.unstuck(3.5, 3.5, 0.75, false), (3.5, 3.5));
    }

    // ── boxes_overlap ──

    #[test]
    fn overlap_requires_both_axes() {
        let unit = |x: f32, y: f32| (x, y, 1.0, 1.0);
        assert!(boxes_overlap(unit(0.0, 0.0), unit(0.9, 0.9)));
        assert!(!boxes_overlap(unit(0.0, 0.0), unit(1.1, 0.0)));
        assert!(!boxes_overlap(unit(0.0, 0.0), unit(0.0, 1.1)));
        assert!(boxes_overlap((0.0, 0.0, 0.5, 0.5), (0.0, 0.7, 1.0, 1.0)));
        assert!(!boxes_overlap((0.0, 0.0, 0.5, 0.5), (0.0, 0.8, 0.5, 0.5)));
    }

    // ── clamp_inside ──

    #[test]
    fn clamp_only_on_closed_sides() {
        let t = tiles_from(&[]);
        let m = view(&t, RIGHT_EXIT);
        assert_eq!(m.clamp_inside(20.3, 5.0, 1.0), (20.3, 5.0));
        assert_eq!(m.clamp_inside(-0.3, 5.0, 1.0), (0.5, 5.0));
        assert_eq!(m.clamp_inside(5.0, 12.4, 1.0), (5.0, 11.5));
    }

    #[test]
    fn attack_terrain_is_weapon_specific() {
        let t = tiles_from(&["", "  w"]);
        let m = view(&t, NO_EXITS);
        assert!(m.blocks_attack(2.5, 1.5, Weapon::Bow));
        assert!(!m.blocks_attack(2.5, 1.5, Weapon::Dagger));
        assert!(m.blocks_attack(-0.5, 1.5, Weapon::Dagger));
    }
}
