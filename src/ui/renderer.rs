/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Compose the next frame into the `front` buffer
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Layout:
///   row 0        status bar (hearts, keys, arrows, weapon, screen)
///   rows 2..14   the current screen, each tile two columns wide;
///                minimap to the right
///   below        status message, help line; pause / game-over banners
///                over the map

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::bestiary::EnemyKind;
use crate::domain::entity::{AttackOwner, Direction, EnemyState, Weapon};
use crate::domain::tile::Tile;
use crate::sim::game::{GameState, Phase};
use crate::sim::world::{Screen, SCREEN_HEIGHT, SCREEN_WIDTH};

const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };
const GRASS_BG: Color = Color::Rgb { r: 45, g: 90, b: 39 };
const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };

/// Each tile = 2 terminal columns.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;
const MINIMAP_COL: usize = SCREEN_WIDTH * CELL_W + 3;
const MESSAGE_ROW: usize = MAP_ROW + SCREEN_HEIGHT;
const HELP_ROW: usize = MESSAGE_ROW + 1;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: BASE_BG };

    /// Differs from any real cell, so every position is re-emitted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }

    /// One tile at tile coordinates (tx, ty) of the map area.
    fn put_tile(&mut self, tx: usize, ty: usize, glyph: Glyph) {
        let (c0, c1, fg, bg) = glyph;
        let col = tx * CELL_W;
        self.set(col, MAP_ROW + ty, Cell::new(c0, fg, bg));
        self.set(col + 1, MAP_ROW + ty, Cell::new(c1, fg, bg));
    }

    fn tile_bg(&self, tx: usize, ty: usize) -> Color {
        self.get(tx * CELL_W, MAP_ROW + ty).bg
    }
}

/// Two characters plus colors for one tile.
type Glyph = (char, char, Color, Color);

// ── Renderer ──

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Shows the pad marker in the HUD.
    pub gamepad_connected: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            gamepad_connected: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(BASE_BG),
            Clear(ClearType::All)
        )?;

        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    /// Force a full repaint on the next frame.
    pub fn invalidate(&mut self) {
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, game: &GameState) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.back.cells.fill(Cell::INVALID);
            queue!(self.writer, SetBackgroundColor(BASE_BG), Clear(ClearType::All))?;
        }

        if self.last_phase != Some(game.phase) {
            self.back.cells.fill(Cell::INVALID);
            self.last_phase = Some(game.phase);
        }

        self.front.clear();
        compose(&mut self.front, game, self.gamepad_connected);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        // Explicit base colors; ResetColor would fall back to the
        // terminal's own default and leave seams between rows.
        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

// ══════════════════════════════════════════════════════════════
// Composition
// ══════════════════════════════════════════════════════════════

fn compose(front: &mut FrameBuffer, game: &GameState, gamepad: bool) {
    compose_hud(front, game, gamepad);

    if game.phase == Phase::Transition {
        compose_slide(front, game);
    } else {
        compose_screen(front, game.world.current(), 0, 0);
        compose_entities(front, game);
    }
    compose_minimap(front, game);

    if !game.message.is_empty() {
        let msg = format!(" ◈ {} ", game.message);
        front.put_str(0, MESSAGE_ROW, &msg, Color::Black, Color::Rgb { r: 200, g: 180, b: 50 });
    }

    let help = " Move:Arrows/WASD  Attack:Z  Bow:X  Weapon:[ ]  Pause:P  Quit:Esc";
    front.put_str(0, HELP_ROW, help, Color::DarkGrey, BASE_BG);

    if game.phase == Phase::GameOver {
        compose_banner(front, " YOU DIED - press R or Start to try again ", Color::Rgb { r: 150, g: 20, b: 20 });
    } else if game.paused {
        compose_banner(front, " PAUSED - P / F1 / Start to resume ", Color::Rgb { r: 60, g: 60, b: 60 });
    }
}

fn compose_hud(front: &mut FrameBuffer, game: &GameState, gamepad: bool) {
    front.fill_row(HUD_ROW, HUD_BG);
    let p = &game.player;

    let mut x = 1;
    for i in 0..p.max_health.max(0) {
        let (ch, fg) = if i < p.health {
            ('♥', Color::Rgb { r: 230, g: 40, b: 60 })
        } else {
            ('♡', Color::DarkGrey)
        };
        front.set(x, HUD_ROW, Cell::new(ch, fg, HUD_BG));
        x += 2;
    }

    let weapon = p.equipped.map_or("-", Weapon::name);
    let (col, row) = game.world.cursor();
    let status = format!(
        "  Keys:{}  Arrows:{:<3} Weapon:{:<6} Screen {},{}",
        p.inventory.keys, p.inventory.arrows, weapon, col, row,
    );
    front.put_str(x, HUD_ROW, &status, Color::White, HUD_BG);

    if gamepad {
        let x = x + status.chars().count() + 2;
        front.put_str(x, HUD_ROW, "[Pad]", Color::Rgb { r: 120, g: 200, b: 120 }, HUD_BG);
    }
}

/// Draw `screen` into the map area, shifted by (dx, dy) tiles. Tiles that
/// fall outside the map area are skipped.
fn compose_screen(front: &mut FrameBuffer, screen: &Screen, dx: i32, dy: i32) {
    let bg = screen.background.as_deref().and_then(parse_hex).unwrap_or(GRASS_BG);
    for (y, row) in screen.layout.iter().enumerate() {
        for (x, &tile) in row.iter().enumerate() {
            let (tx, ty) = (x as i32 + dx, y as i32 + dy);
            if tx < 0 || ty < 0 || tx >= SCREEN_WIDTH as i32 || ty >= SCREEN_HEIGHT as i32 { continue; }
            front.put_tile(tx as usize, ty as usize, tile_glyph(tile, bg));
        }
    }
}

/// Outgoing and incoming screens side by side, scrolled by progress.
fn compose_slide(front: &mut FrameBuffer, game: &GameState) {
    let Some(dir) = game.transition.direction() else { return };
    let outgoing = game.world.current();
    let Some(incoming) = game.world.get_next_screen(dir) else {
        compose_screen(front, outgoing, 0, 0);
        return;
    };

    let (w, h) = (SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32);
    let p = game.transition.progress();
    let (sx, sy) = dir.step();
    let shift_x = (p * w as f32).round() as i32 * sx;
    let shift_y = (p * h as f32).round() as i32 * sy;

    compose_screen(front, outgoing, -shift_x, -shift_y);
    compose_screen(front, incoming, sx * w - shift_x, sy * h - shift_y);
}

fn compose_entities(front: &mut FrameBuffer, game: &GameState) {
    for part in &game.combat.particles {
        if let Some((tx, ty)) = tile_of(part.x, part.y) {
            let bg = front.tile_bg(tx, ty);
            front.put_tile(tx, ty, ('·', ' ', Color::Rgb { r: 255, g: 240, b: 160 }, bg));
        }
    }

    for enemy in &game.world.current().enemies {
        if enemy.state == EnemyState::Fading { continue; }
        let Some((tx, ty)) = tile_of(enemy.x, enemy.y) else { continue };
        let bg = front.tile_bg(tx, ty);
        let (ch, fg) = enemy_glyph(enemy.kind);
        let fg = if enemy.invincible_ms > 0.0 { Color::White } else { fg };
        front.put_tile(tx, ty, (ch, ' ', fg, bg));
    }

    for attack in &game.combat.attacks {
        let Some((tx, ty)) = tile_of(attack.x, attack.y) else { continue };
        let bg = front.tile_bg(tx, ty);
        let horizontal = attack.dx.abs() > attack.dy.abs();
        let (ch, fg) = match (attack.weapon, attack.owner) {
            (Weapon::Sword, _) => (if horizontal { '─' } else { '│' }, Color::Rgb { r: 220, g: 220, b: 255 }),
            (Weapon::Bow, _) => (if horizontal { '→' } else { '↓' }, Color::Rgb { r: 200, g: 160, b: 80 }),
            (Weapon::Dagger, AttackOwner::Enemy(_)) => ('✦', Color::Rgb { r: 200, g: 90, b: 255 }),
            (Weapon::Dagger, AttackOwner::Player) => ('✦', Color::Rgb { r: 220, g: 220, b: 255 }),
        };
        let ch = match (ch, attack.dx < 0.0, attack.dy < 0.0) {
            ('→', true, _) => '←',
            ('↓', _, true) => '↑',
            (c, _, _) => c,
        };
        front.put_tile(tx, ty, (ch, ' ', fg, bg));
    }

    let p = &game.player;
    // Blink while invincible.
    let visible = !p.is_invincible() || (game.elapsed_ms / 100.0) as u64 % 2 == 0;
    if visible {
        if let Some((tx, ty)) = tile_of(p.x, p.y) {
            let bg = front.tile_bg(tx, ty);
            let ch = match p.direction {
                Direction::Up => '▲',
                Direction::Down => '▼',
                Direction::Left => '◀',
                Direction::Right => '▶',
            };
            front.put_tile(tx, ty, (ch, ' ', Color::Rgb { r: 120, g: 255, b: 120 }, bg));
        }
    }
}

fn compose_minimap(front: &mut FrameBuffer, game: &GameState) {
    let world = &game.world;
    front.put_str(MINIMAP_COL, MAP_ROW, "Map", Color::Grey, BASE_BG);
    for row in 0..world.rows() {
        for col in 0..world.cols() {
            let Some(screen) = world.screen_at(col, row) else { continue };
            let (ch, fg) = if (col, row) == world.cursor() {
                ('■', Color::Rgb { r: 120, g: 255, b: 120 })
            } else if screen.cleared && screen.visited {
                ('▪', Color::Rgb { r: 200, g: 200, b: 80 })
            } else if screen.visited {
                ('□', Color::Grey)
            } else {
                ('·', Color::DarkGrey)
            };
            front.set(MINIMAP_COL + col * CELL_W, MAP_ROW + 1 + row, Cell::new(ch, fg, BASE_BG));
        }
    }
}

fn compose_banner(front: &mut FrameBuffer, text: &str, bg: Color) {
    let width = SCREEN_WIDTH * CELL_W;
    let len = text.chars().count();
    let x = width.saturating_sub(len) / 2;
    let y = MAP_ROW + SCREEN_HEIGHT / 2;
    front.put_str(x, y, text, Color::White, bg);
}

// ── Glyph tables ──

fn tile_glyph(tile: Tile, bg: Color) -> Glyph {
    match tile {
        Tile::Empty => (' ', ' ', Color::White, bg),
        Tile::Wall => ('█', '█', Color::Rgb { r: 120, g: 120, b: 120 }, Color::Rgb { r: 70, g: 70, b: 70 }),
        Tile::Door => ('▐', '▌', Color::Rgb { r: 170, g: 110, b: 40 }, Color::Rgb { r: 90, g: 55, b: 20 }),
        Tile::Bush => ('♣', '♣', Color::Rgb { r: 40, g: 160, b: 40 }, bg),
        Tile::Water => ('≈', '≈', Color::Rgb { r: 120, g: 180, b: 255 }, Color::Rgb { r: 30, g: 60, b: 140 }),
        Tile::Bridge => ('═', '═', Color::Rgb { r: 170, g: 120, b: 60 }, Color::Rgb { r: 30, g: 60, b: 140 }),
        Tile::Key => ('⚷', ' ', Color::Rgb { r: 255, g: 220, b: 50 }, bg),
        Tile::Sword => ('†', ' ', Color::Rgb { r: 220, g: 220, b: 255 }, bg),
        Tile::Heart => ('♥', ' ', Color::Rgb { r: 230, g: 40, b: 60 }, bg),
        Tile::Bow => (')', ' ', Color::Rgb { r: 200, g: 160, b: 80 }, bg),
        Tile::Arrow => ('↑', ' ', Color::Rgb { r: 200, g: 160, b: 80 }, bg),
    }
}

fn enemy_glyph(kind: EnemyKind) -> (char, Color) {
    match kind {
        EnemyKind::Slime => ('s', Color::Rgb { r: 80, g: 220, b: 80 }),
        EnemyKind::Bat => ('b', Color::Rgb { r: 160, g: 100, b: 200 }),
        EnemyKind::Skeleton => ('S', Color::Rgb { r: 230, g: 230, b: 210 }),
        EnemyKind::Wizard => ('W', Color::Rgb { r: 200, g: 90, b: 255 }),
        EnemyKind::Ghost => ('G', Color::Rgb { r: 180, g: 220, b: 255 }),
        EnemyKind::Spider => ('x', Color::Rgb { r: 200, g: 60, b: 40 }),
    }
}

/// Tile containing a world position, if it is on the screen.
fn tile_of(x: f32, y: f32) -> Option<(usize, usize)> {
    if x < 0.0 || y < 0.0 { return None; }
    let (tx, ty) = (x.floor() as usize, y.floor() as usize);
    (tx < SCREEN_WIDTH && ty < SCREEN_HEIGHT).then_some((tx, ty))
}

/// `#rrggbb` → RGB color.
fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 { return None; }
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(Color::Rgb { r: byte(0)?, g: byte(2)?, b: byte(4)? })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuningConfig;
    use crate::sim::level::builtin_world;

    fn game() -> GameState {
        let mut rng = GameState::make_rng(Some(9));
        let loaded = builtin_world(&mut rng).unwrap();
        GameState::new(loaded, TuningConfig::default(), rng)
    }

    fn frame(game: &GameState) -> FrameBuffer {
        let mut fb = FrameBuffer::new(80, 24);
        compose(&mut fb, game, false);
        fb
    }

    #[test]
    fn hex_backgrounds() {
        assert_eq!(parse_hex("#2d5a27"), Some(Color::Rgb { r: 0x2d, g: 0x5a, b: 0x27 }));
        assert_eq!(parse_hex("2d5a27"), None);
        assert_eq!(parse_hex("#2d5a2"), None);
        assert_eq!(parse_hex("#zz5a27"), None);
    }

    #[test]
    fn tiles_are_two_columns_wide() {
        let g = game();
        let fb = frame(&g);
        // top-left wall
        assert_eq!(fb.get(0, MAP_ROW).ch, '█');
        assert_eq!(fb.get(1, MAP_ROW).ch, '█');
        // key at (5, 2)
        assert_eq!(fb.get(5 * CELL_W, MAP_ROW + 2).ch, '⚷');
    }

    #[test]
    fn player_and_hud_drawn() {
        let g = game();
        let fb = frame(&g);
        let (tx, ty) = tile_of(g.player.x, g.player.y).unwrap();
        assert_eq!(fb.get(tx * CELL_W, MAP_ROW + ty).ch, '▼');
        let hearts = (0..fb.width).filter(|&x| fb.get(x, HUD_ROW).ch == '♥').count();
        assert_eq!(hearts, 3);
    }

    #[test]
    fn hud_shows_pad_only_when_connected() {
        let g = game();
        let hud = |fb: &FrameBuffer| (0..fb.width).map(|x| fb.get(x, HUD_ROW).ch).collect::<String>();
        assert!(!hud(&frame(&g)).contains("[Pad]"));

        let mut fb = FrameBuffer::new(80, 24);
        compose(&mut fb, &g, true);
        assert!(hud(&fb).contains("[Pad]"));
    }

    #[test]
    fn minimap_marks_current_screen() {
        let g = game();
        let fb = frame(&g);
        assert_eq!(fb.get(MINIMAP_COL, MAP_ROW + 1).ch, '■');
        assert_eq!(fb.get(MINIMAP_COL + CELL_W, MAP_ROW + 1).ch, '·');
    }

    #[test]
    fn positions_off_screen_have_no_tile() {
        assert_eq!(tile_of(-0.1, 3.0), None);
        assert_eq!(tile_of(20.0, 3.0), None);
        assert_eq!(tile_of(19.9, 11.9), Some((19, 11)));
    }
}
