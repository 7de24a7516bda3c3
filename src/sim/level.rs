/// World loader.
///
/// ## Sources (priority order):
///   1. `world_file` from config (TOML, format below)
///   2. Built-in embedded world
///
/// ## World format (TOML):
///   ```toml
///   start = { screen = [0, 0], x = 3.5, y = 5.5 }
///
///   [[screen]]
///   at = [0, 0]                # [col, row] in the screen grid
///   background = "#2d5a27"     # optional
///   layout = [
///     "xxxxxxxxxxxxxxxxxxxx",
///     "x    k             x",
///     ...
///   ]
///   enemies = [{ type = "slime", x = 5, y = 4 }]
///   ```
///
/// Grid size is taken from the largest `at`; holes become closed rooms.
/// Enemy `x, y` are cell coordinates; the enemy starts at the cell center.
///
/// ## Layout rows
/// At most 12 rows of at most 20 cells. Short rows and missing rows are
/// padded with empty cells. See `Tile` for the alphabet; anything else is
/// an error.

use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::bestiary::EnemyKind;
use crate::domain::tile::Tile;
use super::world::{Screen, Spawn, World, SCREEN_HEIGHT, SCREEN_WIDTH};

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid world file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("screen {screen:?}, row {row}, column {col}: unknown tile {ch:?}")]
    UnknownTile { screen: [usize; 2], row: usize, col: usize, ch: char },
    #[error("screen {screen:?}, row {row}: {len} cells wide (max {max})", max = SCREEN_WIDTH)]
    RowTooLong { screen: [usize; 2], row: usize, len: usize },
    #[error("screen {screen:?}: {rows} rows (max {max})", max = SCREEN_HEIGHT)]
    TooManyRows { screen: [usize; 2], rows: usize },
    #[error("screen {screen:?} defined twice")]
    DuplicateScreen { screen: [usize; 2] },
    #[error("screen {screen:?}: {kind} spawn at ({x}, {y}) is outside the screen")]
    SpawnOutside { screen: [usize; 2], kind: &'static str, x: usize, y: usize },
    #[error("start position {screen:?} ({x}, {y}) is outside the world")]
    StartOutside { screen: [usize; 2], x: f32, y: f32 },
    #[error("world has no screens")]
    Empty,
}

// ── TOML schema ──

#[derive(Deserialize, Debug, Default)]
pub struct WorldDef {
    #[serde(default)]
    pub start: Option<StartDef>,
    #[serde(default, rename = "screen")]
    pub screens: Vec<ScreenDef>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct StartDef {
    pub screen: [usize; 2],
    pub x: f32,
    pub y: f32,
}

#[derive(Deserialize, Debug, Default)]
pub struct ScreenDef {
    pub at: [usize; 2],
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub layout: Vec<String>,
    #[serde(default)]
    pub enemies: Vec<SpawnDef>,
    /// Older files list item cells by hand; the layout scan supersedes it.
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SpawnDef {
    #[serde(rename = "type")]
    pub kind: EnemyKind,
    pub x: usize,
    pub y: usize,
}

/// A ready world plus where the player starts on the current screen.
#[derive(Debug)]
pub struct LoadedWorld {
    pub world: World,
    pub start: (f32, f32),
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

pub fn load_world_file(path: &Path, rng: &mut dyn RngCore) -> Result<LoadedWorld, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_world(&text, rng)?;
    info!(path = %path.display(), cols = loaded.world.cols(), rows = loaded.world.rows(), "world loaded");
    Ok(loaded)
}

pub fn parse_world(text: &str, rng: &mut dyn RngCore) -> Result<LoadedWorld, LevelError> {
    let def: WorldDef = toml::from_str(text)?;
    build_world(def, rng)
}

pub fn builtin_world(rng: &mut dyn RngCore) -> Result<LoadedWorld, LevelError> {
    let loaded = build_world(embedded_world(), rng)?;
    info!(cols = loaded.world.cols(), rows = loaded.world.rows(), "built-in world loaded");
    Ok(loaded)
}

pub fn build_world(def: WorldDef, rng: &mut dyn RngCore) -> Result<LoadedWorld, LevelError> {
    if def.screens.is_empty() {
        return Err(LevelError::Empty);
    }
    let cols = def.screens.iter().map(|s| s.at[0]).max().unwrap_or(0) + 1;
    let rows = def.screens.iter().map(|s| s.at[1]).max().unwrap_or(0) + 1;

    let mut grid: Vec<Vec<Option<Screen>>> = (0..rows).map(|_| (0..cols).map(|_| None).collect()).collect();
    for sd in def.screens {
        let [col, row] = sd.at;
        if grid[row][col].is_some() {
            return Err(LevelError::DuplicateScreen { screen: sd.at });
        }
        grid[row][col] = Some(parse_screen(sd)?);
    }

    let start = def.start.unwrap_or(StartDef {
        screen: [0, 0],
        x: SCREEN_WIDTH as f32 / 2.0,
        y: SCREEN_HEIGHT as f32 / 2.0,
    });
    let [sc, sr] = start.screen;
    let in_screen = (0.0..SCREEN_WIDTH as f32).contains(&start.x) && (0.0..SCREEN_HEIGHT as f32).contains(&start.y);
    if sc >= cols || sr >= rows || !in_screen {
        return Err(LevelError::StartOutside { screen: start.screen, x: start.x, y: start.y });
    }

    let screens: Vec<Vec<Screen>> = grid
        .into_iter()
        .enumerate()
        .map(|(r, row)| {
            row.into_iter()
                .enumerate()
                .map(|(c, s)| s.unwrap_or_else(|| {
                    warn!(screen = ?[c, r], "no screen defined here, using a closed room");
                    Screen::walled()
                }))
                .collect()
        })
        .collect();
    let world = World::new(screens, (sc, sr), rng).ok_or(LevelError::Empty)?;
    Ok(LoadedWorld { world, start: (start.x, start.y) })
}

// ══════════════════════════════════════════════════════════════
// Screen parsing
// ══════════════════════════════════════════════════════════════

fn parse_screen(def: ScreenDef) -> Result<Screen, LevelError> {
    if !def.items.is_empty() {
        debug!(screen = ?def.at, count = def.items.len(), "ignoring legacy item list");
    }
    let layout = parse_layout(&def.layout, def.at)?;

    let mut spawns = Vec::with_capacity(def.enemies.len());
    for e in &def.enemies {
        if e.x >= SCREEN_WIDTH || e.y >= SCREEN_HEIGHT {
            return Err(LevelError::SpawnOutside { screen: def.at, kind: e.kind.name(), x: e.x, y: e.y });
        }
        spawns.push(Spawn { kind: e.kind, x: e.x as f32 + 0.5, y: e.y as f32 + 0.5 });
    }

    Ok(Screen::new(layout, spawns, def.background))
}

/// Parse row strings into a full `SCREEN_HEIGHT × SCREEN_WIDTH` grid.
pub fn parse_layout<S: AsRef<str>>(rows: &[S], screen: [usize; 2]) -> Result<Vec<Vec<Tile>>, LevelError> {
    if rows.len() > SCREEN_HEIGHT {
        return Err(LevelError::TooManyRows { screen, rows: rows.len() });
    }
    let mut layout = vec![vec![Tile::Empty; SCREEN_WIDTH]; SCREEN_HEIGHT];
    for (y, row) in rows.iter().enumerate() {
        let row = row.as_ref();
        let len = row.chars().count();
        if len > SCREEN_WIDTH {
            return Err(LevelError::RowTooLong { screen, row: y, len });
        }
        for (x, ch) in row.chars().enumerate() {
            layout[y][x] = Tile::from_char(ch)
                .ok_or(LevelError::UnknownTile { screen, row: y, col: x, ch })?;
        }
    }
    Ok(layout)
}

// ══════════════════════════════════════════════════════════════
// Embedded world
// ══════════════════════════════════════════════════════════════

fn embedded_world() -> WorldDef {
    use EnemyKind::*;
    WorldDef {
        start: Some(StartDef { screen: [0, 0], x: 3.5, y: 5.5 }),
        screens: vec![
            make_embedded([0, 0], None, &[
                "xxxxxxxxxxxxxxxxxxxx",
                "x                  x",
                "x    k             x",
                "x   xxx            x",
                "x                  x",
                "x         s         ",
                "x                   ",
                "x                  x",
                "x          xxx     x",
                "x           x      x",
                "x           x      x",
                "xxxxxxxx  xxxxxxxxxx",
            ], &[(Slime, 15, 3), (Slime, 15, 9)]),
            make_embedded([1, 0], None, &[
                "xxxxxxxxxxxxxxxxxxxx",
                "x                  x",
                "x                  x",
                "x    bbb           x",
                "x     b            x",
                "      b             ",
                "      b             ",
                "x    bbb           x",
                "x                  x",
                "x                  x",
                "x                  x",
                "xxxxxxxx  xxxxxxxxxx",
            ], &[(Bat, 12, 3), (Bat, 14, 8), (Skeleton, 10, 6)]),
            make_embedded([2, 0], Some("#3a3a2a"), &[
                "xxxxxxxxxxxxxxxxxxxx",
                "x                  x",
                "x                  x",
                "x    bbb bbb bbb   x",
                "x    b b b   b     x",
                "     bbb bbb bbb   x",
                "     b b   b   b   x",
                "x    b b bbb bbb   x",
                "x                  x",
                "x               a  x",
                "x                  x",
                "xxxxxxxx  xxxxxxxxxx",
            ], &[(Spider, 3, 9), (Wizard, 17, 2)]),
            make_embedded([0, 1], Some("#1d3b5a"), &[
                "xxxxxxxx  xxxxxxxxxx",
                "x                  x",
                "x                  x",
                "x                  x",
                "x       wwwww      x",
                "x      wwwwwww      ",
                "x     wwwwwwwww     ",
                "x      wwwwwww     x",
                "x       wwwww      x",
                "x         h        x",
                "x                  x",
                "xxxxxxxxxxxxxxxxxxxx",
            ], &[(Slime, 3, 8), (Ghost, 16, 3)]),
            make_embedded([1, 1], None, &[
                "xxxxxxxx  xxxxxxxxxx",
                "x                  x",
                "x                  x",
                "x   wwwwwwwwwww    x",
                "x   w         w    x",
                "    w    d    w    x",
                "    w  v      w    x",
                "x   w         w    x",
                "x   wwwww=wwwww    x",
                "x                  x",
                "x        k         x",
                "xxxxxxxxxxxxxxxxxxxx",
            ], &[(Skeleton, 2, 2), (Wizard, 17, 9)]),
            make_embedded([2, 1], Some("#2a1a2a"), &[
                "xxxxxxxx  xxxxxxxxxx",
                "x                  x",
                "x  xx          xx  x",
                "x  x            x  x",
                "x                  x",
                "x       a  a       x",
                "x                  x",
                "x                  x",
                "x  x            x  x",
                "x  xx          xx  x",
                "x                  x",
                "xxxxxxxxxxxxxxxxxxxx",
            ], &[(Ghost, 6, 6), (Bat, 13, 4), (Bat, 13, 8)]),
        ],
    }
}

fn make_embedded(
    at: [usize; 2],
    background: Option<&str>,
    layout: &[&str],
    enemies: &[(EnemyKind, usize, usize)],
) -> ScreenDef {
    ScreenDef {
        at,
        background: background.map(str::to_string),
        layout: layout.iter().map(|s| s.to_string()).collect(),
        enemies: enemies.iter().map(|&(kind, x, y)| SpawnDef { kind, x, y }).collect(),
        items: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Item;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(5)
    }

    #[test]
    fn builtin_world_loads() {
        let loaded = builtin_world(&mut rng()).unwrap();
        assert_eq!((loaded.world.cols(), loaded.world.rows()), (3, 2));
        assert_eq!(loaded.world.cursor(), (0, 0));
        assert_eq!(loaded.world.current().enemies.len(), 2);
        assert_eq!(loaded.world.item_at(5, 2), Some(Item::Key));
        assert_eq!(loaded.world.item_at(10, 5), Some(Item::Sword));
        let map = loaded.world.map_view();
        assert!(map.is_walkable(loaded.start.0, loaded.start.1, 0.75, false));
    }

    #[test]
    fn parses_toml_world() {
        let text = r##"
            start = { screen = [1, 0], x = 4.5, y = 4.5 }

            [[screen]]
            at = [1, 0]
            background = "#224422"
            layout = ["xxxx", "x  h", "x k"]
            enemies = [{ type = "bat", x = 5, y = 4 }]
            items = ["3,1"]
        "##;
        let loaded = parse_world(text, &mut rng()).unwrap();
        let world = &loaded.world;
        assert_eq!((world.cols(), world.rows()), (2, 1));
        assert_eq!(world.cursor(), (1, 0));
        assert_eq!(world.current().background.as_deref(), Some("#224422"));
        assert_eq!(world.item_at(3, 1), Some(Item::Heart));
        assert_eq!(world.item_at(2, 2), Some(Item::Key));
        // short rows and missing rows are padded
        assert_eq!(world.get_tile(10, 1), Tile::Empty);
        assert_eq!(world.get_tile(3, 11), Tile::Empty);

        let bat = &world.current().enemies[0];
        assert_eq!(bat.kind, EnemyKind::Bat);
        assert_eq!((bat.x, bat.y), (5.5, 4.5));

        // The hole at [0, 0] became a closed room.
        let filler = world.screen_at(0, 0).unwrap();
        assert_eq!(filler.layout[0][0], Tile::Wall);
        assert!(filler.spawns.is_empty());
    }

    #[test]
    fn bundled_crypt_world_parses() {
        let loaded = parse_world(include_str!("../../worlds/crypt.toml"), &mut rng()).unwrap();
        assert_eq!((loaded.world.cols(), loaded.world.rows()), (2, 1));
        assert_eq!(loaded.start, (2.5, 6.5));
        assert_eq!(loaded.world.current().enemies.len(), 2);
        let crypt = loaded.world.screen_at(1, 0).unwrap();
        assert_eq!(crypt.spawns.len(), 3);
        assert_eq!(crypt.layout[5][16], Tile::Door);
        assert_eq!(crypt.layout[8][10], Tile::Bridge);
    }

    #[test]
    fn unknown_tile_is_rejected() {
        let err = parse_layout(&["x?x"], [0, 0]).unwrap_err();
        match err {
            LevelError::UnknownTile { row, col, ch, .. } => assert_eq!((row, col, ch), (0, 1, '?')),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn oversized_layouts_are_rejected() {
        let long = "x".repeat(SCREEN_WIDTH + 1);
        assert!(matches!(parse_layout(&[long.as_str()], [0, 0]), Err(LevelError::RowTooLong { len: 21, .. })));

        let rows: Vec<&str> = vec![""; SCREEN_HEIGHT + 1];
        assert!(matches!(parse_layout(&rows, [0, 0]), Err(LevelError::TooManyRows { .. })));
    }

    #[test]
    fn structural_errors() {
        let dup = "[[screen]]\nat = [0, 0]\n[[screen]]\nat = [0, 0]\n";
        assert!(matches!(parse_world(dup, &mut rng()), Err(LevelError::DuplicateScreen { .. })));

        let spawn = "[[screen]]\nat = [0, 0]\nenemies = [{ type = \"slime\", x = 20, y = 0 }]\n";
        assert!(matches!(parse_world(spawn, &mut rng()), Err(LevelError::SpawnOutside { .. })));

        let start = "start = { screen = [3, 0], x = 1.0, y = 1.0 }\n[[screen]]\nat = [0, 0]\n";
        assert!(matches!(parse_world(start, &mut rng()), Err(LevelError::StartOutside { .. })));

        assert!(matches!(parse_world("", &mut rng()), Err(LevelError::Empty)));
        assert!(matches!(parse_world("[[screen]]\nat = 1", &mut rng()), Err(LevelError::Toml(_))));
        assert!(matches!(
            parse_world("[[screen]]\nat = [0, 0]\nenemies = [{ type = \"dragon\", x = 1, y = 1 }]", &mut rng()),
            Err(LevelError::Toml(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_world_file(Path::new("/nonexistent/world.toml"), &mut rng()).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/world.toml"));
    }
}
