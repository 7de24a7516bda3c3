/// Tile kinds and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.
///
/// ## Level alphabet
///   ' ' = Empty     'x' = Wall      'd' = Door (needs a key)
///   'b' = Bush      'w' = Water     '=' = Bridge
///   'k' = Key       's' = Sword     'h' = Heart
///   'v' = Bow       'a' = Arrow

use super::entity::Item;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Wall,
    Door,
    Bush,
    Water,
    Bridge,
    Key,
    Sword,
    Heart,
    Bow,
    Arrow,
}

impl Tile {
    pub fn from_char(c: char) -> Option<Tile> {
        let tile = match c {
            ' ' => Tile::Empty,
            'x' => Tile::Wall,
            'd' => Tile::Door,
            'b' => Tile::Bush,
            'w' => Tile::Water,
            '=' => Tile::Bridge,
            'k' => Tile::Key,
            's' => Tile::Sword,
            'h' => Tile::Heart,
            'v' => Tile::Bow,
            'a' => Tile::Arrow,
            _ => return None,
        };
        Some(tile)
    }

    /// The pickup this tile represents, if any.
    pub fn item(self) -> Option<Item> {
        match self {
            Tile::Key => Some(Item::Key),
            Tile::Sword => Some(Item::Sword),
            Tile::Heart => Some(Item::Heart),
            Tile::Bow => Some(Item::Bow),
            Tile::Arrow => Some(Item::Arrow),
            _ => None,
        }
    }

    pub fn is_item(self) -> bool {
        self.item().is_some()
    }

    /// Does this tile stop an entity from walking through it?
    /// Doors only open for a key holder.
    pub fn blocks_walking(self, has_key: bool) -> bool {
        match self {
            Tile::Wall => true,
            Tile::Door => !has_key,
            _ => false,
        }
    }
}

impl From<Item> for Tile {
    fn from(item: Item) -> Tile {
        match item {
            Item::Key => Tile::Key,
            Item::Sword => Tile::Sword,
            Item::Heart => Tile::Heart,
            Item::Bow => Tile::Bow,
            Item::Arrow => Tile::Arrow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphabet_covers_every_tile() {
        let tiles: Vec<Tile> = " xdbw=kshva".chars().map(|c| Tile::from_char(c).unwrap()).collect();
        assert_eq!(tiles[0], Tile::Empty);
        assert_eq!(tiles[2], Tile::Door);
        assert_eq!(tiles[5], Tile::Bridge);
        assert_eq!(tiles[9], Tile::Bow);
        for (i, a) in tiles.iter().enumerate() {
            assert!(tiles[i + 1..].iter().all(|b| b != a));
        }
    }

    #[test]
    fn unknown_char_is_rejected() {
        assert_eq!(Tile::from_char('?'), None);
        assert_eq!(Tile::from_char('X'), None);
    }

    #[test]
    fn door_needs_key() {
        assert!(Tile::Door.blocks_walking(false));
        assert!(!Tile::Door.blocks_walking(true));
        assert!(Tile::Wall.blocks_walking(true));
        assert!(!Tile::Water.blocks_walking(false));
    }

    #[test]
    fn items_map_back_to_tiles() {
        for tile in [Tile::Key, Tile::Sword, Tile::Heart, Tile::Bow, Tile::Arrow] {
            let item = tile.item().unwrap();
            assert_eq!(Tile::from(item), tile);
        }
        assert!(!Tile::Bush.is_item());
    }
}
