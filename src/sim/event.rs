/// Events emitted during a simulation step.
/// The presentation layer consumes these for sound and status messages.

use crate::domain::bestiary::EnemyKind;
use crate::domain::entity::{Direction, EnemyId, Item, Weapon};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    AttackLaunched { weapon: Weapon, by_player: bool },
    AttackBlocked { x: f32, y: f32 },
    EnemyHit { id: EnemyId, x: f32, y: f32 },
    EnemyKilled { id: EnemyId, kind: EnemyKind, x: f32, y: f32 },
    PlayerHurt { damage: i32, health: i32 },
    PlayerDied,
    ItemCollected { item: Item },
    ItemDropped { item: Item, x: usize, y: usize },
    WeaponSwitched { weapon: Weapon },
    ScreenCleared { screen: (usize, usize) },
    BonusDropped { x: usize, y: usize },
    TransitionStarted { direction: Direction },
    ScreenEntered { screen: (usize, usize) },
}

impl GameEvent {
    /// Status-line text for events worth telling the player about.
    pub fn describe(&self) -> Option<String> {
        match self {
            GameEvent::ItemCollected { item } => Some(format!("Got {}", item_name(*item))),
            GameEvent::ItemDropped { item, .. } => Some(format!("Something dropped {}", item_name(*item))),
            GameEvent::WeaponSwitched { weapon } => Some(format!("Equipped {}", weapon.name())),
            GameEvent::EnemyKilled { kind, .. } => Some(format!("Defeated the {}", kind.name())),
            GameEvent::ScreenCleared { screen: (col, row) } => Some(format!("Area {col},{row} cleared")),
            GameEvent::BonusDropped { .. } => Some("A heart appeared".to_string()),
            GameEvent::PlayerHurt { health, .. } if *health == 1 => Some("Low health!".to_string()),
            GameEvent::PlayerDied => Some("You died".to_string()),
            _ => None,
        }
    }
}

fn item_name(item: Item) -> &'static str {
    match item {
        Item::Key => "a key",
        Item::Sword => "a sword",
        Item::Heart => "a heart",
        Item::Bow => "a bow",
        Item::Arrow => "arrows",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notable_events_have_text() {
        assert_eq!(GameEvent::ItemCollected { item: Item::Key }.describe().as_deref(), Some("Got a key"));
        assert_eq!(
            GameEvent::EnemyKilled { id: 1, kind: EnemyKind::Bat, x: 0.0, y: 0.0 }.describe().as_deref(),
            Some("Defeated the bat"),
        );
        assert_eq!(GameEvent::ScreenCleared { screen: (2, 1) }.describe().as_deref(), Some("Area 2,1 cleared"));
        assert_eq!(GameEvent::PlayerHurt { damage: 1, health: 2 }.describe(), None);
        assert_eq!(GameEvent::AttackBlocked { x: 1.0, y: 1.0 }.describe(), None);
    }
}
