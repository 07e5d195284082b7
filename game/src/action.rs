use crate::tiles::Direction;

/// One discrete player input. `Reset` is a history tombstone: evaluation
/// trims everything before the last one, and it never appears in encoded
/// runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameAction {
    Up,
    Down,
    Left,
    Right,
    BombDrop,
    BombTrigger,
    MegadrillDrop,
    Reset,
}

impl GameAction {
    /// The one-character encoding used for cache keys and stored solutions.
    pub fn encode(self) -> char {
        match self {
            GameAction::Up => 'U',
            GameAction::Down => 'D',
            GameAction::Left => 'L',
            GameAction::Right => 'R',
            GameAction::BombDrop => 'B',
            GameAction::BombTrigger => 'T',
            GameAction::MegadrillDrop => 'M',
            GameAction::Reset => panic!("reset is a trim marker, never encoded"),
        }
    }

    /// Unknown characters mean a corrupted solution string; that is fatal.
    pub fn decode(c: char) -> GameAction {
        match c {
            'U' => GameAction::Up,
            'D' => GameAction::Down,
            'L' => GameAction::Left,
            'R' => GameAction::Right,
            'B' => GameAction::BombDrop,
            'T' => GameAction::BombTrigger,
            'M' => GameAction::MegadrillDrop,
            other => panic!("unknown action character {other:?}"),
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            GameAction::Up => Direction::Up,
            GameAction::Down => Direction::Down,
            GameAction::Left => Direction::Left,
            GameAction::Right => Direction::Right,
            _ => Direction::None,
        }
    }

    pub fn is_directional(self) -> bool {
        matches!(
            self,
            GameAction::Up | GameAction::Down | GameAction::Left | GameAction::Right
        )
    }
}

pub fn actions_to_string(actions: &[GameAction]) -> String {
    actions.iter().map(|a| a.encode()).collect()
}

pub fn actions_from_string(s: &str) -> Vec<GameAction> {
    s.chars().map(GameAction::decode).collect()
}
