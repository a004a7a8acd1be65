use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The 8 Moore-neighborhood offsets in the fixed traversal order
/// NW, N, NE, W, E, SW, S, SE (y grows upward).
pub const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (-1, 1),
    (0, 1),
    (1, 1),
    (-1, 0),
    (1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// All 8 Moore neighbors in the fixed order, without bounds checking.
    pub fn neighbors(self) -> impl Iterator<Item = Position> {
        NEIGHBOR_OFFSETS
            .into_iter()
            .map(move |(dx, dy)| self.offset(dx, dy))
    }
}

/// Per-tile state. The ordinals are part of the wire format and double as
/// semantics: 1..=8 mean "revealed with N adjacent bombs", and the derived
/// predicates below read directly off the numeric ranges. Never renumber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TileState {
    Hidden = 0,
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
    Five = 5,
    Six = 6,
    Seven = 7,
    Eight = 8,
    Revealed = 9,
    Flag = 10,
    Bomb = 11,
    ExplodedBomb = 12,
    HiddenWithBomb = 13,
}

impl TileState {
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    pub const fn from_ordinal(value: u8) -> Option<Self> {
        Some(match value {
            0 => Self::Hidden,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            8 => Self::Eight,
            9 => Self::Revealed,
            10 => Self::Flag,
            11 => Self::Bomb,
            12 => Self::ExplodedBomb,
            13 => Self::HiddenWithBomb,
            _ => return None,
        })
    }

    /// The revealed state for a tile with `neighboring_bombs` adjacent
    /// bombs: `Revealed` for zero, the matching numbered state otherwise.
    pub const fn revealed_with(neighboring_bombs: u8) -> Self {
        match neighboring_bombs {
            0 => Self::Revealed,
            1 => Self::One,
            2 => Self::Two,
            3 => Self::Three,
            4 => Self::Four,
            5 => Self::Five,
            6 => Self::Six,
            7 => Self::Seven,
            _ => Self::Eight,
        }
    }

    pub const fn is_revealed(self) -> bool {
        let ordinal = self.ordinal();
        ordinal >= 1 && ordinal <= 9
    }

    pub const fn is_flag(self) -> bool {
        matches!(self, Self::Flag)
    }

    pub const fn carries_bomb(self) -> bool {
        matches!(self, Self::HiddenWithBomb | Self::Bomb | Self::ExplodedBomb)
    }
}

/// Immutable game configuration, passed to every component at construction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub width: i32,
    pub height: i32,
    pub bombs: u32,
    pub cheat_mode: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 24,
            height: 16,
            bombs: 20,
            cheat_mode: false,
        }
    }
}

impl GridConfig {
    pub const fn contains(&self, position: Position) -> bool {
        position.x >= 0 && position.x < self.width && position.y >= 0 && position.y < self.height
    }

    /// Row-major index of an in-bounds position.
    pub const fn index_of(&self, position: Position) -> usize {
        (position.y * self.width + position.x) as usize
    }

    pub const fn total_tiles(&self) -> u32 {
        (self.width * self.height) as u32
    }

    /// The largest safe set any first click can produce: a full 3x3 window
    /// clamped to the board dimensions.
    pub const fn max_safe_set(&self) -> u32 {
        let window_w = if self.width < 3 { self.width } else { 3 };
        let window_h = if self.height < 3 { self.height } else { 3 };
        (window_w * window_h) as u32
    }

    /// In-bounds Moore neighbors of a position, in the fixed offset order.
    pub fn neighbors_within(&self, position: Position) -> impl Iterator<Item = Position> + '_ {
        position.neighbors().filter(|&pos| self.contains(pos))
    }

    /// Checked before a session starts. An infeasible bomb count would turn
    /// the placement loop into a hang, so it is rejected up front.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 1 || self.height < 1 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.width > 99 || self.height > 99 {
            return Err(ConfigError::BoardTooLarge {
                width: self.width,
                height: self.height,
            });
        }
        let max = self.total_tiles() - self.max_safe_set();
        if self.bombs > max {
            return Err(ConfigError::TooManyBombs {
                bombs: self.bombs,
                width: self.width,
                height: self.height,
                max,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip() {
        for ordinal in 0..=13 {
            let state = TileState::from_ordinal(ordinal).unwrap();
            assert_eq!(state.ordinal(), ordinal);
        }
        assert_eq!(TileState::from_ordinal(14), None);
    }

    #[test]
    fn revealed_range_is_one_through_nine() {
        for ordinal in 0..=13 {
            let state = TileState::from_ordinal(ordinal).unwrap();
            assert_eq!(state.is_revealed(), (1..=9).contains(&ordinal));
        }
    }

    #[test]
    fn bomb_states() {
        assert!(TileState::HiddenWithBomb.carries_bomb());
        assert!(TileState::Bomb.carries_bomb());
        assert!(TileState::ExplodedBomb.carries_bomb());
        assert!(!TileState::Flag.carries_bomb());
        assert!(!TileState::Hidden.carries_bomb());
    }

    #[test]
    fn revealed_with_maps_counts_to_ordinals() {
        assert_eq!(TileState::revealed_with(0), TileState::Revealed);
        assert_eq!(TileState::revealed_with(1), TileState::One);
        assert_eq!(TileState::revealed_with(8), TileState::Eight);
    }

    #[test]
    fn neighbor_order_is_fixed() {
        let neighbors: Vec<Position> = Position::new(5, 5).neighbors().collect();
        assert_eq!(neighbors[0], Position::new(4, 6)); // NW
        assert_eq!(neighbors[1], Position::new(5, 6)); // N
        assert_eq!(neighbors[4], Position::new(6, 5)); // E
        assert_eq!(neighbors[7], Position::new(6, 4)); // SE
    }

    #[test]
    fn corner_has_three_in_bounds_neighbors() {
        let config = GridConfig::default();
        assert_eq!(config.neighbors_within(Position::new(0, 0)).count(), 3);
        assert_eq!(config.neighbors_within(Position::new(1, 1)).count(), 8);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(GridConfig::default().validate(), Ok(()));
    }

    #[test]
    fn one_bomb_on_three_by_three_is_rejected() {
        // The center click's safe set covers the whole board.
        let config = GridConfig {
            width: 3,
            height: 3,
            bombs: 1,
            ..GridConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TooManyBombs { max: 0, .. })
        ));
    }

    #[test]
    fn one_bomb_on_four_by_one_is_accepted() {
        let config = GridConfig {
            width: 4,
            height: 1,
            bombs: 1,
            ..GridConfig::default()
        };
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn oversized_board_is_rejected() {
        let config = GridConfig {
            width: 100,
            height: 16,
            ..GridConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BoardTooLarge { .. })
        ));
    }
}
