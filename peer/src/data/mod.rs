use minemesh_common::models::{GridConfig, Position, TileState};

/// A single board cell. All mutation goes through [`Tile::set_state`] so the
/// bomb latch stays correct and every actual change is reported exactly once.
#[derive(Debug)]
pub struct Tile {
    position: Position,
    state: TileState,
    neighboring_bombs: u8,
    has_bomb: bool,
}

impl Tile {
    fn new(position: Position) -> Self {
        Self {
            position,
            state: TileState::Hidden,
            neighboring_bombs: 0,
            has_bomb: false,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn state(&self) -> TileState {
        self.state
    }

    pub fn neighboring_bombs(&self) -> u8 {
        self.neighboring_bombs
    }

    pub(crate) fn set_neighboring_bombs(&mut self, count: u8) {
        self.neighboring_bombs = count;
    }

    /// Whether this tile carries a bomb. Latched: once a tile has entered a
    /// bomb-bearing state it stays a bomb tile until the board is rebuilt.
    /// The latch is what lets un-flagging restore `HiddenWithBomb` after
    /// the flagged state crossed the wire as the bare `Flag` ordinal.
    pub fn has_bomb(&self) -> bool {
        self.has_bomb || self.state.carries_bomb()
    }

    pub fn is_flagged(&self) -> bool {
        self.state.is_flag()
    }

    pub fn is_revealed(&self) -> bool {
        self.state.is_revealed()
    }

    /// Assigns a new state. Idempotent: assigning the current state changes
    /// nothing and returns `false`.
    pub fn set_state(&mut self, state: TileState) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state;
        if state.carries_bomb() {
            self.has_bomb = true;
        }
        true
    }

    /// Reveal transition: no-op on revealed or flagged tiles, otherwise the
    /// state encoding this tile's neighbor count.
    pub fn reveal(&mut self) -> bool {
        if self.is_revealed() || self.is_flagged() {
            return false;
        }
        self.set_state(TileState::revealed_with(self.neighboring_bombs))
    }

    /// Flag toggle; only hidden tiles react. Un-flagging restores
    /// `HiddenWithBomb` or `Hidden` depending on the bomb latch.
    pub fn toggle_flag(&mut self) -> bool {
        match self.state {
            TileState::Hidden | TileState::HiddenWithBomb => self.set_state(TileState::Flag),
            TileState::Flag => {
                let restored = if self.has_bomb() {
                    TileState::HiddenWithBomb
                } else {
                    TileState::Hidden
                };
                self.set_state(restored)
            }
            _ => false,
        }
    }
}

/// The board replica: a width x height matrix of tiles in row-major order,
/// created once per game and dropped on clear.
#[derive(Debug)]
pub struct Board {
    config: GridConfig,
    tiles: Vec<Tile>,
}

impl Board {
    pub fn new(config: GridConfig) -> Self {
        let mut tiles = Vec::with_capacity(config.total_tiles() as usize);
        for y in 0..config.height {
            for x in 0..config.width {
                tiles.push(Tile::new(Position::new(x, y)));
            }
        }
        Self { config, tiles }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// The tile at `position`, or `None` when out of bounds.
    pub fn get(&self, position: Position) -> Option<&Tile> {
        if !self.config.contains(position) {
            return None;
        }
        self.tiles.get(self.config.index_of(position))
    }

    pub fn get_mut(&mut self, position: Position) -> Option<&mut Tile> {
        if !self.config.contains(position) {
            return None;
        }
        let index = self.config.index_of(position);
        self.tiles.get_mut(index)
    }

    /// All tiles in the deterministic row-major traversal order.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter()
    }

    /// Recomputed by scanning: a cached counter would drift when a decoded
    /// snapshot overwrites tile states wholesale.
    pub fn revealed_count(&self) -> u32 {
        self.tiles.iter().filter(|tile| tile.is_revealed()).count() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> Tile {
        Tile::new(Position::new(0, 0))
    }

    #[test]
    fn set_state_is_idempotent() {
        let mut tile = tile();
        assert!(tile.set_state(TileState::Flag));
        assert!(!tile.set_state(TileState::Flag));
    }

    #[test]
    fn reveal_maps_neighbor_count_to_state() {
        let mut tile = tile();
        tile.set_neighboring_bombs(3);
        assert!(tile.reveal());
        assert_eq!(tile.state(), TileState::Three);

        let mut empty = Tile::new(Position::new(1, 0));
        assert!(empty.reveal());
        assert_eq!(empty.state(), TileState::Revealed);
    }

    #[test]
    fn reveal_is_a_no_op_on_revealed_or_flagged_tiles() {
        let mut tile = tile();
        tile.reveal();
        assert!(!tile.reveal());

        let mut flagged = Tile::new(Position::new(1, 0));
        flagged.toggle_flag();
        assert!(!flagged.reveal());
        assert_eq!(flagged.state(), TileState::Flag);
    }

    #[test]
    fn flag_toggle_restores_hidden() {
        let mut tile = tile();
        assert!(tile.toggle_flag());
        assert_eq!(tile.state(), TileState::Flag);
        assert!(tile.toggle_flag());
        assert_eq!(tile.state(), TileState::Hidden);
    }

    #[test]
    fn flag_toggle_restores_hidden_with_bomb() {
        let mut tile = tile();
        tile.set_state(TileState::HiddenWithBomb);
        assert!(tile.toggle_flag());
        assert_eq!(tile.state(), TileState::Flag);
        assert!(tile.toggle_flag());
        assert_eq!(tile.state(), TileState::HiddenWithBomb);
    }

    #[test]
    fn bomb_latch_survives_the_wire_state() {
        // A flagged bomb tile arrives from a snapshot as the bare Flag
        // ordinal; the latch set by the earlier setup snapshot keeps the
        // bomb-ness.
        let mut tile = tile();
        tile.set_state(TileState::HiddenWithBomb);
        tile.set_state(TileState::Flag);
        assert!(tile.has_bomb());
        assert!(tile.toggle_flag());
        assert_eq!(tile.state(), TileState::HiddenWithBomb);
    }

    #[test]
    fn flag_toggle_ignores_revealed_tiles() {
        let mut tile = tile();
        tile.reveal();
        assert!(!tile.toggle_flag());
    }

    #[test]
    fn board_lookup_handles_out_of_bounds() {
        let board = Board::new(GridConfig::default());
        assert!(board.get(Position::new(0, 0)).is_some());
        assert!(board.get(Position::new(-1, 0)).is_none());
        assert!(board.get(Position::new(24, 0)).is_none());
        assert!(board.get(Position::new(0, 16)).is_none());
    }

    #[test]
    fn board_traversal_covers_every_tile_once() {
        let board = Board::new(GridConfig::default());
        assert_eq!(board.tiles().count(), 24 * 16);
        assert_eq!(board.revealed_count(), 0);
    }
}
