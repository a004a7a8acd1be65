use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use minemesh_common::codec;
use minemesh_common::error::{ConfigError, DecodeError};
use minemesh_common::models::{GridConfig, Position, TileState};
use minemesh_common::protocol::{Envelope, PeerMessage};

use crate::bus::LocalBus;
use crate::data::Board;
use crate::turn::TurnManager;

/// Events emitted towards the presentation layer.
#[derive(Debug, Clone)]
pub enum GameEvent {
    /// A board exists and a round is starting.
    GameInitialized { width: i32, height: i32, bombs: u32 },
    /// Tile states changed; one entry per actually changed tile.
    BoardUpdated { changed_positions: Vec<Position> },
    /// The turn-holder changed.
    TurnChanged { player: usize },
    /// The game ended.
    GameStatusChanged { won: bool, lost: bool },
    /// The board was destroyed.
    BoardCleared,
}

/// Session lifecycle: `Lobby -> InProgress -> Over -> (restart) -> InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Lobby,
    InProgress,
    Over,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameOutcome {
    Won,
    Lost,
}

/// The clicked position plus its in-bounds Moore neighbors; bombs are never
/// placed here, so the first click always opens.
fn safe_positions(config: &GridConfig, first_click: Position) -> HashSet<Position> {
    let mut safe = HashSet::with_capacity(9);
    safe.insert(first_click);
    safe.extend(config.neighbors_within(first_click));
    safe
}

/// Rejection-samples uniformly random in-bounds positions until exactly
/// `config.bombs` distinct non-safe positions are chosen. Termination is a
/// configuration precondition enforced by [`GridConfig::validate`].
fn generate_bomb_positions(
    config: &GridConfig,
    first_click: Position,
    rng: &mut impl Rng,
) -> Vec<Position> {
    let safe = safe_positions(config, first_click);
    let mut chosen = HashSet::with_capacity(config.bombs as usize);
    let mut positions = Vec::with_capacity(config.bombs as usize);

    while positions.len() < config.bombs as usize {
        let position = Position::new(
            rng.random_range(0..config.width),
            rng.random_range(0..config.height),
        );
        if safe.contains(&position) || !chosen.insert(position) {
            continue;
        }
        positions.push(position);
    }

    positions
}

impl Board {
    fn place_bombs(&mut self, positions: &[Position], cheat_mode: bool, changed: &mut Vec<Position>) {
        // Under cheat mode bombs render immediately instead of hiding.
        let state = if cheat_mode {
            TileState::Bomb
        } else {
            TileState::HiddenWithBomb
        };
        for &position in positions {
            if let Some(tile) = self.get_mut(position)
                && tile.set_state(state)
            {
                changed.push(position);
            }
        }
    }

    /// One-time pass after bomb placement; must run before any reveal.
    fn compute_neighbor_counts(&mut self) {
        let config = *self.config();
        for y in 0..config.height {
            for x in 0..config.width {
                let position = Position::new(x, y);
                let count = config
                    .neighbors_within(position)
                    .filter(|&pos| self.get(pos).is_some_and(|tile| tile.has_bomb()))
                    .count() as u8;
                if let Some(tile) = self.get_mut(position) {
                    tile.set_neighboring_bombs(count);
                }
            }
        }
    }

    /// Iterative flood fill with an explicit frontier. The already-revealed
    /// guard in [`crate::data::Tile::reveal`] bounds the walk; recursion
    /// would risk stack exhaustion on large boards.
    fn reveal_flood(&mut self, seed: Position, changed: &mut Vec<Position>) {
        let mut frontier = vec![seed];
        while let Some(position) = frontier.pop() {
            let Some(tile) = self.get_mut(position) else {
                continue;
            };
            if !tile.reveal() {
                continue;
            }
            let opened_empty = tile.state() == TileState::Revealed;
            changed.push(position);
            if opened_empty {
                frontier.extend(self.config().neighbors_within(position));
            }
        }
    }

    /// Loss side effect: the clicked tile explodes, every other bomb is
    /// shown.
    fn reveal_all_bombs(&mut self, clicked: Position, changed: &mut Vec<Position>) {
        let bombs: Vec<Position> = self
            .tiles()
            .filter(|tile| tile.has_bomb())
            .map(|tile| tile.position())
            .collect();
        for position in bombs {
            let state = if position == clicked {
                TileState::ExplodedBomb
            } else {
                TileState::Bomb
            };
            if let Some(tile) = self.get_mut(position)
                && tile.set_state(state)
            {
                changed.push(position);
            }
        }
    }

    fn has_won(&self) -> bool {
        self.revealed_count() == self.config().total_tiles() - self.config().bombs
    }

    /// Full snapshot, one token per tile in the deterministic row-major
    /// traversal. Decoders re-derive positions from the tokens themselves.
    fn snapshot_tokens(&self) -> Vec<String> {
        self.tiles()
            .map(|tile| codec::encode_tile(tile.position(), tile.state()))
            .collect()
    }

    /// Applies a decoded snapshot. Returns whether any tile transitioned
    /// into a revealed state, which is the receiver-side turn-advance
    /// signal.
    fn apply_snapshot(
        &mut self,
        decoded: &[(Position, TileState)],
        changed: &mut Vec<Position>,
    ) -> bool {
        let mut revealed_delta = false;
        for &(position, state) in decoded {
            if let Some(tile) = self.get_mut(position) {
                let was_revealed = tile.is_revealed();
                if tile.set_state(state) {
                    changed.push(position);
                    if !was_revealed && tile.is_revealed() {
                        revealed_delta = true;
                    }
                }
            }
        }
        revealed_delta
    }
}

/// One peer's session/sync controller.
///
/// Owns this peer's board replica exclusively: all mutation happens inside
/// the handler for a local intent or an applied remote update, on one
/// logical thread. Convergence comes from broadcasting full snapshots and
/// from every peer gating its own local intents on the shared turn order.
pub struct Session {
    config: GridConfig,
    player_index: usize,
    board: Option<Board>,
    turns: TurnManager,
    state: SessionState,
    bombs_placed: bool,
    outcome: Option<GameOutcome>,
    bus: Arc<LocalBus>,
    bus_id: Uuid,
    inbox: mpsc::UnboundedReceiver<String>,
    events: Option<mpsc::UnboundedSender<GameEvent>>,
    rng: StdRng,
}

impl Session {
    /// Attaches a new peer session to the bus. An infeasible configuration
    /// is rejected here, before any game can start.
    pub fn connect(
        bus: Arc<LocalBus>,
        config: GridConfig,
        player_index: usize,
        player_count: usize,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (bus_id, inbox) = bus.attach();
        info!(
            "Player {} joined: {}x{} with {} bombs, {} players",
            player_index, config.width, config.height, config.bombs, player_count
        );
        Ok(Self {
            config,
            player_index,
            board: None,
            turns: TurnManager::new(player_count),
            state: SessionState::Lobby,
            bombs_placed: false,
            outcome: None,
            bus,
            bus_id,
            inbox,
            events: None,
            rng: StdRng::from_os_rng(),
        })
    }

    /// [`Session::connect`] with a seeded generator, for reproducible bomb
    /// placement.
    pub fn connect_seeded(
        bus: Arc<LocalBus>,
        config: GridConfig,
        player_index: usize,
        player_count: usize,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let mut session = Self::connect(bus, config, player_index, player_count)?;
        session.rng = StdRng::seed_from_u64(seed);
        Ok(session)
    }

    /// Subscribe to game events. Returns a receiver for game events.
    pub fn subscribe_events(&mut self) -> mpsc::UnboundedReceiver<GameEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.events = Some(sender);
        receiver
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn player_index(&self) -> usize {
        self.player_index
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    pub fn current_player(&self) -> usize {
        self.turns.current()
    }

    pub fn bombs_placed(&self) -> bool {
        self.bombs_placed
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    /// The replica as wire tokens, for convergence checks and debugging.
    pub fn snapshot(&self) -> Option<Vec<String>> {
        self.board.as_ref().map(Board::snapshot_tokens)
    }

    fn emit(&self, event: GameEvent) {
        if let Some(sender) = &self.events {
            let _ = sender.send(event);
        }
    }

    fn emit_board_updated(&self, changed_positions: Vec<Position>) {
        if !changed_positions.is_empty() {
            self.emit(GameEvent::BoardUpdated { changed_positions });
        }
    }

    fn broadcast(&self, message: PeerMessage) {
        self.bus.broadcast(&Envelope {
            sender: self.player_index,
            message,
        });
    }

    fn broadcast_snapshot(&self, is_initial_setup: bool) {
        if let Some(board) = &self.board {
            self.broadcast(PeerMessage::UpdateBoard {
                tokens: board.snapshot_tokens(),
                is_initial_setup,
            });
        }
    }

    /// Builds the board if absent, seats this peer as the turn-holder and
    /// announces the new round to every peer.
    #[instrument(level = "trace", skip(self))]
    pub fn generate_grid(&mut self) {
        if self.board.is_none() {
            self.board = Some(Board::new(self.config));
        }
        self.state = SessionState::InProgress;
        self.bombs_placed = false;
        self.outcome = None;
        self.turns.set_current(self.player_index);
        info!(
            "Generated {}x{} grid, player {} starts",
            self.config.width, self.config.height, self.player_index
        );
        self.emit(GameEvent::GameInitialized {
            width: self.config.width,
            height: self.config.height,
            bombs: self.config.bombs,
        });
        self.emit(GameEvent::TurnChanged {
            player: self.turns.current(),
        });
        self.broadcast(PeerMessage::StartTheGame);
        self.broadcast_snapshot(false);
    }

    /// Local reveal intent. Ignored out of turn, after the game ended, or
    /// on an absent/revealed/flagged target; those are policy no-ops, not
    /// errors, since every peer enforces the same gates on its own replica.
    #[instrument(level = "trace", skip(self), fields(x = position.x, y = position.y))]
    pub fn primary_action(&mut self, position: Position) {
        if self.state != SessionState::InProgress {
            debug!("Ignoring reveal action while {:?}", self.state);
            return;
        }
        if !self.turns.is_turn(self.player_index) {
            debug!(
                "Ignoring reveal from player {} out of turn",
                self.player_index
            );
            return;
        }
        let Some(board) = self.board.as_mut() else {
            debug!("Ignoring reveal without a board");
            return;
        };
        match board.get(position) {
            None => {
                debug!("Invalid reveal position: ({}, {})", position.x, position.y);
                return;
            }
            Some(tile) if tile.is_revealed() || tile.is_flagged() => {
                debug!(
                    "Ignoring reveal on revealed or flagged tile ({}, {})",
                    position.x, position.y
                );
                return;
            }
            Some(_) => {}
        }

        let first_action = !self.bombs_placed;
        let mut changed = Vec::new();

        if first_action {
            let bombs = generate_bomb_positions(&self.config, position, &mut self.rng);
            board.place_bombs(&bombs, self.config.cheat_mode, &mut changed);
            board.compute_neighbor_counts();
            self.bombs_placed = true;
            info!(
                "Placed {} bombs after first click at ({}, {})",
                bombs.len(),
                position.x,
                position.y
            );
        }

        if board.get(position).is_some_and(|tile| tile.has_bomb()) {
            warn!(
                "Player {} hit a bomb at ({}, {}) - game over!",
                self.player_index, position.x, position.y
            );
            board.reveal_all_bombs(position, &mut changed);
            self.state = SessionState::Over;
            self.outcome = Some(GameOutcome::Lost);
            self.emit_board_updated(changed);
            self.emit(GameEvent::GameStatusChanged {
                won: false,
                lost: true,
            });
            self.broadcast(PeerMessage::GameOver { lost: true });
            self.broadcast_snapshot(false);
            return;
        }

        board.reveal_flood(position, &mut changed);
        let won = board.has_won();
        debug!("Revealed {} tiles from ({}, {})", changed.len(), position.x, position.y);

        self.emit_board_updated(changed);
        if won {
            self.state = SessionState::Over;
            self.outcome = Some(GameOutcome::Won);
            info!("Game won! All safe cells revealed.");
            self.emit(GameEvent::GameStatusChanged {
                won: true,
                lost: false,
            });
        } else {
            self.turns.advance();
            self.emit(GameEvent::TurnChanged {
                player: self.turns.current(),
            });
        }
        self.broadcast_snapshot(first_action);
        if won {
            self.broadcast(PeerMessage::GameOver { lost: false });
        }
    }

    /// Local flag intent. Flagging does not consume the turn.
    #[instrument(level = "trace", skip(self), fields(x = position.x, y = position.y))]
    pub fn secondary_action(&mut self, position: Position) {
        if self.state != SessionState::InProgress {
            debug!("Ignoring flag action while {:?}", self.state);
            return;
        }
        if !self.turns.is_turn(self.player_index) {
            debug!("Ignoring flag from player {} out of turn", self.player_index);
            return;
        }
        let Some(board) = self.board.as_mut() else {
            debug!("Ignoring flag without a board");
            return;
        };
        let Some(tile) = board.get_mut(position) else {
            debug!("Invalid flag position: ({}, {})", position.x, position.y);
            return;
        };
        if !tile.toggle_flag() {
            debug!(
                "Ignoring flag action on revealed tile ({}, {})",
                position.x, position.y
            );
            return;
        }
        debug!(
            "Tile ({}, {}) toggled to {:?}",
            position.x,
            position.y,
            tile.state()
        );
        self.emit_board_updated(vec![position]);
        self.broadcast_snapshot(false);
    }

    /// Local restart intent; only honored once the game is over.
    #[instrument(level = "trace", skip(self))]
    pub fn request_restart(&mut self) {
        if self.state != SessionState::Over {
            debug!("Ignoring restart while {:?}", self.state);
            return;
        }
        info!("Player {} restarting the game", self.player_index);
        self.clear_grid();
        self.broadcast(PeerMessage::ClearGrid);
        self.generate_grid();
    }

    fn clear_grid(&mut self) {
        self.board = None;
        self.state = SessionState::Lobby;
        self.bombs_placed = false;
        self.outcome = None;
        self.emit(GameEvent::BoardCleared);
    }

    /// Applies one raw frame from the bus. Malformed JSON is dropped with a
    /// warning, matching the transport contract; a snapshot that fails to
    /// decode is surfaced and discarded whole.
    pub fn handle_frame(&mut self, frame: &str) -> Result<(), DecodeError> {
        match serde_json::from_str::<Envelope>(frame) {
            Ok(envelope) => self.handle_message(envelope),
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                Ok(())
            }
        }
    }

    /// Executes a broadcast operation against the local replica. The bus
    /// delivers every broadcast back to the sender too, but the sender's
    /// local intent path already applied the operation, so its own frames
    /// are skipped here: a queued self-snapshot is by definition stale and
    /// must not overwrite newer local state.
    pub fn handle_message(&mut self, envelope: Envelope) -> Result<(), DecodeError> {
        if envelope.sender == self.player_index {
            return Ok(());
        }
        match envelope.message {
            PeerMessage::StartTheGame => {
                self.on_start_the_game(envelope.sender);
                Ok(())
            }
            PeerMessage::UpdateBoard {
                tokens,
                is_initial_setup,
            } => self.on_update_board(&tokens, is_initial_setup),
            PeerMessage::GameOver { lost } => {
                self.on_game_over(lost);
                Ok(())
            }
            PeerMessage::ClearGrid => {
                self.on_clear_grid();
                Ok(())
            }
        }
    }

    fn on_start_the_game(&mut self, sender: usize) {
        if self.board.is_none() {
            self.board = Some(Board::new(self.config));
        }
        self.state = SessionState::InProgress;
        self.bombs_placed = false;
        self.outcome = None;
        self.turns.set_current(sender);
        debug!("Round started by player {}", sender);
        self.emit(GameEvent::GameInitialized {
            width: self.config.width,
            height: self.config.height,
            bombs: self.config.bombs,
        });
        self.emit(GameEvent::TurnChanged { player: sender });
    }

    fn on_update_board(&mut self, tokens: &[String], is_initial_setup: bool) -> Result<(), DecodeError> {
        // Validate the whole update before touching the replica.
        let decoded = codec::decode_snapshot(tokens, &self.config)?;

        let board = self.board.get_or_insert_with(|| Board::new(self.config));
        let mut changed = Vec::new();
        let revealed_delta = board.apply_snapshot(&decoded, &mut changed);
        if is_initial_setup {
            // Mirror the initiating peer's one-time setup.
            board.compute_neighbor_counts();
            self.bombs_placed = true;
        }
        let won = board.has_won();

        if self.state == SessionState::Lobby {
            self.state = SessionState::InProgress;
        }
        debug!("Applied board update: {} tiles changed", changed.len());
        self.emit_board_updated(changed);

        if won && self.state != SessionState::Over {
            self.state = SessionState::Over;
            self.outcome = Some(GameOutcome::Won);
            info!("Game won! All safe cells revealed.");
            self.emit(GameEvent::GameStatusChanged {
                won: true,
                lost: false,
            });
        } else if revealed_delta && self.state == SessionState::InProgress {
            self.turns.advance();
            self.emit(GameEvent::TurnChanged {
                player: self.turns.current(),
            });
        }
        Ok(())
    }

    fn on_game_over(&mut self, lost: bool) {
        if self.state == SessionState::Over {
            return;
        }
        self.state = SessionState::Over;
        self.outcome = Some(if lost { GameOutcome::Lost } else { GameOutcome::Won });
        if lost {
            info!("Game ended with a loss");
        } else {
            info!("Game won! All safe cells revealed.");
        }
        self.emit(GameEvent::GameStatusChanged { won: !lost, lost });
    }

    fn on_clear_grid(&mut self) {
        debug!("Clearing board on remote request");
        self.clear_grid();
    }

    /// Drains and applies every frame already delivered to this peer.
    /// Returns the number of frames taken off the inbox. Updates that fail
    /// to decode are discarded whole and logged.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(frame) = self.inbox.try_recv() {
            if let Err(e) = self.handle_frame(&frame) {
                warn!("Discarded board update: {}", e);
            }
            processed += 1;
        }
        processed
    }

    /// Applies frames as they arrive. Intended to be driven by the
    /// application shell; returns when this peer is detached from the bus.
    pub async fn run(&mut self) {
        while let Some(frame) = self.inbox.recv().await {
            if let Err(e) = self.handle_frame(&frame) {
                warn!("Discarded board update: {}", e);
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.bus.detach(&self.bus_id);
    }
}
