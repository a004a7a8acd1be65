//! Turn-based multi-peer minesweeper core.
//!
//! Each peer owns a [`Session`] holding a local replica of the shared
//! board. Local intents mutate the replica, then the full board is
//! serialized into fixed-width tokens and broadcast; every other peer
//! decodes and re-applies the snapshot, so replicas converge without
//! distributed locking. The only concurrency-correctness mechanism is the
//! turn gate: every peer refuses its own out-of-turn intents, so divergent
//! actions are suppressed everywhere.
//!
//! ```rust
//! use std::sync::Arc;
//! use minemesh_peer::{GridConfig, LocalBus, Position, Session};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bus = Arc::new(LocalBus::new());
//!     let mut alice = Session::connect(bus.clone(), GridConfig::default(), 0, 2)?;
//!     let mut bob = Session::connect(bus.clone(), GridConfig::default(), 1, 2)?;
//!
//!     alice.generate_grid();
//!     alice.primary_action(Position::new(12, 8));
//!     for peer in [&mut alice, &mut bob] {
//!         peer.process_pending();
//!     }
//!
//!     // The first click never hits a bomb, and the turn passed to Bob on
//!     // both replicas.
//!     assert_eq!(alice.current_player(), 1);
//!     assert_eq!(bob.current_player(), 1);
//!     assert_eq!(alice.snapshot(), bob.snapshot());
//!     Ok(())
//! }
//! ```

pub mod bus;
pub mod data;
pub mod logic;
pub mod turn;

pub use bus::LocalBus;
pub use data::{Board, Tile};
pub use logic::{GameEvent, GameOutcome, Session, SessionState};
pub use turn::TurnManager;

// Re-export the shared definitions for convenience.
pub use minemesh_common::codec;
pub use minemesh_common::error::{ConfigError, DecodeError};
pub use minemesh_common::models::{GridConfig, NEIGHBOR_OFFSETS, Position, TileState};
pub use minemesh_common::protocol::{Envelope, PeerMessage};
