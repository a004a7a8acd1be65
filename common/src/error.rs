use thiserror::Error;

/// Configuration problems caught before a game can start.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("board dimensions must be at least 1x1, got {width}x{height}")]
    InvalidDimensions { width: i32, height: i32 },
    #[error("board dimensions above 99 cannot be encoded losslessly, got {width}x{height}")]
    BoardTooLarge { width: i32, height: i32 },
    #[error(
        "{bombs} bombs do not fit outside the first-click safe zone on a {width}x{height} board (at most {max})"
    )]
    TooManyBombs {
        bombs: u32,
        width: i32,
        height: i32,
        max: u32,
    },
}

/// Failures while decoding a board update from the wire.
///
/// A snapshot with any bad token is rejected whole; the local replica is
/// never left half-updated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("token `{0}` does not have exactly 6 characters")]
    BadLength(String),
    #[error("token `{0}` contains non-digit characters")]
    NonDigit(String),
    #[error("state ordinal {0} is outside the tile state range")]
    UnknownState(u8),
    #[error("position ({x}, {y}) is outside the board")]
    OutOfBounds { x: i32, y: i32 },
    #[error("expected {expected} tokens for a full board update, got {actual}")]
    WrongTokenCount { expected: usize, actual: usize },
    #[error("position ({x}, {y}) appears more than once in the update")]
    DuplicatePosition { x: i32, y: i32 },
}
