//! Fixed-width board token codec.
//!
//! Every tile serializes to six ASCII digits `XXYYSS`: zero-padded x, y and
//! state ordinal. A full update is one token per tile in a deterministic
//! traversal; the decoder re-derives the position from the token itself and
//! never depends on token order. Two digits per axis caps lossless boards at
//! 99x99, enforced by [`GridConfig::validate`].

use crate::error::DecodeError;
use crate::models::{GridConfig, Position, TileState};

pub const TOKEN_LEN: usize = 6;

pub fn encode_tile(position: Position, state: TileState) -> String {
    format!("{:02}{:02}{:02}", position.x, position.y, state.ordinal())
}

pub fn decode_token(token: &str) -> Result<(Position, TileState), DecodeError> {
    if token.len() != TOKEN_LEN {
        return Err(DecodeError::BadLength(token.to_string()));
    }
    if !token.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(DecodeError::NonDigit(token.to_string()));
    }

    let digits = |range: std::ops::Range<usize>| -> u8 {
        token[range]
            .bytes()
            .fold(0, |acc, byte| acc * 10 + (byte - b'0'))
    };

    let x = digits(0..2) as i32;
    let y = digits(2..4) as i32;
    let ordinal = digits(4..6);
    let state = TileState::from_ordinal(ordinal).ok_or(DecodeError::UnknownState(ordinal))?;

    Ok((Position::new(x, y), state))
}

/// Decodes a full board update. Validates every token, bounds and coverage
/// before returning; any failure rejects the whole update so a replica is
/// never half-applied.
pub fn decode_snapshot(
    tokens: &[String],
    config: &GridConfig,
) -> Result<Vec<(Position, TileState)>, DecodeError> {
    let expected = config.total_tiles() as usize;
    if tokens.len() != expected {
        return Err(DecodeError::WrongTokenCount {
            expected,
            actual: tokens.len(),
        });
    }

    let mut seen = vec![false; expected];
    let mut decoded = Vec::with_capacity(expected);
    for token in tokens {
        let (position, state) = decode_token(token)?;
        if !config.contains(position) {
            return Err(DecodeError::OutOfBounds {
                x: position.x,
                y: position.y,
            });
        }
        let index = config.index_of(position);
        if seen[index] {
            return Err(DecodeError::DuplicatePosition {
                x: position.x,
                y: position.y,
            });
        }
        seen[index] = true;
        decoded.push((position, state));
    }

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_zero_padded() {
        assert_eq!(
            encode_tile(Position::new(3, 12), TileState::HiddenWithBomb),
            "031213"
        );
        assert_eq!(encode_tile(Position::new(23, 0), TileState::Hidden), "230000");
    }

    #[test]
    fn tokens_round_trip() {
        for ordinal in 0..=13 {
            let state = TileState::from_ordinal(ordinal).unwrap();
            let position = Position::new(7, 9);
            assert_eq!(
                decode_token(&encode_tile(position, state)),
                Ok((position, state))
            );
        }
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(
            decode_token("00000"),
            Err(DecodeError::BadLength("00000".to_string()))
        );
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(
            decode_token("00a000"),
            Err(DecodeError::NonDigit("00a000".to_string()))
        );
    }

    #[test]
    fn rejects_unknown_state_ordinal() {
        assert_eq!(decode_token("000014"), Err(DecodeError::UnknownState(14)));
    }

    fn tiny_config() -> GridConfig {
        GridConfig {
            width: 2,
            height: 1,
            bombs: 0,
            cheat_mode: false,
        }
    }

    #[test]
    fn snapshot_decode_is_order_independent() {
        let config = tiny_config();
        let tokens = vec!["010009".to_string(), "000010".to_string()];
        let decoded = decode_snapshot(&tokens, &config).unwrap();
        assert_eq!(decoded[0], (Position::new(1, 0), TileState::Revealed));
        assert_eq!(decoded[1], (Position::new(0, 0), TileState::Flag));
    }

    #[test]
    fn snapshot_rejects_wrong_token_count() {
        let config = tiny_config();
        let tokens = vec!["000000".to_string()];
        assert_eq!(
            decode_snapshot(&tokens, &config),
            Err(DecodeError::WrongTokenCount {
                expected: 2,
                actual: 1
            })
        );
    }

    #[test]
    fn snapshot_rejects_out_of_bounds_position() {
        let config = tiny_config();
        let tokens = vec!["000000".to_string(), "050000".to_string()];
        assert_eq!(
            decode_snapshot(&tokens, &config),
            Err(DecodeError::OutOfBounds { x: 5, y: 0 })
        );
    }

    #[test]
    fn snapshot_rejects_duplicate_positions() {
        let config = tiny_config();
        let tokens = vec!["000000".to_string(), "000009".to_string()];
        assert_eq!(
            decode_snapshot(&tokens, &config),
            Err(DecodeError::DuplicatePosition { x: 0, y: 0 })
        );
    }

    #[test]
    fn one_malformed_token_rejects_the_whole_snapshot() {
        let config = tiny_config();
        let tokens = vec!["000000".to_string(), "01zz00".to_string()];
        assert!(decode_snapshot(&tokens, &config).is_err());
    }
}
