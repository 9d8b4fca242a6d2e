//! Raw payload text parsing.
//!
//! Payloads arrive as text in one of two encodings, detected in this order:
//!
//! 1. **Hex**: the text (after whitespace stripping) consists solely of hex
//!    digits. Odd-length input is left-padded with a `0`.
//! 2. **Base64**: standard alphabet with optional `=` padding.
//!
//! Detection order matters: a string like `"abcd"` is valid in both encodings
//! and is always treated as hex.

use crate::error::{Error, Result};
use base64::Engine as _;
use tracing::debug;

/// Parse raw payload text into bytes.
///
/// Whitespace anywhere in the input is ignored, so pasted dumps like
/// `"08 96 01"` work directly.
pub fn parse_payload_text(input: &str) -> Result<Vec<u8>> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();

    if cleaned.is_empty() {
        return Err(Error::InvalidInputFormat);
    }

    if cleaned.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bytes = decode_hex(&cleaned)?;
        debug!("parsed payload as hex: {} bytes", bytes.len());
        return Ok(bytes);
    }

    if looks_like_base64(&cleaned) {
        if let Ok(bytes) = base64::engine::general_purpose::STANDARD.decode(&cleaned) {
            debug!("parsed payload as base64: {} bytes", bytes.len());
            return Ok(bytes);
        }
    }

    Err(Error::InvalidInputFormat)
}

/// Decode a hex string, left-padding with `0` when the digit count is odd.
fn decode_hex(hex: &str) -> Result<Vec<u8>> {
    let padded;
    let hex = if hex.len() % 2 == 0 {
        hex
    } else {
        padded = format!("0{hex}");
        &padded
    };

    hex.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = hex_digit(pair[0])?;
            let lo = hex_digit(pair[1])?;
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_digit(b: u8) -> Result<u8> {
    match b {
        b'0'..=b'9' => Ok(b - b'0'),
        b'a'..=b'f' => Ok(b - b'a' + 10),
        b'A'..=b'F' => Ok(b - b'A' + 10),
        _ => Err(Error::InvalidInputFormat),
    }
}

/// Check for the standard base64 alphabet with at most two trailing `=`.
fn looks_like_base64(s: &str) -> bool {
    let trimmed = s.trim_end_matches('=');
    if s.len() - trimmed.len() > 2 {
        return false;
    }
    !trimmed.is_empty()
        && trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/')
}
