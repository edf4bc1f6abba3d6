//! Error types for payload decoding in soilsense-types.

use thiserror::Error;

/// Errors that can occur when decoding soil sensor payloads.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in soilsense-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The payload did not have the exact length the wire format requires.
    #[error("Invalid payload length: expected exactly {expected} bytes, got {actual}")]
    InvalidLength {
        /// Required payload size.
        expected: usize,
        /// Size actually received.
        actual: usize,
    },
}

/// Result type alias using soilsense-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_length_display() {
        let err = ParseError::InvalidLength {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload length: expected exactly 2 bytes, got 3"
        );
    }
}
