//! Error types for data parsing in vitalink-types.

use thiserror::Error;

/// Errors that can occur when decoding data received from a device.
///
/// This error type is platform-agnostic and does not include
/// BLE-specific errors (those belong in vitalink-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// The buffer is shorter than the structure being decoded.
    #[error("Insufficient bytes: requires {expected} bytes, got {actual}")]
    InsufficientBytes {
        /// Minimum number of bytes required.
        expected: usize,
        /// Number of bytes actually available.
        actual: usize,
    },

    /// A frame's trailing checksum does not match its contents.
    #[error("Checksum mismatch: frame carries 0x{received:04X}, computed 0x{computed:04X}")]
    ChecksumMismatch {
        /// Checksum carried by the frame.
        received: u16,
        /// Checksum computed over the frame contents.
        computed: u16,
    },

    /// A frame's structural bytes (start, length, end markers) are wrong.
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    /// A field holds a value outside its defined range.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

impl ParseError {
    /// Create an insufficient bytes error.
    pub fn insufficient(expected: usize, actual: usize) -> Self {
        Self::InsufficientBytes { expected, actual }
    }

    /// Create a malformed frame error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame(message.into())
    }
}

/// Result type alias using vitalink-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::insufficient(13, 7);
        assert_eq!(err.to_string(), "Insufficient bytes: requires 13 bytes, got 7");

        let err = ParseError::ChecksumMismatch {
            received: 0x1234,
            computed: 0xABCD,
        };
        assert!(err.to_string().contains("0x1234"));
        assert!(err.to_string().contains("0xABCD"));

        let err = ParseError::malformed("missing ETX");
        assert_eq!(err.to_string(), "Malformed frame: missing ETX");
    }
}
