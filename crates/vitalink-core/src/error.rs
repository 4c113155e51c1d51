//! Error types for vitalink-core.
//!
//! Every fatal condition a session can hit maps to one variant here. A
//! malformed measurement notification is not an error: the record is dropped,
//! counted in [`crate::SessionMetrics`], and collection continues.
//!
//! | Category | Variants | Retry? |
//! |----------|----------|--------|
//! | Transport | [`Error::Bluetooth`], [`Error::Transport`], [`Error::ConnectionLost`] | Yes, by the caller |
//! | Protocol | [`Error::Racp`], [`Error::Frame`], [`Error::UnexpectedResponse`] | No |
//! | Missing capability | [`Error::MissingCharacteristics`], [`Error::UnsupportedDevice`] | No |
//! | Deadline | [`Error::Timeout`] | Yes, by the caller |
//! | Caller | [`Error::Cancelled`], [`Error::InvalidConfig`] | No |
//!
//! The engine never retries on its own. Use [`crate::with_retry`] around a
//! reader call if the application wants that.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;
use vitalink_types::{DeviceKind, ParseError, RacpResponse};

/// Errors that can occur while pairing with or reading from a device.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Error reported by the btleplug stack.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Error reported by any other transport implementation.
    #[error("Bluetooth error during {operation}: {message}")]
    Transport {
        /// The transport operation that failed.
        operation: &'static str,
        message: String,
    },

    /// The Record Access Control Point reported anything but success.
    #[error("Bluetooth RACP error: {0}")]
    Racp(RacpResponse),

    /// Discovery did not find every characteristic the reader needs.
    #[error("Missing required characteristics on service {service}: {missing:?}")]
    MissingCharacteristics {
        service: Uuid,
        missing: Vec<Uuid>,
    },

    /// The overall deadline or a step deadline elapsed.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// The session's cancellation token fired.
    #[error("Operation cancelled")]
    Cancelled,

    /// A framed response failed validation.
    #[error("Invalid frame: {0}")]
    Frame(#[from] ParseError),

    /// A framed response carried the wrong response code or shape.
    #[error("Unexpected response: expected {expected}, got {actual}")]
    UnexpectedResponse { expected: String, actual: String },

    /// The connection closed while the session was still running.
    #[error("Connection lost")]
    ConnectionLost,

    /// No Bluetooth adapter is available or it is not powered on.
    #[error("Bluetooth adapter unavailable")]
    AdapterUnavailable,

    /// The transport does not know the requested device.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// No reader is registered for this device kind.
    #[error("No reader registered for device kind '{0}'")]
    UnsupportedDevice(DeviceKind),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a transport error for a non-btleplug transport.
    pub fn transport(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            operation,
            message: message.into(),
        }
    }

    /// Create a missing characteristics error.
    pub fn missing_characteristics(service: Uuid, missing: Vec<Uuid>) -> Self {
        Self::MissingCharacteristics { service, missing }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create an unexpected response error.
    pub fn unexpected(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Numeric RACP response code carried by a protocol error.
    ///
    /// `None` for every other error, and for a RACP payload that was not a
    /// response at all.
    #[must_use]
    pub fn racp_code(&self) -> Option<u8> {
        match self {
            Error::Racp(response) => response.code(),
            _ => None,
        }
    }

    /// Whether retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Bluetooth(_)
            | Error::Transport { .. }
            | Error::Timeout { .. }
            | Error::ConnectionLost => true,
            // A device that aborts a transfer may complete it on the next try.
            Error::Racp(response) => matches!(response, RacpResponse::NotCompleted),
            Error::MissingCharacteristics { .. }
            | Error::Cancelled
            | Error::Frame(_)
            | Error::UnexpectedResponse { .. }
            | Error::AdapterUnavailable
            | Error::DeviceNotFound(_)
            | Error::UnsupportedDevice(_)
            | Error::InvalidConfig(_) => false,
        }
    }
}

/// Result type alias using vitalink-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
