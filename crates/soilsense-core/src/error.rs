//! Error types for soilsense-core.
//!
//! This module defines every failure an acquisition or a configuration load
//! can produce.
//!
//! # Error Recovery Strategies
//!
//! No operation in this crate retries internally. Retrying is the caller's
//! decision, and [`Error::is_retryable`] encodes the recommended policy:
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::PlatformUnsupported`] | Do not retry | Host has no usable Bluetooth stack |
//! | [`Error::DeviceNotSelected`] | Retry on user request | Picker was dismissed or nothing matched |
//! | [`Error::Transport`] | Retry the whole acquisition | Scan/connect/discover/subscribe/read rejected |
//! | [`Error::AcquisitionTimeout`] | Retry the whole acquisition | Neither push nor pull delivered |
//! | [`Error::InvalidPayload`] | Do not retry | Firmware sent a malformed frame |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//! | [`Error::InvalidRule`] | Do not retry | Fix the rule table and restart |
//!
//! An unmatched rule lookup is never an error: the rule book always falls
//! back to its default recommendation.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while acquiring or classifying soil snapshots.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The host cannot pair with BLE peripherals at all.
    #[error("Bluetooth LE is not available on this host")]
    PlatformUnsupported,

    /// The device picker was dismissed or offered nothing to pick.
    #[error("No device selected matching '{filter}'")]
    DeviceNotSelected {
        /// The device-name filter the picker was constrained to.
        filter: String,
    },

    /// A transport step was rejected by the link.
    #[error("Transport error during {stage}: {source}")]
    Transport {
        /// The step that failed.
        stage: TransportStage,
        /// The underlying link error.
        #[source]
        source: Box<Error>,
    },

    /// No notification arrived in time and no fallback read succeeded.
    #[error("No snapshot received within {duration:?}")]
    AcquisitionTimeout {
        /// The notification budget that elapsed.
        duration: Duration,
        /// Error of the fallback read, if one was attempted.
        #[source]
        cause: Option<Box<Error>>,
    },

    /// The peripheral delivered a payload that violates the wire format.
    #[error("Invalid payload: expected {expected} bytes, got {actual}")]
    InvalidPayload {
        /// Required payload size.
        expected: usize,
        /// Size actually received.
        actual: usize,
    },

    /// Raw Bluetooth Low Energy error from btleplug.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Required BLE service or characteristic not found on the peripheral.
    #[error("Characteristic not found: {uuid} (searched in {service_count} services)")]
    CharacteristicNotFound {
        /// The UUID that was not found.
        uuid: String,
        /// Number of services that were searched.
        service_count: usize,
    },

    /// A link operation exceeded its own budget.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A rule in the rule table is malformed.
    #[error("Invalid rule #{index}: {reason}")]
    InvalidRule {
        /// Position of the rule in declared order.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
}

/// The acquisition step a [`Error::Transport`] failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportStage {
    /// Scanning for the peripheral before a device is picked.
    Scan,
    /// Establishing the connection.
    Connect,
    /// Locating the service and characteristic.
    Discover,
    /// Enabling notifications.
    Subscribe,
    /// Reading the characteristic value.
    Read,
}

impl fmt::Display for TransportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan => write!(f, "scan"),
            Self::Connect => write!(f, "connect"),
            Self::Discover => write!(f, "service discovery"),
            Self::Subscribe => write!(f, "subscribe"),
            Self::Read => write!(f, "read"),
        }
    }
}

impl Error {
    /// Wrap a link error with the stage it happened in.
    pub fn transport(stage: TransportStage, source: Error) -> Self {
        Self::Transport {
            stage,
            source: Box::new(source),
        }
    }

    /// Create an acquisition timeout, optionally carrying the fallback error.
    pub fn acquisition_timeout(duration: Duration, cause: Option<Error>) -> Self {
        Self::AcquisitionTimeout {
            duration,
            cause: cause.map(Box::new),
        }
    }

    /// Create a device-not-selected error for a name filter.
    pub fn device_not_selected(filter: impl Into<String>) -> Self {
        Self::DeviceNotSelected {
            filter: filter.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a characteristic not found error.
    pub fn characteristic_not_found(uuid: impl Into<String>, service_count: usize) -> Self {
        Self::CharacteristicNotFound {
            uuid: uuid.into(),
            service_count,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a rule validation error.
    pub fn invalid_rule(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            index,
            reason: reason.into(),
        }
    }

    /// The stage of a transport failure, if this is one.
    pub fn stage(&self) -> Option<TransportStage> {
        match self {
            Self::Transport { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Whether the caller may reasonably retry the whole acquisition.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DeviceNotSelected { .. }
                | Self::Transport { .. }
                | Self::AcquisitionTimeout { .. }
                | Self::Timeout { .. }
                | Self::Bluetooth(_)
        )
    }
}

impl From<soilsense_types::ParseError> for Error {
    fn from(err: soilsense_types::ParseError) -> Self {
        match err {
            soilsense_types::ParseError::InvalidLength { expected, actual } => {
                Error::InvalidPayload { expected, actual }
            }
            // Handle future ParseError variants (non_exhaustive)
            _ => Error::InvalidPayload {
                expected: soilsense_types::RawPacket::LEN,
                actual: 0,
            },
        }
    }
}

/// Result type alias using soilsense-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
