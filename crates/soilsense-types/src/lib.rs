//! Platform-agnostic types for SoilSense soil sensors.
//!
//! This crate provides the shared data model and the payload decoder used by
//! soilsense-core and any other consumer of sensor snapshots.
//!
//! # Features
//!
//! - [`SensorReading`] and the [`RawPacket`] wire format
//! - [`decode`], the pure payload decoder
//! - Default GATT identifiers for the peripheral
//! - Error types for payload parsing
//!
//! # Example
//!
//! ```
//! use soilsense_types::decode;
//!
//! let reading = decode(&[42, 17]).unwrap();
//! assert_eq!(reading.moisture, 42.0);
//! assert_eq!(reading.tds, 17.0);
//! ```

pub mod error;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use types::{RawPacket, SensorReading};

/// Decode a snapshot payload into a [`SensorReading`].
///
/// Fails with [`ParseError::InvalidLength`] for any buffer that is not
/// exactly two bytes long. Deterministic and free of side effects.
pub fn decode(buffer: &[u8]) -> ParseResult<SensorReading> {
    SensorReading::from_bytes(buffer)
}
