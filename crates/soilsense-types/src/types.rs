//! Core types for soil sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Raw snapshot payload as it arrives over the air.
///
/// The peripheral sends exactly two unsigned bytes: `[moisture, ec]`. Both
/// are meaningful in `0..=100`, but any byte value is accepted and passed
/// through unscaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawPacket {
    /// Volumetric moisture, percent.
    pub moisture: u8,
    /// Electrical conductivity channel.
    pub ec: u8,
}

impl RawPacket {
    /// Exact size of a payload on the wire.
    pub const LEN: usize = 2;

    /// Parse a packet from a buffer of exactly [`RawPacket::LEN`] bytes.
    ///
    /// Any other length is rejected, including longer buffers. Older
    /// firmware readers only rejected short buffers; trailing bytes are now
    /// treated as a framing error rather than ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use soilsense_types::RawPacket;
    ///
    /// let packet = RawPacket::from_bytes(&[42, 17]).unwrap();
    /// assert_eq!(packet.moisture, 42);
    /// assert_eq!(packet.ec, 17);
    ///
    /// assert!(RawPacket::from_bytes(&[42, 17, 0]).is_err());
    /// assert!(RawPacket::from_bytes(&[42]).is_err());
    /// ```
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        match *data {
            [moisture, ec] => Ok(Self { moisture, ec }),
            _ => Err(ParseError::InvalidLength {
                expected: Self::LEN,
                actual: data.len(),
            }),
        }
    }

    /// Encode the packet back to its wire form.
    pub fn to_bytes(self) -> [u8; Self::LEN] {
        [self.moisture, self.ec]
    }
}

impl TryFrom<&[u8]> for RawPacket {
    type Error = ParseError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Self::from_bytes(value)
    }
}

impl From<RawPacket> for SensorReading {
    /// Project a raw packet into a reading.
    ///
    /// The EC channel is the only nutrient proxy the hardware has, so TDS,
    /// nitrogen, phosphorus and potassium all carry the same EC value until
    /// dedicated channels exist. pH has no channel and is reported as `0.0`.
    fn from(packet: RawPacket) -> Self {
        Self::from_channels(f32::from(packet.moisture), f32::from(packet.ec))
    }
}

/// A single decoded soil snapshot.
///
/// Readings are plain values: once decoded they are never mutated. Use
/// [`SensorReading::with_ph`] to derive a new reading carrying a pH that was
/// measured by other means.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Soil pH. `0.0` when no pH source is available.
    #[cfg_attr(feature = "serde", serde(rename = "pH"))]
    pub ph: f32,
    /// Moisture in percent (0-100).
    pub moisture: f32,
    /// Total dissolved solids (EC proxy).
    pub tds: f32,
    /// Nitrogen (EC proxy).
    pub nitrogen: f32,
    /// Phosphorus (EC proxy).
    pub phosphorus: f32,
    /// Potassium (EC proxy).
    pub potassium: f32,
}

impl SensorReading {
    /// Decode a reading from a raw notification or read payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use soilsense_types::SensorReading;
    ///
    /// let reading = SensorReading::from_bytes(&[42, 17]).unwrap();
    /// assert_eq!(reading.moisture, 42.0);
    /// assert_eq!(reading.nitrogen, 17.0);
    /// assert_eq!(reading.ph, 0.0);
    /// ```
    pub fn from_bytes(data: &[u8]) -> ParseResult<Self> {
        RawPacket::from_bytes(data).map(Self::from)
    }

    /// Build a reading from the two physical channels, projecting EC the
    /// same way decoded payloads do.
    pub fn from_channels(moisture: f32, ec: f32) -> Self {
        Self {
            ph: 0.0,
            moisture,
            tds: ec,
            nitrogen: ec,
            phosphorus: ec,
            potassium: ec,
        }
    }

    /// Return a copy of this reading with the given pH.
    #[must_use]
    pub fn with_ph(self, ph: f32) -> Self {
        Self { ph, ..self }
    }

    /// Whether the pH field carries a measured value rather than the
    /// placeholder.
    pub fn has_ph(&self) -> bool {
        self.ph > 0.0
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pH {:.1}, moisture {:.0}%, TDS {:.0}, N {:.0}, P {:.0}, K {:.0}",
            self.ph, self.moisture, self.tds, self.nitrogen, self.phosphorus, self.potassium
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_ph_leaves_original_untouched() {
        let reading = SensorReading::from_bytes(&[55, 60]).unwrap();
        let measured = reading.with_ph(6.5);

        assert_eq!(reading.ph, 0.0);
        assert!(!reading.has_ph());
        assert_eq!(measured.ph, 6.5);
        assert!(measured.has_ph());
        assert_eq!(measured.moisture, reading.moisture);
        assert_eq!(measured.potassium, reading.potassium);
    }

    #[test]
    fn test_raw_packet_to_bytes() {
        let packet = RawPacket {
            moisture: 10,
            ec: 200,
        };
        assert_eq!(packet.to_bytes(), [10, 200]);
    }

    #[test]
    fn test_try_from_slice() {
        let data: &[u8] = &[1, 2];
        let packet = RawPacket::try_from(data).unwrap();
        assert_eq!(packet, RawPacket { moisture: 1, ec: 2 });
    }

    #[test]
    fn test_from_channels_matches_decode() {
        let manual = SensorReading::from_channels(42.0, 17.0);
        assert_eq!(manual, SensorReading::from_bytes(&[42, 17]).unwrap());
    }

    #[test]
    fn test_display() {
        let reading = SensorReading::from_bytes(&[42, 17]).unwrap();
        let text = reading.to_string();
        assert!(text.contains("moisture 42%"));
        assert!(text.contains("N 17"));
    }
}
