//! Decode command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use soilsense_types::{RawPacket, SensorReading};

use crate::cli::OutputFormat;
use crate::format::{as_json, format_reading_text};
use crate::util::{parse_hex, write_output};

pub fn cmd_decode(hex: &str, format: OutputFormat, output: Option<&PathBuf>) -> Result<()> {
    let bytes = parse_hex(hex)?;
    let packet = RawPacket::from_bytes(&bytes).context("Payload is not a soil snapshot")?;
    let reading = SensorReading::from(packet);

    let content = match format {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct DecodeJson {
                raw: RawPacket,
                reading: SensorReading,
            }
            as_json(&DecodeJson {
                raw: packet,
                reading,
            })?
        }
        OutputFormat::Text => format!(
            "Raw:         [{}, {}]\n{}",
            packet.moisture,
            packet.ec,
            format_reading_text(&reading)
        ),
    };
    write_output(output, &content)
}
