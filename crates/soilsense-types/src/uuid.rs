//! Bluetooth identifiers for the SoilSense peripheral.
//!
//! These are the factory defaults flashed into the ESP32 firmware. They are
//! only defaults: the acquisition client takes its identifiers from an
//! explicit configuration value so a peripheral with different firmware (or
//! a test double) can be targeted without touching these constants.

use uuid::{Uuid, uuid};

/// Advertised local name of the soil sensor peripheral.
pub const DEVICE_NAME: &str = "ESP32-SoilSensor";

/// Primary GATT service exposing the soil snapshot.
pub const SOIL_SERVICE: Uuid = uuid!("4fafc201-1fb5-459e-8fcc-c5c9c331914b");

/// Snapshot characteristic (read + notify), carrying the 2-byte payload.
pub const SOIL_SNAPSHOT: Uuid = uuid!("beb5483e-36e1-4688-b7f5-ea07361b26a8");
