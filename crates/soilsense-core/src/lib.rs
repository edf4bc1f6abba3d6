//! Core library for SoilSense soil sensors.
//!
//! This crate acquires single soil snapshots from an ESP32 soil sensor over
//! Bluetooth Low Energy and turns them into crop and fertilizer
//! recommendations.
//!
//! # Features
//!
//! - **Snapshot acquisition**: Connect, subscribe, race the first
//!   notification against a timeout, fall back to one pull read, and always
//!   release the link
//! - **Threshold classification**: Band N/P/K/moisture and position pH
//!   against a configurable table
//! - **Crop rules**: Ordered, first-match rule table with a default
//!   recommendation, validated at load time
//! - **Fertilizer planning**: Kilograms of N, P and K for a plot
//! - **Mock transport**: Drive the whole acquisition without hardware
//!
//! # Quick Start
//!
//! ```no_run
//! use soilsense_core::{
//!     AcquisitionConfig, RecommendationContext, RuleBook, SnapshotClient, scan::BleTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SnapshotClient::new(BleTransport::new(), AcquisitionConfig::default());
//!     let reading = client.acquire().await?;
//!     println!("Moisture: {}%", reading.moisture);
//!
//!     let context = RecommendationContext::new("rainy", "kharif");
//!     let recommendation = RuleBook::builtin().recommend(&reading, &context);
//!     println!("Grow: {}", recommendation.crops.join(", "));
//!
//!     Ok(())
//! }
//! ```

pub mod acquisition;
mod catalog;
pub mod device;
pub mod dosage;
pub mod error;
pub mod mock;
pub mod rules;
pub mod scan;
pub mod session;
pub mod thresholds;
pub mod traits;

pub use soilsense_types::types;
pub use soilsense_types::uuid;

pub use acquisition::{
    AcquisitionConfig, DEFAULT_NOTIFY_TIMEOUT, FallbackPolicy, Snapshot, SnapshotClient,
    SnapshotSource,
};
pub use dosage::{AreaUnit, DosageTable, DoseLine, DoseRates, FertilizerPlan, LandArea, plan};
pub use error::{Error, Result, TransportStage};
pub use mock::{MockLink, MockStep, MockTransport, MockTransportBuilder};
pub use rules::{
    Conditions, CropRule, DefaultRecommendation, Recommendation, RecommendationContext,
    RecommendationSource, RuleBook, Vocabulary,
};
pub use scan::{BleOptions, BleTransport, Candidate, DeviceChooser, StrongestSignal};
pub use session::SettleLatch;
pub use thresholds::{
    Band, CutPoints, Nutrient, PhAssessment, PhPosition, PhRange, SoilProfile, ThresholdTable,
};
pub use traits::{SensorLink, Subscription, Transport};

// Re-export from soilsense-types
pub use soilsense_types::{ParseError, RawPacket, SensorReading, decode};
