//! Single-shot snapshot acquisition.
//!
//! [`SnapshotClient::acquire`] walks the peripheral through one complete
//! exchange:
//!
//! ```text
//! Idle -> Requesting -> Connecting -> ServiceDiscovery -> Subscribing
//!      -> Racing{Notify, Timeout} -> [Resolved | FallbackRead]
//!      -> Teardown -> Success | Failure
//! ```
//!
//! The push path (first value-changed notification) races a timer. If the
//! timer wins and the configured [`FallbackPolicy`] allows it, one pull read
//! of the characteristic supplies the snapshot instead. Teardown runs on
//! every path once a device has been selected.
//!
//! # Example
//!
//! ```no_run
//! use soilsense_core::{AcquisitionConfig, SnapshotClient, scan::BleTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SnapshotClient::new(BleTransport::new(), AcquisitionConfig::default());
//!     let reading = client.acquire().await?;
//!     println!("Moisture: {}%", reading.moisture);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use soilsense_types::{SensorReading, decode};

use crate::error::{Error, Result, TransportStage};
use crate::session::{AcquisitionSession, RaceOutcome};
use crate::traits::{SensorLink, Transport};
use crate::uuid::{DEVICE_NAME, SOIL_SERVICE, SOIL_SNAPSHOT};

/// Default time to wait for a pushed notification.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_millis(6000);

/// What to do when no notification arrives before the timeout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fail the acquisition with [`Error::AcquisitionTimeout`].
    FailOnTimeout,
    /// Attempt one pull read of the characteristic.
    #[default]
    ReadOnTimeout,
}

/// Identity of the peripheral and the acquisition budget.
///
/// Passed to [`SnapshotClient::new`] once and never mutated afterwards.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use soilsense_core::{AcquisitionConfig, FallbackPolicy};
///
/// let config = AcquisitionConfig::default()
///     .notify_timeout(Duration::from_secs(3))
///     .fallback(FallbackPolicy::FailOnTimeout);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionConfig {
    /// Advertised name the device picker is constrained to.
    pub device_name: String,
    /// GATT service that must be present on the peripheral.
    pub service_uuid: Uuid,
    /// Snapshot characteristic inside that service.
    pub characteristic_uuid: Uuid,
    /// How long to wait for a pushed notification.
    pub notify_timeout: Duration,
    /// Behaviour when the notification does not arrive in time.
    pub fallback: FallbackPolicy,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            device_name: DEVICE_NAME.to_string(),
            service_uuid: SOIL_SERVICE,
            characteristic_uuid: SOIL_SNAPSHOT,
            notify_timeout: DEFAULT_NOTIFY_TIMEOUT,
            fallback: FallbackPolicy::default(),
        }
    }
}

impl AcquisitionConfig {
    /// Create a config with the factory identifiers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device-name filter.
    #[must_use]
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Set the GATT service identifier.
    #[must_use]
    pub fn service_uuid(mut self, uuid: Uuid) -> Self {
        self.service_uuid = uuid;
        self
    }

    /// Set the snapshot characteristic identifier.
    #[must_use]
    pub fn characteristic_uuid(mut self, uuid: Uuid) -> Self {
        self.characteristic_uuid = uuid;
        self
    }

    /// Set the notification timeout.
    #[must_use]
    pub fn notify_timeout(mut self, timeout: Duration) -> Self {
        self.notify_timeout = timeout;
        self
    }

    /// Set the fallback policy.
    #[must_use]
    pub fn fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = policy;
        self
    }

    /// Validate the config and return an error if invalid.
    ///
    /// Checks that:
    /// - `device_name` is not blank
    /// - `notify_timeout` is > 0
    pub fn validate(&self) -> Result<()> {
        if self.device_name.trim().is_empty() {
            return Err(Error::invalid_config("device_name must not be empty"));
        }
        if self.notify_timeout.is_zero() {
            return Err(Error::invalid_config("notify_timeout must be > 0"));
        }
        Ok(())
    }
}

/// How the snapshot payload was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    /// Pushed by the peripheral before the timeout.
    Notification,
    /// Pulled after the timeout fired.
    FallbackRead,
}

/// A reading together with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The decoded reading.
    pub reading: SensorReading,
    /// Advertised name of the peripheral it came from.
    pub device_name: Option<String>,
    /// Push or pull.
    pub source: SnapshotSource,
}

/// Acquires single snapshots through a [`Transport`].
///
/// The client holds no per-acquisition state: every call to
/// [`SnapshotClient::acquire`] creates, drives and tears down its own
/// session.
pub struct SnapshotClient<T: Transport> {
    transport: T,
    config: AcquisitionConfig,
}

impl<T: Transport> std::fmt::Debug for SnapshotClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> SnapshotClient<T> {
    /// Create a client over `transport` with a fixed configuration.
    pub fn new(transport: T, config: AcquisitionConfig) -> Self {
        Self { transport, config }
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Acquire one reading.
    pub async fn acquire(&self) -> Result<SensorReading> {
        self.acquire_snapshot().await.map(|snapshot| snapshot.reading)
    }

    /// Acquire one reading along with its provenance.
    #[tracing::instrument(level = "info", skip_all, fields(device_name = %self.config.device_name))]
    pub async fn acquire_snapshot(&self) -> Result<Snapshot> {
        self.config.validate()?;

        if !self.transport.is_supported().await {
            return Err(Error::PlatformUnsupported);
        }

        debug!("Requesting device...");
        let link = self
            .transport
            .request_device(&self.config.device_name)
            .await
            .map_err(requesting_error)?;
        let device_name = link.name().map(str::to_owned);
        info!(device = ?device_name, "Device selected");

        let mut session = AcquisitionSession::new(link, self.config.characteristic_uuid);
        let outcome = self.run(&mut session).await;
        session.teardown().await;

        match &outcome {
            Ok((_, source)) => info!(?source, "Snapshot acquired"),
            Err(e) => info!(error = %e, "Acquisition failed"),
        }

        outcome.map(|(reading, source)| Snapshot {
            reading,
            device_name,
            source,
        })
    }

    async fn run<L: SensorLink + 'static>(
        &self,
        session: &mut AcquisitionSession<L>,
    ) -> Result<(SensorReading, SnapshotSource)> {
        session.open(self.config.service_uuid).await?;
        let subscription = session.subscribe().await?;

        let budget = self.config.notify_timeout;
        match session.race(subscription, budget).await {
            RaceOutcome::Notified(payload) => {
                Ok((decode(&payload)?, SnapshotSource::Notification))
            }
            RaceOutcome::TimedOut => match self.config.fallback {
                FallbackPolicy::FailOnTimeout => Err(Error::acquisition_timeout(budget, None)),
                FallbackPolicy::ReadOnTimeout => {
                    let payload = session
                        .fallback_read()
                        .await
                        .map_err(|e| Error::acquisition_timeout(budget, Some(e)))?;
                    Ok((decode(&payload)?, SnapshotSource::FallbackRead))
                }
            },
        }
    }
}

/// Only picker outcomes and staged transport errors leave the requesting
/// stage; anything else the adapter raised while scanning is staged here.
fn requesting_error(err: Error) -> Error {
    match err {
        Error::PlatformUnsupported | Error::DeviceNotSelected { .. } | Error::Transport { .. } => {
            err
        }
        other => Error::transport(TransportStage::Scan, other),
    }
}
