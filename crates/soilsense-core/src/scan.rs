//! Device discovery and selection over btleplug.
//!
//! [`BleTransport`] is the [`Transport`] used against real hardware. Its
//! device picker scans for a fixed window, keeps the peripherals whose
//! advertised local name equals the filter, and hands the candidates to a
//! [`DeviceChooser`]. The default chooser takes the strongest signal; an
//! interactive front-end can supply its own.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::device::BleLink;
use crate::error::{Error, Result, TransportStage};
use crate::traits::Transport;

/// Default scan window.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(5);
/// Default timeout for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Default timeout for service discovery.
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(10);
/// Default timeout for a single characteristic read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Link-level timeouts for the btleplug transport.
///
/// These bound individual BLE operations. The notification budget of an
/// acquisition lives in [`crate::AcquisitionConfig`].
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use soilsense_core::scan::BleOptions;
///
/// // Longer timeouts for a sensor at the far end of a field
/// let options = BleOptions::default()
///     .scan_duration(Duration::from_secs(10))
///     .connect_timeout(Duration::from_secs(25));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BleOptions {
    /// How long the picker scans before offering candidates.
    pub scan_duration: Duration,
    /// Timeout for establishing a BLE connection.
    pub connect_timeout: Duration,
    /// Timeout for service discovery after connection.
    pub discovery_timeout: Duration,
    /// Timeout for the fallback read.
    pub read_timeout: Duration,
}

impl Default for BleOptions {
    fn default() -> Self {
        Self {
            scan_duration: DEFAULT_SCAN_DURATION,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            discovery_timeout: DEFAULT_DISCOVERY_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl BleOptions {
    /// Create options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scan window.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the service discovery timeout.
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    /// Set the read timeout.
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Reject zero durations, which would fail every scan, connect or read
    /// immediately.
    pub fn validate(&self) -> Result<()> {
        let durations = [
            ("scan_duration", self.scan_duration),
            ("connect_timeout", self.connect_timeout),
            ("discovery_timeout", self.discovery_timeout),
            ("read_timeout", self.read_timeout),
        ];
        for (field, duration) in durations {
            if duration.is_zero() {
                return Err(Error::invalid_config(format!("{field} must be > 0")));
            }
        }
        Ok(())
    }
}

/// A peripheral offered to the [`DeviceChooser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Advertised local name.
    pub name: Option<String>,
    /// Connection identifier (peripheral ID on macOS, address elsewhere).
    pub identifier: String,
    /// RSSI signal strength.
    pub rssi: Option<i16>,
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.name.as_deref().unwrap_or("Unknown"),
            self.identifier
        )?;
        if let Some(rssi) = self.rssi {
            write!(f, " {} dBm", rssi)?;
        }
        Ok(())
    }
}

/// Picks one of the scanned candidates.
///
/// Returning `None` means the user aborted; the acquisition then fails with
/// [`Error::DeviceNotSelected`]. Implementations may block (an interactive
/// prompt, for instance); they run on the blocking thread pool.
pub trait DeviceChooser: Send + Sync {
    fn choose(&self, candidates: &[Candidate]) -> Option<usize>;
}

impl<F> DeviceChooser for F
where
    F: Fn(&[Candidate]) -> Option<usize> + Send + Sync,
{
    fn choose(&self, candidates: &[Candidate]) -> Option<usize> {
        self(candidates)
    }
}

/// Chooses the candidate with the strongest signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrongestSignal;

impl DeviceChooser for StrongestSignal {
    fn choose(&self, candidates: &[Candidate]) -> Option<usize> {
        candidates
            .iter()
            .enumerate()
            .max_by_key(|(_, c)| c.rssi.unwrap_or(i16::MIN))
            .map(|(index, _)| index)
    }
}

/// Get the first available Bluetooth adapter.
///
/// A host without a Bluetooth manager or without any adapter is reported as
/// [`Error::PlatformUnsupported`].
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await.map_err(|e| {
        debug!("Bluetooth manager unavailable: {}", e);
        Error::PlatformUnsupported
    })?;
    let adapters = manager.adapters().await.map_err(|e| {
        debug!("Could not enumerate adapters: {}", e);
        Error::PlatformUnsupported
    })?;

    adapters.into_iter().next().ok_or(Error::PlatformUnsupported)
}

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// MAC address.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Identifier for a peripheral: the address when the platform exposes one,
/// the peripheral ID otherwise (macOS reports all-zero addresses).
pub fn peripheral_identifier(address: &str, id: &PeripheralId) -> String {
    if is_unset_address(address) {
        format_peripheral_id(id)
    } else {
        address.to_string()
    }
}

fn is_unset_address(address: &str) -> bool {
    address == "00:00:00:00:00:00"
}

/// [`Transport`] backed by the host's Bluetooth adapter.
#[derive(Clone)]
pub struct BleTransport {
    options: BleOptions,
    chooser: Arc<dyn DeviceChooser>,
}

impl fmt::Debug for BleTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleTransport")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Default for BleTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl BleTransport {
    /// Create a transport with default timeouts that picks the strongest
    /// matching peripheral.
    pub fn new() -> Self {
        Self::with_options(BleOptions::default())
    }

    /// Create a transport with custom timeouts.
    pub fn with_options(options: BleOptions) -> Self {
        Self {
            options,
            chooser: Arc::new(StrongestSignal),
        }
    }

    /// Replace the device chooser.
    #[must_use]
    pub fn chooser(mut self, chooser: impl DeviceChooser + 'static) -> Self {
        self.chooser = Arc::new(chooser);
        self
    }

    /// The link timeouts in use.
    pub fn options(&self) -> &BleOptions {
        &self.options
    }

    async fn scan(
        &self,
        adapter: &Adapter,
        name_filter: &str,
    ) -> Result<Vec<(Candidate, Peripheral)>> {
        info!(
            "Scanning for '{}' for {} seconds...",
            name_filter,
            self.options.scan_duration.as_secs()
        );

        let staged = |e: btleplug::Error| Error::transport(TransportStage::Scan, e.into());
        adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(staged)?;
        sleep(self.options.scan_duration).await;
        adapter.stop_scan().await.map_err(staged)?;

        let mut found = Vec::new();
        for peripheral in adapter.peripherals().await.map_err(staged)? {
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Error reading peripheral properties: {}", e);
                    continue;
                }
            };
            if properties.local_name.as_deref() != Some(name_filter) {
                continue;
            }

            let candidate = Candidate {
                name: properties.local_name.clone(),
                identifier: peripheral_identifier(&properties.address.to_string(), &peripheral.id()),
                rssi: properties.rssi,
            };
            debug!("Candidate: {}", candidate);
            found.push((candidate, peripheral));
        }

        info!("Scan complete. Found {} candidate(s)", found.len());
        Ok(found)
    }
}

#[async_trait]
impl Transport for BleTransport {
    type Link = BleLink;

    async fn is_supported(&self) -> bool {
        get_adapter().await.is_ok()
    }

    #[tracing::instrument(level = "info", skip(self))]
    async fn request_device(&self, name_filter: &str) -> Result<BleLink> {
        let adapter = get_adapter().await?;
        let mut found = self.scan(&adapter, name_filter).await?;

        if found.is_empty() {
            warn!("No peripheral advertising as '{}'", name_filter);
            return Err(Error::device_not_selected(name_filter));
        }

        let candidates: Vec<Candidate> = found.iter().map(|(c, _)| c.clone()).collect();
        let chooser = Arc::clone(&self.chooser);
        let choice = tokio::task::spawn_blocking(move || chooser.choose(&candidates))
            .await
            .unwrap_or_else(|e| {
                warn!("Device chooser panicked: {}", e);
                None
            });

        let Some(index) = choice.filter(|&i| i < found.len()) else {
            info!("Device selection aborted");
            return Err(Error::device_not_selected(name_filter));
        };

        let (candidate, peripheral) = found.swap_remove(index);
        info!("Selected {}", candidate);
        Ok(BleLink::new(
            adapter,
            peripheral,
            candidate,
            self.options.clone(),
        ))
    }
}
