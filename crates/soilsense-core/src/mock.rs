//! Mock transport implementation for testing.
//!
//! This module provides a mock transport that can be used for unit testing
//! without requiring actual BLE hardware.
//!
//! [`MockTransport`] implements [`Transport`] and hands out [`MockLink`]s
//! that share state with it, so a test can inspect what the acquisition did
//! to the link after the link itself has been consumed.
//!
//! # Features
//!
//! - **Failure injection**: Fail at connect, discovery, subscribe, read,
//!   unsubscribe or disconnect
//! - **Notification scripting**: Deliver payloads after simulated delays, or
//!   stay silent
//! - **Call accounting**: Count reads, disconnects and unsubscribes

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::traits::{SensorLink, Subscription, Transport};
use crate::uuid::{DEVICE_NAME, SOIL_SERVICE, SOIL_SNAPSHOT};

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockStep {
    /// The scan behind [`Transport::request_device`].
    Scan,
    /// [`SensorLink::connect`].
    Connect,
    /// [`SensorLink::discover`].
    Discover,
    /// [`SensorLink::subscribe`].
    Subscribe,
    /// [`SensorLink::read`].
    Read,
    /// [`SensorLink::unsubscribe`].
    Unsubscribe,
    /// [`SensorLink::disconnect`].
    Disconnect,
}

#[derive(Debug)]
struct MockState {
    name: String,
    supported: bool,
    selectable: bool,
    service: Uuid,
    characteristic: Uuid,
    notifications: Vec<(Duration, Vec<u8>)>,
    read_payload: Vec<u8>,
    read_latency: Duration,
    failures: Vec<MockStep>,
    stays_connected: bool,
    connected: AtomicBool,
    request_count: AtomicU32,
    connect_count: AtomicU32,
    subscribe_count: AtomicU32,
    unsubscribe_count: AtomicU32,
    read_count: AtomicU32,
    disconnect_count: AtomicU32,
}

impl MockState {
    fn check(&self, step: MockStep) -> Result<()> {
        if self.failures.contains(&step) {
            Err(Error::Bluetooth(btleplug::Error::Other(
                format!("Mock failure at {:?}", step).into(),
            )))
        } else {
            Ok(())
        }
    }
}

/// A mock soil sensor transport for testing.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use soilsense_core::{AcquisitionConfig, SnapshotClient};
/// use soilsense_core::mock::MockTransport;
///
/// #[tokio::main]
/// async fn main() {
///     let transport = MockTransport::builder()
///         .notify(Duration::from_millis(10), vec![42, 17])
///         .build();
///     let client = SnapshotClient::new(transport, AcquisitionConfig::default());
///
///     let reading = client.acquire().await.unwrap();
///     assert_eq!(reading.moisture, 42.0);
///     assert_eq!(client.transport().disconnect_count(), 1);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<MockState>,
}

impl MockTransport {
    /// Create a builder with a cooperative peripheral that only answers
    /// pull reads.
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder::default()
    }

    /// Number of times the device picker was opened.
    pub fn request_count(&self) -> u32 {
        self.state.request_count.load(Ordering::SeqCst)
    }

    /// Number of connect attempts.
    pub fn connect_count(&self) -> u32 {
        self.state.connect_count.load(Ordering::SeqCst)
    }

    /// Number of subscribe attempts.
    pub fn subscribe_count(&self) -> u32 {
        self.state.subscribe_count.load(Ordering::SeqCst)
    }

    /// Number of unsubscribe calls.
    pub fn unsubscribe_count(&self) -> u32 {
        self.state.unsubscribe_count.load(Ordering::SeqCst)
    }

    /// Number of pull reads.
    pub fn read_count(&self) -> u32 {
        self.state.read_count.load(Ordering::SeqCst)
    }

    /// Number of disconnect calls.
    pub fn disconnect_count(&self) -> u32 {
        self.state.disconnect_count.load(Ordering::SeqCst)
    }

    /// Whether the simulated link is currently connected.
    pub fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Link = MockLink;

    async fn is_supported(&self) -> bool {
        self.state.supported
    }

    async fn request_device(&self, name_filter: &str) -> Result<MockLink> {
        self.state.request_count.fetch_add(1, Ordering::SeqCst);
        self.state.check(MockStep::Scan)?;
        if !self.state.selectable || self.state.name != name_filter {
            return Err(Error::device_not_selected(name_filter));
        }
        Ok(MockLink {
            state: Arc::clone(&self.state),
        })
    }
}

/// Link handed out by [`MockTransport`].
#[derive(Debug)]
pub struct MockLink {
    state: Arc<MockState>,
}

#[async_trait]
impl SensorLink for MockLink {
    fn name(&self) -> Option<&str> {
        Some(&self.state.name)
    }

    async fn connect(&self) -> Result<()> {
        self.state.connect_count.fetch_add(1, Ordering::SeqCst);
        self.state.check(MockStep::Connect)?;
        self.state
            .connected
            .store(self.state.stays_connected, Ordering::SeqCst);
        Ok(())
    }

    async fn discover(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        self.state.check(MockStep::Discover)?;
        if service != self.state.service {
            return Err(Error::characteristic_not_found(service.to_string(), 1));
        }
        if characteristic != self.state.characteristic {
            return Err(Error::characteristic_not_found(characteristic.to_string(), 1));
        }
        Ok(())
    }

    async fn subscribe(&self, characteristic: Uuid) -> Result<Subscription> {
        self.state.subscribe_count.fetch_add(1, Ordering::SeqCst);
        self.state.check(MockStep::Subscribe)?;

        let stream = if self.state.notifications.is_empty() {
            futures::stream::pending().boxed()
        } else {
            futures::stream::iter(self.state.notifications.clone())
                .then(|(delay, payload)| async move {
                    tokio::time::sleep(delay).await;
                    payload
                })
                .boxed()
        };
        Ok(Subscription::new(characteristic, stream))
    }

    async fn unsubscribe(&self, _characteristic: Uuid) -> Result<()> {
        self.state.unsubscribe_count.fetch_add(1, Ordering::SeqCst);
        self.state.check(MockStep::Unsubscribe)
    }

    async fn read(&self, _characteristic: Uuid) -> Result<Vec<u8>> {
        self.state.read_count.fetch_add(1, Ordering::SeqCst);
        if !self.state.read_latency.is_zero() {
            tokio::time::sleep(self.state.read_latency).await;
        }
        self.state.check(MockStep::Read)?;
        Ok(self.state.read_payload.clone())
    }

    async fn is_connected(&self) -> bool {
        self.state.connected.load(Ordering::SeqCst)
    }

    async fn disconnect(&self) -> Result<()> {
        self.state.disconnect_count.fetch_add(1, Ordering::SeqCst);
        self.state.check(MockStep::Disconnect)?;
        self.state.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Builder for creating mock transports with custom behavior.
#[derive(Debug)]
pub struct MockTransportBuilder {
    name: String,
    supported: bool,
    selectable: bool,
    service: Uuid,
    characteristic: Uuid,
    notifications: Vec<(Duration, Vec<u8>)>,
    read_payload: Vec<u8>,
    read_latency: Duration,
    failures: Vec<MockStep>,
    stays_connected: bool,
}

impl Default for MockTransportBuilder {
    fn default() -> Self {
        Self {
            name: DEVICE_NAME.to_string(),
            supported: true,
            selectable: true,
            service: SOIL_SERVICE,
            characteristic: SOIL_SNAPSHOT,
            notifications: Vec::new(),
            read_payload: vec![50, 50],
            read_latency: Duration::ZERO,
            failures: Vec::new(),
            stays_connected: true,
        }
    }
}

impl MockTransportBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the advertised device name.
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Simulate a host without a BLE stack.
    #[must_use]
    pub fn unsupported(mut self) -> Self {
        self.supported = false;
        self
    }

    /// Simulate the user dismissing the device picker.
    #[must_use]
    pub fn picker_dismissed(mut self) -> Self {
        self.selectable = false;
        self
    }

    /// Set the identifiers the peripheral actually exposes.
    #[must_use]
    pub fn gatt(mut self, service: Uuid, characteristic: Uuid) -> Self {
        self.service = service;
        self.characteristic = characteristic;
        self
    }

    /// Queue a notification `delay` after the previous one (or after subscribe).
    #[must_use]
    pub fn notify(mut self, delay: Duration, payload: Vec<u8>) -> Self {
        self.notifications.push((delay, payload));
        self
    }

    /// Set the value returned by pull reads.
    #[must_use]
    pub fn read_payload(mut self, payload: Vec<u8>) -> Self {
        self.read_payload = payload;
        self
    }

    /// Set simulated pull read latency.
    #[must_use]
    pub fn read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = latency;
        self
    }

    /// Make an operation fail.
    #[must_use]
    pub fn fail_at(mut self, step: MockStep) -> Self {
        self.failures.push(step);
        self
    }

    /// Simulate a peripheral that drops the connection on its own right
    /// after accepting it.
    #[must_use]
    pub fn drops_connection(mut self) -> Self {
        self.stays_connected = false;
        self
    }

    /// Build the mock transport.
    #[must_use]
    pub fn build(self) -> MockTransport {
        MockTransport {
            state: Arc::new(MockState {
                name: self.name,
                supported: self.supported,
                selectable: self.selectable,
                service: self.service,
                characteristic: self.characteristic,
                notifications: self.notifications,
                read_payload: self.read_payload,
                read_latency: self.read_latency,
                failures: self.failures,
                stays_connected: self.stays_connected,
                connected: AtomicBool::new(false),
                request_count: AtomicU32::new(0),
                connect_count: AtomicU32::new(0),
                subscribe_count: AtomicU32::new(0),
                unsubscribe_count: AtomicU32::new(0),
                read_count: AtomicU32::new(0),
                disconnect_count: AtomicU32::new(0),
            }),
        }
    }
}
