//! Trait abstractions for the BLE transport.
//!
//! The acquisition client never talks to btleplug directly. It drives a
//! [`Transport`] (host adapter plus device picker) and the [`SensorLink`] the
//! transport hands back. [`crate::scan::BleTransport`] is the real
//! implementation; [`crate::mock::MockTransport`] stands in for tests.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::error::Result;

/// Host-side entry point: capability check and device selection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The link type produced for a selected peripheral.
    type Link: SensorLink + 'static;

    /// Whether the host can pair with BLE peripherals at all.
    async fn is_supported(&self) -> bool;

    /// Present the device picker, constrained to peripherals whose
    /// advertised name matches `name_filter`.
    ///
    /// Returns [`crate::Error::DeviceNotSelected`] if the user aborts or no
    /// candidate matches.
    async fn request_device(&self, name_filter: &str) -> Result<Self::Link>;
}

/// A selected peripheral, before or after connection.
///
/// Implementations must tolerate `unsubscribe` and `disconnect` being called
/// on a link that never reached the corresponding state.
#[async_trait]
pub trait SensorLink: Send + Sync {
    /// The advertised device name, if known.
    fn name(&self) -> Option<&str>;

    /// Establish the connection.
    async fn connect(&self) -> Result<()>;

    /// Discover services and verify that `service` exposes `characteristic`.
    async fn discover(&self, service: Uuid, characteristic: Uuid) -> Result<()>;

    /// Enable notifications on `characteristic`.
    async fn subscribe(&self, characteristic: Uuid) -> Result<Subscription>;

    /// Disable notifications on `characteristic`.
    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()>;

    /// Pull the current value of `characteristic`.
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>>;

    /// Whether the link reports itself connected.
    async fn is_connected(&self) -> bool;

    /// Close the connection.
    async fn disconnect(&self) -> Result<()>;
}

/// Handle to an active notification subscription.
///
/// Carries the stream of value-changed payloads for one characteristic.
/// Dropping the handle stops delivery locally; the peripheral side is
/// released through [`SensorLink::unsubscribe`].
pub struct Subscription {
    characteristic: Uuid,
    values: BoxStream<'static, Vec<u8>>,
}

impl Subscription {
    /// Wrap a stream of notification payloads.
    pub fn new(characteristic: Uuid, values: BoxStream<'static, Vec<u8>>) -> Self {
        Self {
            characteristic,
            values,
        }
    }

    /// The characteristic this subscription listens on.
    pub fn characteristic(&self) -> Uuid {
        self.characteristic
    }

    /// Consume the handle and return its payload stream.
    pub fn into_stream(self) -> BoxStream<'static, Vec<u8>> {
        self.values
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("characteristic", &self.characteristic)
            .finish_non_exhaustive()
    }
}
