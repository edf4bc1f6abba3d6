//! btleplug-backed sensor link.
//!
//! [`BleLink`] wraps a selected peripheral and implements [`SensorLink`]
//! with a timeout on every operation that can hang on a flaky radio.

use std::collections::HashMap;

use async_trait::async_trait;
use btleplug::api::{Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use futures::StreamExt;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::scan::{BleOptions, Candidate};
use crate::traits::{SensorLink, Subscription};

/// A peripheral picked by [`crate::scan::BleTransport`].
pub struct BleLink {
    /// Held so the adapter outlives the peripheral on every backend.
    #[allow(dead_code)]
    adapter: Adapter,
    peripheral: Peripheral,
    name: Option<String>,
    identifier: String,
    options: BleOptions,
    /// Characteristics verified during discovery.
    characteristics: RwLock<HashMap<Uuid, Characteristic>>,
}

impl std::fmt::Debug for BleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleLink")
            .field("name", &self.name)
            .field("identifier", &self.identifier)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl BleLink {
    pub(crate) fn new(
        adapter: Adapter,
        peripheral: Peripheral,
        candidate: Candidate,
        options: BleOptions,
    ) -> Self {
        Self {
            adapter,
            peripheral,
            name: candidate.name,
            identifier: candidate.identifier,
            options,
            characteristics: RwLock::new(HashMap::new()),
        }
    }

    async fn find_characteristic(&self, uuid: Uuid) -> Result<Characteristic> {
        self.characteristics
            .read()
            .await
            .get(&uuid)
            .cloned()
            .ok_or_else(|| {
                Error::characteristic_not_found(uuid.to_string(), self.peripheral.services().len())
            })
    }
}

#[async_trait]
impl SensorLink for BleLink {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device = %self.identifier))]
    async fn connect(&self) -> Result<()> {
        timeout(self.options.connect_timeout, self.peripheral.connect())
            .await
            .map_err(|_| Error::timeout("connect to device", self.options.connect_timeout))??;
        info!("Connected");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device = %self.identifier))]
    async fn discover(&self, service: Uuid, characteristic: Uuid) -> Result<()> {
        timeout(
            self.options.discovery_timeout,
            self.peripheral.discover_services(),
        )
        .await
        .map_err(|_| Error::timeout("discover services", self.options.discovery_timeout))??;

        let services = self.peripheral.services();
        debug!("Found {} services", services.len());

        let Some(found_service) = services.iter().find(|s| s.uuid == service) else {
            return Err(Error::characteristic_not_found(
                service.to_string(),
                services.len(),
            ));
        };
        let Some(found) = found_service
            .characteristics
            .iter()
            .find(|c| c.uuid == characteristic)
        else {
            return Err(Error::characteristic_not_found(
                characteristic.to_string(),
                services.len(),
            ));
        };

        debug!("Characteristic {} has properties {:?}", found.uuid, found.properties);
        self.characteristics
            .write()
            .await
            .insert(found.uuid, found.clone());
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device = %self.identifier))]
    async fn subscribe(&self, characteristic: Uuid) -> Result<Subscription> {
        let target = self.find_characteristic(characteristic).await?;

        // Open the notification stream first so a value pushed right after
        // the CCCD write is not lost.
        let notifications = self.peripheral.notifications().await?;
        self.peripheral.subscribe(&target).await?;

        let values = notifications
            .filter_map(move |notification| async move {
                (notification.uuid == characteristic).then_some(notification.value)
            })
            .boxed();
        Ok(Subscription::new(characteristic, values))
    }

    async fn unsubscribe(&self, characteristic: Uuid) -> Result<()> {
        let target = self.find_characteristic(characteristic).await?;
        self.peripheral.unsubscribe(&target).await?;
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device = %self.identifier))]
    async fn read(&self, characteristic: Uuid) -> Result<Vec<u8>> {
        let target = self.find_characteristic(characteristic).await?;
        let data = timeout(self.options.read_timeout, self.peripheral.read(&target))
            .await
            .map_err(|_| {
                Error::timeout(
                    format!("read characteristic {}", characteristic),
                    self.options.read_timeout,
                )
            })??;
        Ok(data)
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(device = %self.identifier))]
    async fn disconnect(&self) -> Result<()> {
        self.peripheral.disconnect().await?;
        info!("Disconnected");
        Ok(())
    }
}
