//! [`Transport`] over the host's Bluetooth LE adapter.

use std::{collections::HashMap, time::Duration};

use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::future::join_all;
use uuid::Uuid;
use wonder_lib::link::{DeviceId, DeviceInfo, LinkError, LinkResult, Transport};

fn ble_error(e: btleplug::Error) -> LinkError {
    LinkError::Transport(e.to_string())
}

pub struct BleTransport {
    scan_duration: Duration,
    // The manager owns the platform session and has to outlive the adapter
    manager: Option<(Manager, Adapter)>,
    peripherals: HashMap<DeviceId, Peripheral>,
}

impl BleTransport {
    pub fn new(scan_duration: Duration) -> Self {
        Self {
            scan_duration,
            manager: None,
            peripherals: HashMap::new(),
        }
    }

    /// The first Bluetooth adapter of the system, opened on first use.
    async fn central(&mut self) -> LinkResult<Adapter> {
        if let Some((_, central)) = &self.manager {
            return Ok(central.clone());
        }

        let manager = Manager::new().await.map_err(ble_error)?;
        let central = manager
            .adapters()
            .await
            .map_err(ble_error)?
            .into_iter()
            .next()
            .ok_or(LinkError::NoAdapter)?;
        match central.adapter_info().await {
            Ok(info) => tracing::info!(%info, "Using Bluetooth adapter"),
            Err(e) => tracing::debug!(%e, "Bluetooth adapter info unavailable"),
        }
        self.manager = Some((manager, central.clone()));
        Ok(central)
    }

    fn peripheral(&self, device: &DeviceId) -> LinkResult<&Peripheral> {
        self.peripherals
            .get(device)
            .ok_or_else(|| LinkError::DeviceNotFound(device.clone()))
    }
}

impl Transport for BleTransport {
    async fn discover(&mut self, service: Uuid) -> LinkResult<Vec<DeviceInfo>> {
        let central = self.central().await?;
        central
            .start_scan(ScanFilter {
                services: vec![service],
            })
            .await
            .map_err(ble_error)?;
        tokio::time::sleep(self.scan_duration).await;
        let found = central.peripherals().await.map_err(ble_error);
        if let Err(e) = central.stop_scan().await {
            tracing::warn!(%e, "Failed to stop scanning");
        }
        let found = found?;

        let properties = join_all(found.iter().map(|p| p.properties())).await;
        let mut devices = Vec::new();
        for (peripheral, properties) in found.into_iter().zip(properties) {
            let properties = match properties {
                Ok(Some(properties)) => properties,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(%e, "Skipping peripheral without properties");
                    continue;
                }
            };
            // Not every platform honors the scan filter
            if !properties.services.contains(&service) {
                continue;
            }

            let id = DeviceId::from(peripheral.id().to_string());
            tracing::debug!(%id, name = ?properties.local_name, "Discovered button");
            devices.push(DeviceInfo::new(id.clone(), properties.local_name));
            self.peripherals.insert(id, peripheral);
        }
        Ok(devices)
    }

    async fn connect(&mut self, device: &DeviceId) -> LinkResult<()> {
        let peripheral = self.peripheral(device)?;
        if !peripheral.is_connected().await.map_err(ble_error)? {
            peripheral.connect().await.map_err(ble_error)?;
        }
        peripheral.discover_services().await.map_err(ble_error)?;
        tracing::debug!(%device, "GATT connected");
        Ok(())
    }

    async fn is_connected(&mut self, device: &DeviceId) -> bool {
        match self.peripherals.get(device) {
            Some(peripheral) => peripheral.is_connected().await.unwrap_or(false),
            None => false,
        }
    }

    async fn write(
        &mut self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> LinkResult<()> {
        let peripheral = self.peripheral(device)?;
        let target = peripheral
            .characteristics()
            .into_iter()
            .find(|c| c.uuid == characteristic && c.service_uuid == service)
            .ok_or(LinkError::CharacteristicMissing(characteristic))?;
        peripheral
            .write(&target, payload, WriteType::WithResponse)
            .await
            .map_err(ble_error)
    }

    async fn disconnect(&mut self, device: &DeviceId) -> LinkResult<()> {
        let peripheral = self.peripheral(device)?;
        if peripheral.is_connected().await.map_err(ble_error)? {
            peripheral.disconnect().await.map_err(ble_error)?;
        }
        Ok(())
    }
}
