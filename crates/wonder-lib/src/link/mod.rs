//! The wireless link to the button controller.
//!
//! [`LinkAdapter`] owns the session to the device and runs as an actor on its own
//! task, driven by [`LinkCommand`]s sent through a [`LinkHandle`]. The actual radio
//! is abstracted by [`Transport`] so the adapter can be exercised without hardware.

use std::fmt::Display;
use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use adapter::LinkAdapter;
pub use handle::{LinkCommand, LinkHandle};

mod adapter;
mod handle;

#[cfg(test)]
mod fake;

/// Service the button advertises.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000ffe0_0000_1000_8000_00805f9b34fb);
/// Characteristic the serialized roster is written to.
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x0000ffe1_0000_1000_8000_00805f9b34fb);

pub const SELECT_FAILED_MESSAGE: &str = "Failed to select a Bluetooth device. Please try again.";
pub const NOT_CONNECTED_MESSAGE: &str = "Please connect to a button first.";
pub const SEND_FAILED_MESSAGE: &str = "Failed to send data to ESP32. Please try again.";
pub const BUSY_MESSAGE: &str = "The player list is still being sent.";

/// Platform identifier of a peripheral, stable enough to be remembered across runs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(v: String) -> Self {
        Self(v)
    }
}

impl From<&str> for DeviceId {
    fn from(v: &str) -> Self {
        Self(v.to_owned())
    }
}

impl Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: Option<String>,
}

impl DeviceInfo {
    pub fn new(id: impl Into<DeviceId>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }
}

impl Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.id),
            None => write!(f, "Unknown device ({})", self.id),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("No device has been selected")]
    NoDevice,
    #[error("A transmission is already in progress")]
    Busy,
    #[error("Device selection was cancelled")]
    Cancelled,
    #[error("No Bluetooth adapter is available")]
    NoAdapter,
    #[error("No devices advertising the button service were found")]
    NoDevicesFound,
    #[error("Device {0} was not found")]
    DeviceNotFound(DeviceId),
    #[error("Characteristic {0} is not available on the device")]
    CharacteristicMissing(Uuid),
    #[error("Bluetooth Error: {0}")]
    Transport(String),
    #[error("Serialization Error: {0}")]
    Encode(String),
    #[error("The link is no longer running")]
    HandleInvalid,
}

impl From<serde_json::Error> for LinkError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

impl LinkError {
    /// Message shown to the user when sending the roster failed with this error.
    pub fn send_message(&self) -> &'static str {
        match self {
            Self::NoDevice => NOT_CONNECTED_MESSAGE,
            Self::Busy => BUSY_MESSAGE,
            _ => SEND_FAILED_MESSAGE,
        }
    }
}

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum LinkPhase {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Transmitting,
    TransmitError,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SendStatus {
    #[default]
    Idle,
    Sending,
    Success,
    Error,
}

impl Display for SendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SendStatus::Idle => f.write_str("Idle"),
            SendStatus::Sending => f.write_str("Sending..."),
            SendStatus::Success => f.write_str("Sent Successfully"),
            SendStatus::Error => f.write_str("Error"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkState {
    /// The last device the user selected, kept even while disconnected so sends can reconnect.
    pub device: Option<DeviceInfo>,
    pub connected: bool,
    pub phase: LinkPhase,
    pub status: SendStatus,
    /// Number of send commands the adapter has finished with, successfully or not.
    pub sends_completed: u64,
}

impl LinkState {
    pub fn is_sending(&self) -> bool {
        self.status == SendStatus::Sending
    }
}

/// Receives everything the link wants the user to know about.
pub trait LinkObserver {
    fn state_changed(&mut self, state: &LinkState);
    fn devices_found(&mut self, devices: Vec<DeviceInfo>);
    fn failed(&mut self, message: &str);
}

/// A short-range radio able to reach the button.
pub trait Transport {
    /// Scans for devices advertising `service`.
    fn discover(&mut self, service: Uuid) -> impl Future<Output = LinkResult<Vec<DeviceInfo>>>;
    fn connect(&mut self, device: &DeviceId) -> impl Future<Output = LinkResult<()>>;
    fn is_connected(&mut self, device: &DeviceId) -> impl Future<Output = bool>;
    fn write(
        &mut self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> impl Future<Output = LinkResult<()>>;
    fn disconnect(&mut self, device: &DeviceId) -> impl Future<Output = LinkResult<()>>;
}

impl<O: LinkObserver + ?Sized> LinkObserver for &mut O {
    fn state_changed(&mut self, state: &LinkState) {
        (**self).state_changed(state)
    }

    fn devices_found(&mut self, devices: Vec<DeviceInfo>) {
        (**self).devices_found(devices)
    }

    fn failed(&mut self, message: &str) {
        (**self).failed(message)
    }
}

impl<T: Transport> Transport for &mut T {
    fn discover(&mut self, service: Uuid) -> impl Future<Output = LinkResult<Vec<DeviceInfo>>> {
        (**self).discover(service)
    }

    fn connect(&mut self, device: &DeviceId) -> impl Future<Output = LinkResult<()>> {
        (**self).connect(device)
    }

    fn is_connected(&mut self, device: &DeviceId) -> impl Future<Output = bool> {
        (**self).is_connected(device)
    }

    fn write(
        &mut self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> impl Future<Output = LinkResult<()>> {
        (**self).write(device, service, characteristic, payload)
    }

    fn disconnect(&mut self, device: &DeviceId) -> impl Future<Output = LinkResult<()>> {
        (**self).disconnect(device)
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{LinkError, CHARACTERISTIC_UUID, SERVICE_UUID};

    #[test]
    fn uuids() {
        assert_eq!(
            SERVICE_UUID,
            Uuid::parse_str("0000ffe0-0000-1000-8000-00805f9b34fb").unwrap()
        );
        assert_eq!(
            CHARACTERISTIC_UUID,
            Uuid::parse_str("0000ffe1-0000-1000-8000-00805f9b34fb").unwrap()
        );
    }

    #[test]
    fn send_messages() {
        assert_eq!(
            LinkError::NoDevice.send_message(),
            "Please connect to a button first."
        );
        assert_eq!(
            LinkError::Transport("gatt".into()).send_message(),
            "Failed to send data to ESP32. Please try again."
        );
    }
}
