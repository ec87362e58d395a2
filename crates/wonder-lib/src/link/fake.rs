use std::collections::HashSet;

use uuid::Uuid;

use super::{DeviceId, DeviceInfo, LinkError, LinkObserver, LinkResult, LinkState, Transport};

/// In-memory radio. Devices in `reachable` accept connections.
#[derive(Debug, Default)]
pub struct FakeTransport {
    pub advertised: Vec<DeviceInfo>,
    pub reachable: HashSet<DeviceId>,
    pub connected: HashSet<DeviceId>,
    pub fail_writes: bool,
    pub writes: Vec<(DeviceId, Uuid, Uuid, Vec<u8>)>,
    pub calls: Vec<&'static str>,
}

impl FakeTransport {
    pub fn with_device(id: &str) -> Self {
        let device = DeviceInfo::new(id, Some(format!("Button {id}")));
        Self {
            reachable: HashSet::from([device.id.clone()]),
            advertised: vec![device],
            ..Default::default()
        }
    }
}

impl Transport for FakeTransport {
    async fn discover(&mut self, _service: Uuid) -> LinkResult<Vec<DeviceInfo>> {
        self.calls.push("discover");
        Ok(self.advertised.clone())
    }

    async fn connect(&mut self, device: &DeviceId) -> LinkResult<()> {
        self.calls.push("connect");
        if !self.reachable.contains(device) {
            return Err(LinkError::Transport(format!("{device} is out of range")));
        }
        self.connected.insert(device.clone());
        Ok(())
    }

    async fn is_connected(&mut self, device: &DeviceId) -> bool {
        self.connected.contains(device)
    }

    async fn write(
        &mut self,
        device: &DeviceId,
        service: Uuid,
        characteristic: Uuid,
        payload: &[u8],
    ) -> LinkResult<()> {
        self.calls.push("write");
        if !self.connected.contains(device) {
            return Err(LinkError::Transport("not connected".into()));
        }
        if self.fail_writes {
            return Err(LinkError::Transport("write rejected".into()));
        }
        self.writes
            .push((device.clone(), service, characteristic, payload.to_vec()));
        Ok(())
    }

    async fn disconnect(&mut self, device: &DeviceId) -> LinkResult<()> {
        self.calls.push("disconnect");
        self.connected.remove(device);
        Ok(())
    }
}

/// Records everything the adapter reports.
#[derive(Debug, Default)]
pub struct Recorder {
    pub states: Vec<LinkState>,
    pub devices: Vec<Vec<DeviceInfo>>,
    pub failures: Vec<String>,
}

impl LinkObserver for Recorder {
    fn state_changed(&mut self, state: &LinkState) {
        self.states.push(state.clone());
    }

    fn devices_found(&mut self, devices: Vec<DeviceInfo>) {
        self.devices.push(devices);
    }

    fn failed(&mut self, message: &str) {
        self.failures.push(message.to_owned());
    }
}
