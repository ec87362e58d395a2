use tokio::sync::mpsc;
use tracing::instrument;

use crate::{
    roster::Roster,
    storage::{self, Storage},
};

use super::{
    DeviceId, DeviceInfo, LinkCommand, LinkError, LinkObserver, LinkPhase, LinkResult, LinkState,
    SendStatus, Transport, CHARACTERISTIC_UUID, SELECT_FAILED_MESSAGE, SERVICE_UUID,
};

pub struct LinkAdapter<T, S, O> {
    transport: T,
    storage: S,
    observer: O,
    state: LinkState,
}

impl<T, S, O> LinkAdapter<T, S, O>
where
    T: Transport,
    S: Storage,
    O: LinkObserver,
{
    pub fn new(transport: T, storage: S, observer: O) -> Self {
        Self {
            transport,
            storage,
            observer,
            state: LinkState::default(),
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Processes commands one at a time until [`LinkCommand::Shutdown`] or until every
    /// [`LinkHandle`](super::LinkHandle) is dropped.
    pub async fn run(mut self, mut receiver: mpsc::Receiver<LinkCommand>) {
        tracing::info!("Link started");
        while let Some(command) = receiver.recv().await {
            match command {
                LinkCommand::Discover => match self.discover().await {
                    Ok(devices) => self.observer.devices_found(devices),
                    Err(_) => self.observer.failed(SELECT_FAILED_MESSAGE),
                },
                LinkCommand::Select(device) => {
                    if self.select_device(device).await.is_err() {
                        self.observer.failed(SELECT_FAILED_MESSAGE);
                    }
                }
                LinkCommand::ReconnectRemembered => self.reconnect_remembered().await,
                LinkCommand::Send(roster) => {
                    if let Err(e) = self.send_roster(&roster).await {
                        self.observer.failed(e.send_message());
                    }
                }
                LinkCommand::Shutdown => break,
            }
        }
        self.disconnect().await;
        tracing::info!("Link stopped");
    }

    /// Scans for buttons to offer in the device picker.
    #[instrument(skip(self))]
    pub async fn discover(&mut self) -> LinkResult<Vec<DeviceInfo>> {
        let devices = self.transport.discover(SERVICE_UUID).await.map_err(|e| {
            tracing::error!(%e, "Device discovery failed");
            e
        })?;
        if devices.is_empty() {
            tracing::warn!("No buttons found");
            return Err(LinkError::NoDevicesFound);
        }
        tracing::info!(count = devices.len(), "Found buttons");
        Ok(devices)
    }

    /// Connects to the device the user picked and remembers it for the next start.
    ///
    /// On failure the previous link state is kept.
    #[instrument(skip_all, fields(device = %device))]
    pub async fn select_device(&mut self, device: DeviceInfo) -> LinkResult<()> {
        let previous = self.state.clone();
        self.set_phase(LinkPhase::Connecting);
        if let Err(e) = self.transport.connect(&device.id).await {
            tracing::error!(%e, "Bluetooth device selection failed");
            self.state = previous;
            self.notify();
            return Err(e);
        }
        tracing::info!("Connected");

        // Only one button is held at a time
        if let Some(old) = self.state.device.as_ref().filter(|d| d.id != device.id) {
            tracing::info!(previous = %old, "Releasing previously selected device");
            if let Err(e) = self.transport.disconnect(&old.id).await {
                tracing::warn!(%e, "Failed to disconnect previous device");
            }
        }

        if let Err(e) = storage::remember_device(&mut self.storage, &device.id) {
            tracing::warn!(%e, "Failed to remember device for reconnection");
        }
        self.connected_to(device);
        Ok(())
    }

    /// Best effort reconnect to the device selected in a previous run. Failures are only logged.
    #[instrument(skip(self))]
    pub async fn reconnect_remembered(&mut self) {
        let id = match storage::remembered_device(&self.storage) {
            Ok(Some(id)) => id,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(%e, "Failed to read remembered device");
                return;
            }
        };

        tracing::info!(%id, "Attempting to reconnect to remembered device");
        self.set_phase(LinkPhase::Connecting);
        match self.reconnect(id).await {
            Ok(device) => {
                tracing::info!(%device, "Reconnected to remembered device");
                self.connected_to(device);
            }
            Err(e) => {
                tracing::warn!(%e, "Auto-reconnect failed");
                self.set_phase(LinkPhase::Disconnected);
            }
        }
    }

    /// Writes `roster` to the button, reconnecting first if the session dropped.
    ///
    /// # Errors
    ///
    /// [`LinkError::NoDevice`] without touching the radio if no device was ever selected.
    /// Any other error leaves the status at [`SendStatus::Error`].
    ///
    /// Every call bumps [`LinkState::sends_completed`] and publishes the state, so a
    /// [`LinkHandle`](super::LinkHandle) can tell when the send it queued is over.
    /// Commands are handled one at a time, so a send never starts while another is running.
    #[instrument(skip_all, fields(players = roster.len()))]
    pub async fn send_roster(&mut self, roster: &Roster) -> LinkResult<()> {
        let Some(device) = self.state.device.clone() else {
            tracing::warn!("Attempted to send players without a device");
            self.state.sends_completed += 1;
            self.notify();
            return Err(LinkError::NoDevice);
        };

        self.state.status = SendStatus::Sending;
        self.set_phase(LinkPhase::Transmitting);
        let result = self.transmit(&device.id, roster).await;
        self.state.sends_completed += 1;
        match result {
            Ok(()) => {
                self.state.status = SendStatus::Success;
                self.state.connected = true;
                self.set_phase(LinkPhase::Connected);
                Ok(())
            }
            Err(e) => {
                tracing::error!(%e, "Error sending players to the button");
                self.state.status = SendStatus::Error;
                self.state.connected = self.transport.is_connected(&device.id).await;
                self.set_phase(LinkPhase::TransmitError);
                Err(e)
            }
        }
    }

    async fn transmit(&mut self, id: &DeviceId, roster: &Roster) -> LinkResult<()> {
        if !self.state.connected || !self.transport.is_connected(id).await {
            tracing::info!("Session was disconnected or missing, reconnecting...");
            self.state.connected = false;
            self.transport.connect(id).await?;
            self.state.connected = true;
        }

        let data = roster.to_json()?;
        self.transport
            .write(id, SERVICE_UUID, CHARACTERISTIC_UUID, data.as_bytes())
            .await?;
        tracing::debug!(%data, "Wrote player list to the button");
        Ok(())
    }

    async fn reconnect(&mut self, id: DeviceId) -> LinkResult<DeviceInfo> {
        let device = self
            .transport
            .discover(SERVICE_UUID)
            .await?
            .into_iter()
            .find(|d| d.id == id)
            .ok_or(LinkError::DeviceNotFound(id))?;
        self.transport.connect(&device.id).await?;
        Ok(device)
    }

    async fn disconnect(&mut self) {
        let Some(device) = self.state.device.as_ref() else {
            return;
        };
        if let Err(e) = self.transport.disconnect(&device.id).await {
            tracing::warn!(%e, "Failed to disconnect");
        }
        self.state.connected = false;
        self.set_phase(LinkPhase::Disconnected);
    }

    fn connected_to(&mut self, device: DeviceInfo) {
        self.state.device = Some(device);
        self.state.connected = true;
        self.set_phase(LinkPhase::Connected);
    }

    fn set_phase(&mut self, phase: LinkPhase) {
        self.state.phase = phase;
        self.notify();
    }

    fn notify(&mut self) {
        self.observer.state_changed(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, time::Duration};

    use tokio::{sync::mpsc, time::timeout};

    use crate::{
        link::{
            fake::{FakeTransport, Recorder},
            DeviceId, DeviceInfo, LinkCommand, LinkError, LinkPhase, SendStatus,
            CHARACTERISTIC_UUID, NOT_CONNECTED_MESSAGE, SELECT_FAILED_MESSAGE,
            SEND_FAILED_MESSAGE, SERVICE_UUID,
        },
        player::PlayerColor,
        roster::Roster,
        storage::{self, MemoryStorage},
    };

    use super::LinkAdapter;

    type TestAdapter = LinkAdapter<FakeTransport, MemoryStorage, Recorder>;

    fn setup(transport: FakeTransport) -> TestAdapter {
        LinkAdapter::new(transport, MemoryStorage::default(), Recorder::default())
    }

    fn roster() -> Roster {
        let mut roster = Roster::new();
        roster.add_player("SpongeBob", Some(PlayerColor::Orange)).unwrap();
        roster.add_player("Patrick", Some(PlayerColor::Pink)).unwrap();
        roster
    }

    async fn connected(id: &str) -> TestAdapter {
        let mut adapter = setup(FakeTransport::with_device(id));
        let device = adapter.discover().await.unwrap().remove(0);
        adapter.select_device(device).await.unwrap();
        adapter
    }

    #[tokio::test]
    async fn select_device() {
        let mut adapter = setup(FakeTransport::with_device("button"));
        let devices = adapter.discover().await.unwrap();
        assert_eq!(devices.len(), 1);

        adapter.select_device(devices[0].clone()).await.unwrap();
        assert!(adapter.state().connected);
        assert_eq!(adapter.state().phase, LinkPhase::Connected);
        assert_eq!(
            storage::remembered_device(&adapter.storage).unwrap(),
            Some(DeviceId::from("button"))
        );

        let phases: Vec<_> = adapter.observer.states.iter().map(|s| s.phase).collect();
        assert_eq!(phases, [LinkPhase::Connecting, LinkPhase::Connected]);
    }

    #[tokio::test]
    async fn select_other_device_releases_first() {
        let mut adapter = connected("first").await;
        let second = DeviceInfo::new("second", None);
        adapter.transport.advertised.push(second.clone());
        adapter.transport.reachable.insert(second.id.clone());

        adapter.select_device(second.clone()).await.unwrap();
        assert_eq!(
            adapter.transport.connected,
            HashSet::from([second.id.clone()])
        );
        assert_eq!(adapter.state().device, Some(second.clone()));

        // Picking the same device again keeps its session
        adapter.transport.calls.clear();
        adapter.select_device(second).await.unwrap();
        assert_eq!(adapter.transport.calls, ["connect"]);
    }

    #[tokio::test]
    async fn discover_nothing() {
        let mut adapter = setup(FakeTransport::default());
        assert_eq!(adapter.discover().await, Err(LinkError::NoDevicesFound));
    }

    #[tokio::test]
    async fn select_unreachable_device() {
        let mut adapter = setup(FakeTransport::with_device("button"));
        let stranger = DeviceInfo::new("stranger", None);

        assert!(adapter.select_device(stranger).await.is_err());
        assert!(!adapter.state().connected);
        assert_eq!(adapter.state().phase, LinkPhase::Disconnected);
        assert!(adapter.state().device.is_none());
        assert!(storage::remembered_device(&adapter.storage)
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn send_roster() {
        let mut adapter = connected("button").await;
        let roster = roster();

        adapter.send_roster(&roster).await.unwrap();
        assert_eq!(adapter.state().status, SendStatus::Success);
        assert_eq!(adapter.state().phase, LinkPhase::Connected);

        let (device, service, characteristic, payload) = &adapter.transport.writes[0];
        assert_eq!(device.as_str(), "button");
        assert_eq!(*service, SERVICE_UUID);
        assert_eq!(*characteristic, CHARACTERISTIC_UUID);
        let sent = Roster::from_json(std::str::from_utf8(payload).unwrap()).unwrap();
        assert_eq!(sent, roster);

        let statuses: Vec<_> = adapter.observer.states.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses[statuses.len() - 2..],
            [SendStatus::Sending, SendStatus::Success]
        );
        let completed: Vec<_> = adapter
            .observer
            .states
            .iter()
            .map(|s| s.sends_completed)
            .collect();
        assert_eq!(completed[completed.len() - 2..], [0, 1]);
    }

    #[tokio::test]
    async fn send_without_device() {
        let mut adapter = setup(FakeTransport::with_device("button"));

        assert_eq!(
            adapter.send_roster(&roster()).await,
            Err(LinkError::NoDevice)
        );
        assert!(adapter.transport.calls.is_empty());
        assert_eq!(adapter.state().status, SendStatus::Idle);
        // Still reported so the handle stops waiting for it
        assert_eq!(
            adapter.observer.states.last().map(|s| s.sends_completed),
            Some(1)
        );
    }

    #[tokio::test]
    async fn send_reconnects_dropped_session() {
        let mut adapter = connected("button").await;
        // The button went to sleep since the last send
        adapter.transport.connected.clear();
        adapter.transport.calls.clear();

        adapter.send_roster(&roster()).await.unwrap();
        assert_eq!(adapter.transport.calls, ["connect", "write"]);
        assert_eq!(adapter.state().status, SendStatus::Success);
        assert!(adapter.state().connected);
    }

    #[tokio::test]
    async fn send_fails_when_reconnect_fails() {
        let mut adapter = connected("button").await;
        adapter.transport.connected.clear();
        adapter.transport.reachable.clear();
        adapter.transport.calls.clear();
        let roster = roster();
        let before = roster.clone();

        assert!(matches!(
            adapter.send_roster(&roster).await,
            Err(LinkError::Transport(_))
        ));
        assert_eq!(adapter.transport.calls, ["connect"]);
        assert_eq!(adapter.state().status, SendStatus::Error);
        assert_eq!(adapter.state().phase, LinkPhase::TransmitError);
        assert!(!adapter.state().connected);
        assert_eq!(roster, before);
        // The device is kept so the user can retry
        assert!(adapter.state().device.is_some());

        adapter.transport.reachable.insert(DeviceId::from("button"));
        adapter.send_roster(&roster).await.unwrap();
        assert_eq!(adapter.state().status, SendStatus::Success);
        assert_eq!(adapter.state().sends_completed, 2);
    }

    #[tokio::test]
    async fn send_write_error() {
        let mut adapter = connected("button").await;
        adapter.transport.fail_writes = true;

        let e = adapter.send_roster(&roster()).await.unwrap_err();
        assert_eq!(e.send_message(), SEND_FAILED_MESSAGE);
        assert_eq!(adapter.state().status, SendStatus::Error);
        assert!(adapter.state().connected);
    }

    #[tokio::test]
    async fn reconnect_remembered() {
        let mut adapter = setup(FakeTransport::with_device("button"));
        storage::remember_device(&mut adapter.storage, &DeviceId::from("button")).unwrap();

        adapter.reconnect_remembered().await;
        assert!(adapter.state().connected);
        assert_eq!(
            adapter.state().device.as_ref().map(|d| d.id.as_str()),
            Some("button")
        );
    }

    #[tokio::test]
    async fn reconnect_remembered_is_silent() {
        // Nothing remembered, nothing attempted
        let mut adapter = setup(FakeTransport::with_device("button"));
        adapter.reconnect_remembered().await;
        assert!(adapter.transport.calls.is_empty());

        // The remembered device is no longer around
        storage::remember_device(&mut adapter.storage, &DeviceId::from("gone")).unwrap();
        adapter.reconnect_remembered().await;
        assert_eq!(adapter.state().phase, LinkPhase::Disconnected);
        assert!(!adapter.state().connected);
        assert!(adapter.observer.failures.is_empty());
    }

    #[tokio::test]
    async fn run() {
        let (tx, rx) = mpsc::channel(8);
        let mut transport = FakeTransport::with_device("button");
        let mut storage = MemoryStorage::default();
        let mut recorder = Recorder::default();
        let adapter = LinkAdapter::new(&mut transport, &mut storage, &mut recorder);

        tx.send(LinkCommand::Send(roster())).await.unwrap();
        tx.send(LinkCommand::Discover).await.unwrap();
        tx.send(LinkCommand::Select(DeviceInfo::new("stranger", None)))
            .await
            .unwrap();
        tx.send(LinkCommand::Select(DeviceInfo::new("button", None)))
            .await
            .unwrap();
        tx.send(LinkCommand::Send(roster())).await.unwrap();
        tx.send(LinkCommand::Shutdown).await.unwrap();
        adapter.run(rx).await;

        assert_eq!(
            recorder.failures,
            [NOT_CONNECTED_MESSAGE, SELECT_FAILED_MESSAGE]
        );
        assert_eq!(recorder.devices.len(), 1);
        assert_eq!(transport.writes.len(), 1);
        assert!(transport.connected.is_empty());
        assert_eq!(
            recorder.states.last().map(|s| s.phase),
            Some(LinkPhase::Disconnected)
        );
        assert_eq!(
            storage::remembered_device(&storage).unwrap(),
            Some(DeviceId::from("button"))
        );
    }

    #[tokio::test]
    async fn run_stops_when_handles_drop() {
        let (tx, rx) = mpsc::channel(1);
        let adapter = setup(FakeTransport::default());
        drop(tx);

        timeout(Duration::from_millis(50), adapter.run(rx))
            .await
            .expect("Link failed to stop");
    }
}
