use tokio::sync::mpsc::{self, error::TrySendError};

use crate::roster::Roster;

use super::{DeviceInfo, LinkError, LinkResult, LinkState, SendStatus};

#[derive(Debug)]
pub enum LinkCommand {
    /// Scan for buttons so the user can pick one.
    Discover,
    Select(DeviceInfo),
    ReconnectRemembered,
    Send(Roster),
    Shutdown,
}

/// The GUI's side of the link.
///
/// Keeps the last [`LinkState`] reported by the adapter and refuses to queue a
/// second send while one is still in flight.
#[derive(Debug)]
pub struct LinkHandle {
    sender: mpsc::Sender<LinkCommand>,
    state: LinkState,
    /// Compared against [`LinkState::sends_completed`] to find the send still in flight.
    sends_queued: u64,
}

impl LinkHandle {
    pub fn new(sender: mpsc::Sender<LinkCommand>) -> Self {
        Self {
            sender,
            state: LinkState::default(),
            sends_queued: 0,
        }
    }

    pub fn state(&self) -> &LinkState {
        &self.state
    }

    pub fn is_sending(&self) -> bool {
        self.state.sends_completed < self.sends_queued || self.state.is_sending()
    }

    /// Mirrors `state`. The outcome of an earlier send is hidden until the queued one is done.
    pub fn update(&mut self, state: LinkState) {
        self.state = state;
        if self.state.sends_completed < self.sends_queued {
            self.state.status = SendStatus::Sending;
        }
    }

    pub fn discover(&self) -> LinkResult<()> {
        self.execute(LinkCommand::Discover)
    }

    pub fn select(&self, device: DeviceInfo) -> LinkResult<()> {
        self.execute(LinkCommand::Select(device))
    }

    pub fn reconnect_remembered(&self) -> LinkResult<()> {
        self.execute(LinkCommand::ReconnectRemembered)
    }

    /// Queues `roster` for transmission.
    ///
    /// # Errors
    ///
    /// [`LinkError::NoDevice`] if no device was ever selected and [`LinkError::Busy`]
    /// if a previous send hasn't finished. Neither reaches the adapter.
    pub fn send_roster(&mut self, roster: &Roster) -> LinkResult<()> {
        if self.state.device.is_none() {
            return Err(LinkError::NoDevice);
        }
        if self.is_sending() {
            return Err(LinkError::Busy);
        }
        self.execute(LinkCommand::Send(roster.clone()))?;
        self.sends_queued += 1;
        self.state.status = SendStatus::Sending;
        Ok(())
    }

    pub fn shutdown(&self) {
        if let Err(e) = self.execute(LinkCommand::Shutdown) {
            tracing::warn!(%e, "Failed to signal the link to shut down.");
        }
    }

    fn execute(&self, command: LinkCommand) -> LinkResult<()> {
        self.sender.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => LinkError::Busy,
            TrySendError::Closed(_) => LinkError::HandleInvalid,
        })
    }
}
