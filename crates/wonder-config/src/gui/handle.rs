//! A handle for updating the GUI from other threads.
//!
//! This handle holds a copy of the GUI's [`Context`] and will
//! ensure that [`Context::request_repaint`] is called after any message is sent.

use eframe::egui::Context;
use wonder_lib::link::{DeviceInfo, LinkObserver, LinkState};

pub(super) type GuiReceiver = std::sync::mpsc::Receiver<GuiMessage>;
pub(super) type GuiSender = std::sync::mpsc::Sender<GuiMessage>;

#[derive(Debug, PartialEq, Eq)]
pub enum GuiMessage {
    Link(LinkState),
    Devices(Vec<DeviceInfo>),
    Error(String),
}

impl From<LinkState> for GuiMessage {
    fn from(state: LinkState) -> Self {
        Self::Link(state)
    }
}

impl From<Vec<DeviceInfo>> for GuiMessage {
    fn from(devices: Vec<DeviceInfo>) -> Self {
        Self::Devices(devices)
    }
}

#[derive(Clone)]
pub struct GuiHandle {
    pub(super) context: Context,
    pub(super) sender: GuiSender,
}

#[cfg(test)]
impl GuiHandle {
    pub fn dummy() -> (Self, GuiReceiver) {
        let (sender, receiver) = std::sync::mpsc::channel();
        let handle = Self {
            context: Context::default(),
            sender,
        };
        (handle, receiver)
    }
}

impl GuiHandle {
    pub fn send(&mut self, msg: impl Into<GuiMessage>) {
        if let Err(e) = self.sender.send(msg.into()) {
            tracing::error!("Failed to send message to GUI\n{e:?}");
        }
        self.context.request_repaint();
    }
}

impl LinkObserver for GuiHandle {
    fn state_changed(&mut self, state: &LinkState) {
        self.send(state.clone());
    }

    fn devices_found(&mut self, devices: Vec<DeviceInfo>) {
        self.send(devices);
    }

    fn failed(&mut self, message: &str) {
        self.send(GuiMessage::Error(message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use wonder_lib::link::{DeviceInfo, LinkObserver, LinkPhase, LinkState, SEND_FAILED_MESSAGE};

    use super::{GuiHandle, GuiMessage};

    #[test]
    fn forwards_link_events() {
        let (mut handle, receiver) = GuiHandle::dummy();
        let state = LinkState {
            phase: LinkPhase::Connecting,
            ..Default::default()
        };
        let devices = vec![DeviceInfo::new("button", None)];

        handle.state_changed(&state);
        handle.devices_found(devices.clone());
        handle.failed(SEND_FAILED_MESSAGE);

        assert_eq!(receiver.try_recv(), Ok(GuiMessage::Link(state)));
        assert_eq!(receiver.try_recv(), Ok(GuiMessage::Devices(devices)));
        assert_eq!(
            receiver.try_recv(),
            Ok(GuiMessage::Error(SEND_FAILED_MESSAGE.to_owned()))
        );
    }

    #[test]
    fn gui_gone() {
        let (mut handle, receiver) = GuiHandle::dummy();
        drop(receiver);

        // Logged, not fatal
        handle.failed("nobody is listening");
    }
}
