use std::{
    thread::JoinHandle,
    time::{Duration, Instant},
};

use tokio::sync::mpsc;
use wonder_lib::{
    link::{LinkAdapter, LinkCommand, LinkHandle},
    storage::FileStorage,
};

use crate::{ble::BleTransport, config::Config, gui::handle::GuiHandle};

pub type LinkCommandReceiver = mpsc::Receiver<LinkCommand>;

/// How long closing the window waits for the link to let go of the button.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Starts the link on its own thread with a tokio runtime for talking to the button.
pub fn spawn(
    config: &Config,
    gui_handle: GuiHandle,
) -> anyhow::Result<(LinkHandle, JoinHandle<()>)> {
    let (sender, receiver) = mpsc::channel::<LinkCommand>(32);
    let storage = FileStorage::new(&config.data_dir);
    let transport = BleTransport::new(config.scan_duration);
    let thread = std::thread::Builder::new()
        .name("Link".into())
        .spawn(move || run(receiver, transport, storage, gui_handle))?;
    Ok((LinkHandle::new(sender), thread))
}

#[tokio::main]
async fn run(
    receiver: LinkCommandReceiver,
    transport: BleTransport,
    storage: FileStorage,
    gui_handle: GuiHandle,
) {
    LinkAdapter::new(transport, storage, gui_handle)
        .run(receiver)
        .await;
}

/// Waits up to `timeout` for the link thread to finish.
///
/// Returns `false` and leaves the thread detached if it is still stuck in a radio call.
pub fn join(thread: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !thread.is_finished() {
        if Instant::now() >= deadline {
            tracing::warn!(?timeout, "Link thread did not stop in time, detaching it");
            return false;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    if thread.join().is_err() {
        tracing::error!("Link thread panicked");
    }
    true
}
