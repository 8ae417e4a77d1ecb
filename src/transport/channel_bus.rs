use std::collections::BTreeMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{Result, RouteLabError};
use crate::model::Packet;
use crate::transport::Transport;

/// In-process stand-in for the pub/sub hub real deployments run as a
/// separate collaborator: an `Arc<Mutex<...>>` map of channel name to
/// sender, shared by every node instantiated within one process. Used
/// for local multi-node simulation and integration tests.
#[derive(Clone, Default)]
pub struct ChannelBus {
    senders: Arc<Mutex<BTreeMap<String, Sender<Packet>>>>,
}

impl ChannelBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `channel` on the bus and returns a [`ChannelBusTransport`]
    /// bound to it. Re-registering the same channel replaces its receiver,
    /// so each node should call this exactly once.
    pub fn transport_for(&self, channel_name: impl Into<String>) -> ChannelBusTransport {
        let (tx, rx) = channel();
        let channel_name = channel_name.into();
        self.senders
            .lock()
            .expect("channel bus mutex poisoned")
            .insert(channel_name.clone(), tx);
        ChannelBusTransport {
            bus: self.clone(),
            channel_name,
            receiver: Mutex::new(rx),
        }
    }
}

pub struct ChannelBusTransport {
    bus: ChannelBus,
    channel_name: String,
    receiver: Mutex<Receiver<Packet>>,
}

impl Transport for ChannelBusTransport {
    fn publish(&self, channel_name: &str, packet: &Packet) -> Result<()> {
        let senders = self.bus.senders.lock().expect("channel bus mutex poisoned");
        let Some(sender) = senders.get(channel_name) else {
            return Err(RouteLabError::Transport(format!(
                "no subscriber on channel {channel_name}"
            )));
        };
        sender
            .send(packet.clone())
            .map_err(|err| RouteLabError::Transport(err.to_string()))
    }

    fn recv(&self, timeout: Duration) -> Result<Option<Packet>> {
        let receiver = self.receiver.lock().expect("channel bus mutex poisoned");
        match receiver.recv_timeout(timeout) {
            Ok(packet) => Ok(Some(packet)),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => Err(RouteLabError::Transport(
                format!("channel {} disconnected", self.channel_name),
            )),
        }
    }
}
