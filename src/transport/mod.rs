mod channel_bus;
mod tcp;

pub use channel_bus::{ChannelBus, ChannelBusTransport};
pub use tcp::TcpTransport;

use std::time::Duration;

use crate::error::Result;
use crate::model::Packet;

/// Pluggable packet transport. A node calls `publish` once per
/// destination channel and pulls inbound packets via `recv`; neither
/// adapter offers true multicast, so fanning a packet out to several
/// neighbors means calling `publish` once per neighbor.
pub trait Transport: Send + Sync {
    /// Delivers `packet` to whatever is subscribed on `channel`
    /// (conventionally a node id).
    fn publish(&self, channel: &str, packet: &Packet) -> Result<()>;

    /// Waits up to `timeout` for the next inbound packet addressed to
    /// this transport's own channel. Returns `Ok(None)` on timeout.
    fn recv(&self, timeout: Duration) -> Result<Option<Packet>>;
}
