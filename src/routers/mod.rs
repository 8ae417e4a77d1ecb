pub mod distance_vector;
pub mod flooding;
pub mod link_state;

pub use distance_vector::DistanceVectorRouter;
pub use flooding::FloodingRouter;
pub use link_state::LinkStateRouter;

use crate::model::{Packet, Proto};

/// Everything a router needs to decide what to do, refreshed by the node
/// runtime on every call: who we are, who we're directly connected to,
/// the current time, and the informational `proto` tag to stamp on
/// originated packets.
#[derive(Debug, Clone)]
pub struct RouterContext<'a> {
    pub self_id: &'a str,
    pub neighbors: &'a [String],
    pub now_ms: i64,
    pub proto: Proto,
}

/// What a router wants done as a result of handling one event: packets
/// to publish on the transport, and packets addressed to this node to
/// hand up to the application layer.
#[derive(Debug, Default)]
pub struct RouterOutputs {
    pub outbound: Vec<(String, Packet)>,
    pub delivered: Vec<Packet>,
}

impl RouterOutputs {
    fn single_send(channel: impl Into<String>, packet: Packet) -> Self {
        Self {
            outbound: vec![(channel.into(), packet)],
            delivered: Vec::new(),
        }
    }
}

/// Common shape of the three routing strategies: flooding, distance
/// vector, and link state. Each owns its local state and reacts to
/// inbound packets, periodic ticks, and locally-originated sends.
pub trait Router: Send {
    fn name(&self) -> &'static str;

    /// Runs once at startup, before the first tick or packet.
    fn on_start(&mut self, _ctx: &RouterContext) -> RouterOutputs {
        RouterOutputs::default()
    }

    /// Runs on every periodic tick (distance vector and link state use
    /// this to re-advertise; flooding ignores it).
    fn on_timer(&mut self, ctx: &RouterContext) -> RouterOutputs;

    /// Handles one inbound packet, whether addressed to this node,
    /// broadcast, or in transit toward some other destination.
    fn on_packet(&mut self, ctx: &RouterContext, packet: Packet) -> RouterOutputs;

    /// Originates a new packet addressed to `dest` with application
    /// `payload`, to be forwarded per this router's own routing logic.
    fn send(
        &mut self,
        ctx: &RouterContext,
        dest: &str,
        payload: crate::model::PacketPayload,
        ttl: i64,
    ) -> RouterOutputs;

    /// Current best next hop toward `dest`, if known.
    fn route(&self, dest: &str) -> Option<String>;

    /// Every destination this router currently has a route for, paired
    /// with its next hop. Used by the control shell's `table` command to
    /// dump the full routing table/LSDB-derived routes rather than just
    /// the direct neighbor set. Flooding keeps no table, so the default
    /// is empty.
    fn routes(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Sends a one-hop `hello` liveness probe to `neighbor`. A stub
    /// feature carried over from the system this lab is modeled on: it
    /// never feeds into cost computation (all links stay unit cost) and
    /// distance-vector doesn't need it (its periodic advertisement is
    /// already an implicit liveness signal), so the default is a no-op.
    fn ping(&mut self, _ctx: &RouterContext, _neighbor: &str) -> RouterOutputs {
        RouterOutputs::default()
    }
}
