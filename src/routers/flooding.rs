use tracing::{debug, info};

use crate::model::{Packet, PacketPayload, PacketType, SeenSet, BROADCAST};
use crate::routers::{Router, RouterContext, RouterOutputs};

/// Multiplier applied to neighbor fan-out to size the seen-set: a node
/// with few neighbors can still have many floods in flight at once.
const SEEN_SET_CAPACITY_PER_NEIGHBOR: usize = 10;

/// Floods every message to all neighbors except whoever it arrived
/// from, relying on a seen-set and TTL to bound the fan-out. No routing
/// table is kept; `route()` always reports `None`.
pub struct FloodingRouter {
    seen: SeenSet,
}

impl FloodingRouter {
    pub fn new(neighbor_count: usize) -> Self {
        let capacity = neighbor_count.max(1) * SEEN_SET_CAPACITY_PER_NEIGHBOR;
        Self {
            seen: SeenSet::with_capacity(capacity),
        }
    }
}

impl Router for FloodingRouter {
    fn name(&self) -> &'static str {
        "flooding"
    }

    fn on_timer(&mut self, _ctx: &RouterContext) -> RouterOutputs {
        // Flooding needs no periodic advertisement.
        RouterOutputs::default()
    }

    fn on_packet(&mut self, ctx: &RouterContext, mut packet: Packet) -> RouterOutputs {
        if packet.ptype == PacketType::Hello {
            info!(from = %packet.from, "hello received, replying with echo");
            let echo = Packet::new(
                ctx.proto,
                PacketType::Echo,
                ctx.self_id,
                packet.from.as_str(),
                1,
                PacketPayload::None,
                ctx.now_ms,
            );
            return RouterOutputs::single_send(packet.from, echo);
        }
        if packet.ptype == PacketType::Echo {
            debug!(from = %packet.from, "echo received");
            return RouterOutputs::default();
        }

        if !self.seen.insert(packet.flood_id()) {
            debug!(from = %packet.from, ts = packet.ts, "drop already-seen flood packet");
            return RouterOutputs::default();
        }
        packet.hops += 1;

        if packet.is_for(ctx.self_id) {
            info!(from = %packet.from, "message delivered");
            return RouterOutputs {
                outbound: Vec::new(),
                delivered: vec![packet],
            };
        }

        if let Some(ttl) = packet.header_ttl() {
            if ttl <= 0 {
                debug!("drop flood packet: ttl exhausted");
                return RouterOutputs::default();
            }
            packet.set_header_ttl(ttl - 1);
        }

        let from = packet.from.clone();
        let mut outbound = Vec::new();
        for neighbor in ctx.neighbors {
            if *neighbor == from {
                continue;
            }
            let mut forwarded = packet.clone();
            forwarded.from = ctx.self_id.to_string();
            outbound.push((neighbor.clone(), forwarded));
        }
        RouterOutputs {
            outbound,
            delivered: Vec::new(),
        }
    }

    fn send(
        &mut self,
        ctx: &RouterContext,
        dest: &str,
        payload: PacketPayload,
        ttl: i64,
    ) -> RouterOutputs {
        let mut packet = Packet::new(
            ctx.proto,
            PacketType::Message,
            ctx.self_id,
            dest,
            ttl,
            payload,
            ctx.now_ms,
        );
        packet.set_header_ttl(ttl);

        let outbound = ctx
            .neighbors
            .iter()
            .map(|neighbor| (neighbor.clone(), packet.clone()))
            .collect();
        RouterOutputs {
            outbound,
            delivered: Vec::new(),
        }
    }

    fn route(&self, _dest: &str) -> Option<String> {
        None
    }

    fn ping(&mut self, ctx: &RouterContext, neighbor: &str) -> RouterOutputs {
        let hello = Packet::new(
            ctx.proto,
            PacketType::Hello,
            ctx.self_id,
            neighbor,
            1,
            PacketPayload::None,
            ctx.now_ms,
        );
        RouterOutputs::single_send(neighbor, hello)
    }
}
