use std::time::Duration;

use tracing::{debug, info, warn};

use crate::model::{DvTable, Packet, PacketPayload, PacketType};
use crate::routers::{Router, RouterContext, RouterOutputs};

/// How often a node re-advertises its cost vector to its neighbors.
pub const ADVERTISE_INTERVAL: Duration = Duration::from_secs(5);

/// Bellman-Ford distance-vector router. Advertises `{dest: cost}` to
/// every neighbor on a fixed interval and whenever a neighbor's
/// advertisement strictly improves a route; forwards messages via
/// `table[dest].next_hop`. No split-horizon or poisoned-reverse, so
/// count-to-infinity on a link failure is possible — acceptable for a
/// lab setting where links don't go down mid-run.
pub struct DistanceVectorRouter {
    table: DvTable,
    last_advertised_ms: i64,
}

impl DistanceVectorRouter {
    pub fn new(self_id: &str, neighbors: impl IntoIterator<Item = String>) -> Self {
        Self {
            table: DvTable::new(self_id, neighbors),
            last_advertised_ms: i64::MIN,
        }
    }

    fn advertise(&mut self, ctx: &RouterContext) -> RouterOutputs {
        let vector = self.table.as_cost_vector();
        let outbound = ctx
            .neighbors
            .iter()
            .map(|neighbor| {
                let packet = Packet::new(
                    ctx.proto,
                    PacketType::DvTable,
                    ctx.self_id,
                    neighbor.as_str(),
                    1,
                    PacketPayload::DvTable(vector.clone()),
                    ctx.now_ms,
                );
                (neighbor.clone(), packet)
            })
            .collect();
        self.last_advertised_ms = ctx.now_ms;
        RouterOutputs {
            outbound,
            delivered: Vec::new(),
        }
    }
}

impl Router for DistanceVectorRouter {
    fn name(&self) -> &'static str {
        "distance_vector"
    }

    fn on_start(&mut self, ctx: &RouterContext) -> RouterOutputs {
        self.advertise(ctx)
    }

    fn on_timer(&mut self, ctx: &RouterContext) -> RouterOutputs {
        let due = ctx.now_ms - self.last_advertised_ms >= ADVERTISE_INTERVAL.as_millis() as i64;
        if !due {
            return RouterOutputs::default();
        }
        self.advertise(ctx)
    }

    fn on_packet(&mut self, ctx: &RouterContext, packet: Packet) -> RouterOutputs {
        match &packet.payload {
            PacketPayload::DvTable(vector) => {
                if self.table.apply_advertisement(&packet.from, vector) {
                    debug!(sender = %packet.from, "distance-vector table updated");
                }
                RouterOutputs::default()
            }
            _ => {
                if packet.is_for(ctx.self_id) {
                    info!(from = %packet.from, "message delivered");
                    return RouterOutputs {
                        outbound: Vec::new(),
                        delivered: vec![packet],
                    };
                }
                let Some(next_hop) = self.table.next_hop(&packet.to) else {
                    warn!(dest = %packet.to, "no route to destination");
                    return RouterOutputs::default();
                };
                let mut forwarded = packet;
                forwarded.from = ctx.self_id.to_string();
                RouterOutputs::single_send(next_hop, forwarded)
            }
        }
    }

    fn send(
        &mut self,
        ctx: &RouterContext,
        dest: &str,
        payload: PacketPayload,
        ttl: i64,
    ) -> RouterOutputs {
        let Some(next_hop) = self.table.next_hop(dest) else {
            warn!(%dest, "no route to destination");
            return RouterOutputs::default();
        };
        let packet = Packet::new(
            ctx.proto,
            PacketType::Message,
            ctx.self_id,
            dest,
            ttl,
            payload,
            ctx.now_ms,
        );
        RouterOutputs::single_send(next_hop, packet)
    }

    fn route(&self, dest: &str) -> Option<String> {
        self.table.next_hop(dest).map(str::to_string)
    }

    fn routes(&self) -> Vec<(String, String)> {
        self.table
            .iter()
            .map(|(dest, _cost, hop)| (dest.to_string(), hop.to_string()))
            .collect()
    }
}
