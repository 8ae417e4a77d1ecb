use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::model::{self, Graph, Lsdb, Packet, PacketPayload, PacketType, Proto, BROADCAST};
use crate::routers::{Router, RouterContext, RouterOutputs};

/// How often a node floods a fresh link-state advertisement of its own
/// neighbor list.
pub const LSA_INTERVAL: Duration = Duration::from_secs(5);

/// Link-state router: floods self-originated LSAs on a timer, keeps
/// the latest-seq LSA per origin in an LSDB, and routes messages by
/// running Dijkstra over the LSDB's adjacency graph on every lookup.
/// The graph is built directly from LSDB entries without
/// symmetrization, so an origin's advertised neighbor list is taken as
/// an authoritative directed edge set; in practice every node's LSA
/// lists the same neighbors it receives LSAs from, so the graph ends up
/// symmetric in any fully-converged topology.
pub struct LinkStateRouter {
    self_id: String,
    neighbors: Vec<String>,
    lsdb: Lsdb,
    seq: i64,
    last_flooded_ms: i64,
}

impl LinkStateRouter {
    pub fn new(self_id: &str, neighbors: impl IntoIterator<Item = String>) -> Self {
        Self {
            self_id: self_id.to_string(),
            neighbors: neighbors.into_iter().collect(),
            lsdb: Lsdb::default(),
            seq: 0,
            last_flooded_ms: i64::MIN,
        }
    }

    fn flood_own_lsa(&mut self, ctx: &RouterContext) -> RouterOutputs {
        self.seq += 1;
        self.lsdb
            .upsert(&self.self_id, self.seq, self.neighbors.clone());

        let packet = Packet::new(
            ctx.proto,
            PacketType::Lsa,
            self.self_id.as_str(),
            BROADCAST,
            1,
            PacketPayload::Lsa(self.neighbors.clone()),
            ctx.now_ms,
        )
        .with_header_seq(self.seq);

        self.last_flooded_ms = ctx.now_ms;
        let outbound = self
            .neighbors
            .iter()
            .map(|neighbor| (neighbor.clone(), packet.clone()))
            .collect();
        RouterOutputs {
            outbound,
            delivered: Vec::new(),
        }
    }

    fn build_graph(&self) -> Graph {
        let mut cfg: BTreeMap<String, Vec<String>> = self
            .lsdb
            .records()
            .map(|(origin, _seq, neighbors)| (origin.to_string(), neighbors.to_vec()))
            .collect();
        cfg.entry(self.self_id.clone())
            .or_insert_with(|| self.neighbors.clone());
        Graph::from_topology(&cfg)
    }
}

impl Router for LinkStateRouter {
    fn name(&self) -> &'static str {
        "link_state"
    }

    fn on_start(&mut self, ctx: &RouterContext) -> RouterOutputs {
        self.flood_own_lsa(ctx)
    }

    fn on_timer(&mut self, ctx: &RouterContext) -> RouterOutputs {
        let due = ctx.now_ms - self.last_flooded_ms >= LSA_INTERVAL.as_millis() as i64;
        if !due {
            return RouterOutputs::default();
        }
        self.flood_own_lsa(ctx)
    }

    fn on_packet(&mut self, ctx: &RouterContext, packet: Packet) -> RouterOutputs {
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
            return RouterOutputs::single_send(packet.from.clone(), echo);
        }
        if packet.ptype == PacketType::Echo {
            debug!(from = %packet.from, "echo received");
            return RouterOutputs::default();
        }

        match &packet.payload {
            PacketPayload::Lsa(neighbors) => {
                let origin = packet.from.clone();
                let seq = packet.header_seq().unwrap_or(0);
                if !self.lsdb.upsert(&origin, seq, neighbors.clone()) {
                    debug!(%origin, seq, "drop stale or duplicate lsa");
                    return RouterOutputs::default();
                }
                info!(%origin, seq, ?neighbors, "lsdb updated");

                let from = packet.from.clone();
                let outbound = self
                    .neighbors
                    .iter()
                    .filter(|neighbor| **neighbor != from)
                    .map(|neighbor| {
                        let mut forwarded = packet.clone();
                        forwarded.from = ctx.self_id.to_string();
                        (neighbor.clone(), forwarded)
                    })
                    .collect();
                RouterOutputs {
                    outbound,
                    delivered: Vec::new(),
                }
            }
            _ => {
                if packet.is_for(ctx.self_id) {
                    info!(from = %packet.from, "message delivered");
                    return RouterOutputs {
                        outbound: Vec::new(),
                        delivered: vec![packet],
                    };
                }
                let Some(next_hop) = self.route(&packet.to) else {
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
        let Some(next_hop) = self.route(dest) else {
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
        let graph = self.build_graph();
        if !graph.contains(dest) {
            return None;
        }
        let result = model::dijkstra(&graph, &self.self_id).ok()?;
        model::build_next_hop(&result.prev, &self.self_id).remove(dest)
    }

    fn routes(&self) -> Vec<(String, String)> {
        let graph = self.build_graph();
        let Ok(result) = model::dijkstra(&graph, &self.self_id) else {
            return Vec::new();
        };
        model::build_next_hop(&result.prev, &self.self_id)
            .into_iter()
            .collect()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx<'a>(self_id: &'a str, neighbors: &'a [String], now_ms: i64) -> RouterContext<'a> {
        RouterContext {
            self_id,
            neighbors,
            now_ms,
            proto: Proto::Lsr,
        }
    }

    #[test]
    fn on_start_floods_lsa_to_all_neighbors() {
        let neighbors = vec!["B".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors.clone());
        let outputs = router.on_start(&ctx("A", &neighbors, 0));
        assert_eq!(outputs.outbound.len(), 1);
        assert_eq!(outputs.outbound[0].0, "B");
    }

    #[test]
    fn stale_lsa_is_dropped_and_not_reflooded() {
        let neighbors = vec!["B".to_string(), "C".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors.clone());

        let lsa = Packet::new(
            Proto::Lsr,
            PacketType::Lsa,
            "B",
            BROADCAST,
            1,
            PacketPayload::Lsa(vec!["A".to_string()]),
            0,
        )
        .with_header_seq(5);

        let first = router.on_packet(&ctx("A", &neighbors, 0), lsa.clone());
        assert_eq!(first.outbound.len(), 1);

        let second = router.on_packet(&ctx("A", &neighbors, 0), lsa);
        assert!(second.outbound.is_empty());
    }

    #[test]
    fn routes_message_via_dijkstra_next_hop() {
        let neighbors_a = vec!["B".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors_a.clone());
        router.on_start(&ctx("A", &neighbors_a, 0));

        let lsa_b = Packet::new(
            Proto::Lsr,
            PacketType::Lsa,
            "B",
            BROADCAST,
            1,
            PacketPayload::Lsa(vec!["A".to_string(), "C".to_string()]),
            0,
        )
        .with_header_seq(1);
        router.on_packet(&ctx("A", &neighbors_a, 0), lsa_b);

        let lsa_c = Packet::new(
            Proto::Lsr,
            PacketType::Lsa,
            "C",
            BROADCAST,
            1,
            PacketPayload::Lsa(vec!["B".to_string()]),
            0,
        )
        .with_header_seq(1);
        router.on_packet(&ctx("A", &neighbors_a, 0), lsa_c);

        assert_eq!(router.route("C"), Some("B".to_string()));
    }

    #[test]
    fn routes_reports_every_reachable_destination() {
        let neighbors_a = vec!["B".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors_a.clone());
        router.on_start(&ctx("A", &neighbors_a, 0));

        let lsa_b = Packet::new(
            Proto::Lsr,
            PacketType::Lsa,
            "B",
            BROADCAST,
            1,
            PacketPayload::Lsa(vec!["A".to_string(), "C".to_string()]),
            0,
        )
        .with_header_seq(1);
        router.on_packet(&ctx("A", &neighbors_a, 0), lsa_b);

        let routes = router.routes();
        assert!(routes.contains(&("B".to_string(), "B".to_string())));
        assert!(routes.contains(&("C".to_string(), "B".to_string())));
    }

    #[test]
    fn hello_gets_a_one_hop_echo_reply() {
        let neighbors = vec!["B".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors.clone());
        let hello = Packet::new(Proto::Lsr, PacketType::Hello, "B", "A", 1, PacketPayload::None, 0);
        let outputs = router.on_packet(&ctx("A", &neighbors, 0), hello);
        assert_eq!(outputs.outbound.len(), 1);
        assert_eq!(outputs.outbound[0].0, "B");
        assert_eq!(outputs.outbound[0].1.ptype, PacketType::Echo);
    }

    #[test]
    fn ping_originates_a_hello_to_the_given_neighbor() {
        let neighbors = vec!["B".to_string()];
        let mut router = LinkStateRouter::new("A", neighbors.clone());
        let outputs = router.ping(&ctx("A", &neighbors, 0), "B");
        assert_eq!(outputs.outbound.len(), 1);
        assert_eq!(outputs.outbound[0].1.ptype, PacketType::Hello);
    }
}
