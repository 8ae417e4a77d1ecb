pub mod graph;
pub mod packet;
pub mod state;

pub use graph::{dijkstra, build_next_hop, DijkstraResult, Graph};
pub use packet::{decode, encode, Header, Packet, PacketPayload, PacketType, Proto, BROADCAST};
pub use state::{DvTable, Lsdb, SeenSet, INF};
