use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouteLabError};

/// The broadcast destination literal used by flooding, LSAs, and DV table
/// advertisements.
pub const BROADCAST: &str = "all";

/// Informational protocol tag carried on every packet. Purely diagnostic:
/// routing behavior is decided by which `Router` a node runs, not by this
/// field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Proto {
    Dijkstra,
    Flooding,
    Lsr,
    Dvr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    Message,
    Hello,
    Echo,
    Info,
    Lsa,
    DvTable,
}

/// Type-specific payload body. Every `Packet` carries exactly one variant,
/// matching `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketPayload {
    DvTable(BTreeMap<String, i64>),
    Lsa(Vec<String>),
    Text(String),
    None,
    // Catch-all: must stay last, since `serde_json::Value` deserializes
    // from any JSON shape and would otherwise shadow the more specific
    // variants above.
    Info(serde_json::Value),
}

/// A single small key -> string header map, e.g. `{"ttl": "9"}` or
/// `{"seq": "3"}`.
pub type Header = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub proto: Proto,
    #[serde(rename = "type")]
    pub ptype: PacketType,
    pub from: String,
    /// Destination node id, or [`BROADCAST`] for "all".
    pub to: String,
    pub ttl: i64,
    #[serde(default)]
    pub hops: u32,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub payload: PacketPayload,
    pub ts: i64,
}

impl Packet {
    pub fn new(
        proto: Proto,
        ptype: PacketType,
        from: impl Into<String>,
        to: impl Into<String>,
        ttl: i64,
        payload: PacketPayload,
        ts: i64,
    ) -> Self {
        Self {
            proto,
            ptype,
            from: from.into(),
            to: to.into(),
            ttl,
            hops: 0,
            headers: Vec::new(),
            payload,
            ts,
        }
    }

    pub fn is_broadcast(&self) -> bool {
        self.to == BROADCAST
    }

    pub fn is_for(&self, node_id: &str) -> bool {
        self.to == node_id
    }

    /// Header-level TTL as stored by the flooding router, at the
    /// historical `headers[0]["ttl"]` location (decimal string).
    pub fn header_ttl(&self) -> Option<i64> {
        self.headers
            .iter()
            .find_map(|header| header.get("ttl"))
            .and_then(|raw| raw.parse::<i64>().ok())
    }

    pub fn set_header_ttl(&mut self, ttl: i64) {
        if let Some(header) = self.headers.iter_mut().find(|h| h.contains_key("ttl")) {
            header.insert("ttl".to_string(), ttl.to_string());
        } else {
            let mut header = Header::new();
            header.insert("ttl".to_string(), ttl.to_string());
            self.headers.insert(0, header);
        }
    }

    pub fn header_seq(&self) -> Option<i64> {
        self.headers
            .iter()
            .find_map(|header| header.get("seq"))
            .and_then(|raw| raw.parse::<i64>().ok())
    }

    pub fn with_header_seq(mut self, seq: i64) -> Self {
        let mut header = Header::new();
        header.insert("seq".to_string(), seq.to_string());
        self.headers = vec![header];
        self
    }

    /// Flood/seen-set identity: `(most recent forwarder, origination ts)`.
    pub fn flood_id(&self) -> (String, i64) {
        (self.from.clone(), self.ts)
    }
}

/// Serialize to UTF-8 JSON with a trailing newline.
pub fn encode(packet: &Packet) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec(packet)
        .map_err(|err| RouteLabError::MalformedPacket(err.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a packet, tolerating an optional trailing `\n`/`\r\n` (the
/// pub/sub transport may omit it; the direct-TCP transport always
/// includes it for line framing).
pub fn decode(bytes: &[u8]) -> Result<Packet> {
    let trimmed = bytes
        .strip_suffix(b"\r\n")
        .or_else(|| bytes.strip_suffix(b"\n"))
        .unwrap_or(bytes);
    serde_json::from_slice(trimmed).map_err(|err| RouteLabError::MalformedPacket(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> Packet {
        let mut pkt = Packet::new(
            Proto::Flooding,
            PacketType::Message,
            "A",
            "E",
            10,
            PacketPayload::Text("hello".to_string()),
            1_700_000_000_000,
        );
        pkt.set_header_ttl(10);
        pkt
    }

    #[test]
    fn decode_encode_roundtrip() {
        let pkt = sample_packet();
        let bytes = encode(&pkt).expect("encode should succeed");
        let decoded = decode(&bytes).expect("decode should succeed");
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn decode_tolerates_missing_trailing_newline() {
        let pkt = sample_packet();
        let mut bytes = encode(&pkt).expect("encode should succeed");
        assert_eq!(bytes.pop(), Some(b'\n'));
        let decoded = decode(&bytes).expect("decode should succeed without trailing newline");
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn decode_rejects_malformed_json() {
        let err = decode(b"not json").unwrap_err();
        assert!(matches!(err, RouteLabError::MalformedPacket(_)));
    }

    #[test]
    fn broadcast_destination_is_recognized() {
        let pkt = Packet::new(
            Proto::Lsr,
            PacketType::Lsa,
            "A",
            BROADCAST,
            1,
            PacketPayload::Lsa(vec!["B".to_string()]),
            0,
        );
        assert!(pkt.is_broadcast());
        assert!(!pkt.is_for("A"));
    }

    #[test]
    fn header_ttl_round_trips_through_headers() {
        let mut pkt = sample_packet();
        assert_eq!(pkt.header_ttl(), Some(10));
        pkt.set_header_ttl(3);
        assert_eq!(pkt.header_ttl(), Some(3));
        assert_eq!(pkt.headers.len(), 1);
    }
}
