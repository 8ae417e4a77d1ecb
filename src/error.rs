use thiserror::Error;

/// Error taxonomy for routelab. `Config` is fatal at startup; every other
/// variant is recoverable and is logged-and-dropped at the listener
/// boundary or surfaced to the caller of `send_message`, never both.
#[derive(Debug, Error)]
pub enum RouteLabError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown node: {0}")]
    UnknownNode(String),

    #[error("no route to destination: {0}")]
    NoRoute(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    #[error("ttl exceeded")]
    TtlExceeded,

    #[error("stale lsa from {origin} (seq {seq} <= known {known})")]
    StaleLsa { origin: String, seq: i64, known: i64 },

    #[error("flood packet already seen: from={from} ts={ts}")]
    SeenFlood { from: String, ts: i64 },

    #[error("unknown dijkstra source: {0}")]
    UnknownSource(String),
}

pub type Result<T> = std::result::Result<T, RouteLabError>;
