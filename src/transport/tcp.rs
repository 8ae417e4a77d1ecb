use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};

use crate::error::{Result, RouteLabError};
use crate::model::{self, Packet};
use crate::transport::Transport;

/// Direct point-to-point transport: one short-lived outbound TCP
/// connection per `publish`, carrying a single newline-delimited JSON
/// packet, and a listener accepting inbound connections one at a time.
pub struct TcpTransport {
    listener: TcpListener,
    addresses: BTreeMap<String, String>,
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl TcpTransport {
    /// Binds the listener on `addresses[self_id]` and remembers every
    /// peer address for outbound `publish` calls.
    pub fn bind(self_id: &str, addresses: BTreeMap<String, String>) -> Result<Self> {
        let own_address = addresses
            .get(self_id)
            .ok_or_else(|| RouteLabError::UnknownNode(self_id.to_string()))?;
        let listener = TcpListener::bind(own_address)
            .map_err(|err| RouteLabError::Transport(format!("bind {own_address}: {err}")))?;
        listener
            .set_nonblocking(true)
            .map_err(|err| RouteLabError::Transport(err.to_string()))?;
        Ok(Self {
            listener,
            addresses,
        })
    }

    fn accept_with_timeout(&self, timeout: Duration) -> Result<Option<TcpStream>> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => return Ok(Some(stream)),
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    if Instant::now() >= deadline {
                        return Ok(None);
                    }
                    std::thread::sleep(POLL_INTERVAL.min(deadline - Instant::now()));
                }
                Err(err) => return Err(RouteLabError::Transport(err.to_string())),
            }
        }
    }
}

impl Transport for TcpTransport {
    fn publish(&self, channel: &str, packet: &Packet) -> Result<()> {
        let address = self
            .addresses
            .get(channel)
            .ok_or_else(|| RouteLabError::UnknownNode(channel.to_string()))?;
        let mut stream = TcpStream::connect(address)
            .map_err(|err| RouteLabError::Transport(format!("connect {address}: {err}")))?;
        let bytes = model::encode(packet)?;
        stream
            .write_all(&bytes)
            .map_err(|err| RouteLabError::Transport(err.to_string()))?;
        Ok(())
    }

    fn recv(&self, timeout: Duration) -> Result<Option<Packet>> {
        let Some(stream) = self.accept_with_timeout(timeout)? else {
            return Ok(None);
        };
        let mut line = String::new();
        BufReader::new(stream)
            .read_line(&mut line)
            .map_err(|err| RouteLabError::Transport(err.to_string()))?;
        if line.is_empty() {
            return Ok(None);
        }
        model::decode(line.as_bytes()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PacketPayload, PacketType, Proto};

    fn addr_book(a: &str, b: &str) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("A".to_string(), a.to_string());
        map.insert("B".to_string(), b.to_string());
        map
    }

    fn sample_packet() -> Packet {
        Packet::new(
            Proto::Flooding,
            PacketType::Message,
            "A",
            "B",
            10,
            PacketPayload::Text("hi".to_string()),
            1,
        )
    }

    #[test]
    fn publish_then_recv_round_trips_over_loopback() {
        let a = TcpTransport::bind("A", addr_book("127.0.0.1:0", "127.0.0.1:0")).expect("bind A");
        let a_port = a.listener.local_addr().expect("local addr").port();

        let b = TcpTransport::bind("B", addr_book("127.0.0.1:0", "127.0.0.1:0")).expect("bind B");
        let b_port = b.listener.local_addr().expect("local addr").port();

        let addresses = {
            let mut map = BTreeMap::new();
            map.insert("A".to_string(), format!("127.0.0.1:{a_port}"));
            map.insert("B".to_string(), format!("127.0.0.1:{b_port}"));
            map
        };
        let a = TcpTransport {
            listener: a.listener,
            addresses: addresses.clone(),
        };
        let b = TcpTransport {
            listener: b.listener,
            addresses,
        };

        a.publish("B", &sample_packet()).expect("publish ok");
        let received = b
            .recv(Duration::from_secs(2))
            .expect("recv ok")
            .expect("packet arrives");
        assert_eq!(received.from, "A");
    }

    #[test]
    fn recv_times_out_with_no_connection() {
        let t = TcpTransport::bind("A", addr_book("127.0.0.1:0", "127.0.0.1:0")).expect("bind A");
        let result = t.recv(Duration::from_millis(150)).expect("recv ok");
        assert!(result.is_none());
    }
}
