use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::model::{PacketPayload, Proto};
use crate::routers::{Router, RouterContext};
use crate::transport::Transport;

const LISTEN_POLL: Duration = Duration::from_millis(500);
const TICK_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_SEND_TTL: i64 = 10;

/// Drives one simulated router: a transport handle, a chosen routing
/// strategy, and three long-lived threads (listener, ticker, and an
/// interactive control shell) sharing a single `Mutex`-protected router.
/// Critical sections stay small: lock, mutate state, copy out whatever
/// needs to go over the transport, release, then do the I/O.
pub struct Node {
    self_id: String,
    neighbors: Vec<String>,
    proto: Proto,
    transport: Arc<dyn Transport>,
    router: Arc<Mutex<Box<dyn Router>>>,
    stop: Arc<AtomicBool>,
    start: Instant,
}

impl Node {
    pub fn new(
        self_id: impl Into<String>,
        neighbors: Vec<String>,
        proto: Proto,
        transport: Arc<dyn Transport>,
        router: Box<dyn Router>,
    ) -> Self {
        Self {
            self_id: self_id.into(),
            neighbors,
            proto,
            transport,
            router: Arc::new(Mutex::new(router)),
            stop: Arc::new(AtomicBool::new(false)),
            start: Instant::now(),
        }
    }

    fn now_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    fn context(&self) -> RouterContext<'_> {
        RouterContext {
            self_id: &self.self_id,
            neighbors: &self.neighbors,
            now_ms: self.now_ms(),
            proto: self.proto,
        }
    }

    fn publish_outbound(&self, outbound: Vec<(String, crate::model::Packet)>) {
        for (channel, packet) in outbound {
            if let Err(err) = self.transport.publish(&channel, &packet) {
                warn!(%channel, %err, "failed to publish packet");
            }
        }
    }

    /// Installs the `ctrlc` handler, starts the router, and runs the
    /// listener/ticker/control-shell threads until stopped.
    pub fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let stop = Arc::clone(&self.stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        })?;

        {
            let ctx = self.context();
            let mut router = self.router.lock().expect("router mutex poisoned");
            let outputs = router.on_start(&ctx);
            drop(router);
            self.publish_outbound(outputs.outbound);
        }

        let listener = {
            let node = Arc::clone(&self);
            thread::spawn(move || node.listen_loop())
        };
        let ticker = {
            let node = Arc::clone(&self);
            thread::spawn(move || node.tick_loop())
        };
        // The shell thread is intentionally not joined: it parks inside a
        // blocking read on stdin between commands, so it only notices the
        // stop flag once another line (or EOF) arrives. Waiting on it here
        // would mean a `ctrlc`-triggered stop never actually returns control
        // to the caller. `exit` itself breaks the shell loop directly; for
        // every other stop source, the process exits and takes the
        // still-parked shell thread down with it once `run` returns.
        {
            let node = Arc::clone(&self);
            thread::spawn(move || node.shell_loop());
        }

        listener.join().expect("listener thread panicked");
        ticker.join().expect("ticker thread panicked");
        info!(node = %self.self_id, "node stopped");
        Ok(())
    }

    fn listen_loop(&self) {
        while !self.stop.load(Ordering::Relaxed) {
            match self.transport.recv(LISTEN_POLL) {
                Ok(Some(packet)) => {
                    let ctx = self.context();
                    let mut router = self.router.lock().expect("router mutex poisoned");
                    let outputs = router.on_packet(&ctx, packet);
                    drop(router);
                    for delivered in &outputs.delivered {
                        info!(node = %self.self_id, from = %delivered.from, "application delivery");
                    }
                    self.publish_outbound(outputs.outbound);
                }
                Ok(None) => {}
                Err(err) => warn!(node = %self.self_id, %err, "transport recv error"),
            }
        }
    }

    fn tick_loop(&self) {
        while !self.stop.load(Ordering::Relaxed) {
            thread::sleep(TICK_INTERVAL);
            let ctx = self.context();
            let mut router = self.router.lock().expect("router mutex poisoned");
            let outputs = router.on_timer(&ctx);
            drop(router);
            self.publish_outbound(outputs.outbound);
        }
    }

    fn shell_loop(&self) {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            if self.stop.load(Ordering::Relaxed) {
                break;
            }
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if !self.handle_command(line) {
                break;
            }
        }
    }

    /// Runs one shell command. Returns `false` when the shell should stop
    /// reading further input (the `exit` command), so `shell_loop` doesn't
    /// wait on another line of stdin before unblocking `run`'s join.
    fn handle_command(&self, line: &str) -> bool {
        let mut parts = line.splitn(3, ' ');
        match parts.next() {
            Some("send") => {
                let (Some(dest), Some(text)) = (parts.next(), parts.next()) else {
                    println!("usage: send <dest> <text>");
                    let _ = io::stdout().flush();
                    return true;
                };
                let ctx = self.context();
                let mut router = self.router.lock().expect("router mutex poisoned");
                let outputs = router.send(
                    &ctx,
                    dest,
                    PacketPayload::Text(text.to_string()),
                    DEFAULT_SEND_TTL,
                );
                drop(router);
                if outputs.outbound.is_empty() {
                    println!("no route to {dest}");
                } else {
                    self.publish_outbound(outputs.outbound);
                }
            }
            Some("peers") => {
                println!("{}", self.neighbors.join(", "));
            }
            Some("ping") => {
                let Some(neighbor) = parts.next() else {
                    println!("usage: ping <neighbor>");
                    let _ = io::stdout().flush();
                    return true;
                };
                let ctx = self.context();
                let mut router = self.router.lock().expect("router mutex poisoned");
                let outputs = router.ping(&ctx, neighbor);
                drop(router);
                self.publish_outbound(outputs.outbound);
            }
            Some("table") => {
                let router = self.router.lock().expect("router mutex poisoned");
                let mut routes = router.routes();
                drop(router);
                if routes.is_empty() {
                    println!("(no routing table for this protocol)");
                } else {
                    routes.sort();
                    for (dest, hop) in routes {
                        println!("{dest} via {hop}");
                    }
                }
            }
            Some("exit") => {
                self.stop.store(true, Ordering::Relaxed);
                let _ = io::stdout().flush();
                return false;
            }
            _ => println!("commands: send <dest> <text> | ping <neighbor> | peers | table | exit"),
        }
        let _ = io::stdout().flush();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Proto;
    use crate::routers::DistanceVectorRouter;
    use crate::transport::ChannelBus;

    fn test_node() -> Node {
        let bus = ChannelBus::new();
        let transport = bus.transport_for("A");
        let router = DistanceVectorRouter::new("A", vec!["B".to_string()]);
        Node::new(
            "A",
            vec!["B".to_string()],
            Proto::Dvr,
            Arc::new(transport),
            Box::new(router),
        )
    }

    #[test]
    fn exit_command_tells_the_shell_loop_to_stop_reading() {
        let node = test_node();
        assert!(!node.handle_command("exit"));
        assert!(node.stop.load(Ordering::Relaxed));
    }

    #[test]
    fn other_commands_tell_the_shell_loop_to_keep_reading() {
        let node = test_node();
        assert!(node.handle_command("peers"));
        assert!(node.handle_command("table"));
        assert!(node.handle_command("bogus"));
        assert!(!node.stop.load(Ordering::Relaxed));
    }
}
