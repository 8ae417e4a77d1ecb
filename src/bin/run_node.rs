use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use routelab::config::{load_names, load_topology};
use routelab::model::Proto;
use routelab::node::Node;
use routelab::routers::{DistanceVectorRouter, FloodingRouter, LinkStateRouter, Router};
use routelab::transport::{TcpTransport, Transport};

#[derive(Debug, Parser)]
#[command(name = "run-node")]
#[command(about = "Run one node of a distributed routing laboratory")]
struct Args {
    /// This node's id, as it appears in the topology and names files.
    #[arg(long)]
    name: String,

    /// Path to the topology file (`{"type": "topo", "config": {...}}`).
    #[arg(long)]
    topo: PathBuf,

    /// Path to the names file (`{"type": "names", "config": {id: "host:port"}}`).
    #[arg(long)]
    names: PathBuf,

    /// Routing strategy to run.
    #[arg(long, value_enum)]
    algo: Algo,

    /// Informational protocol tag stamped on originated packets. Purely
    /// diagnostic — it never changes which router drives this node.
    /// Defaults to the tag conventionally associated with `--algo`.
    #[arg(long, value_enum)]
    proto: Option<CliProto>,

    /// Overrides the port from the names file, for running several
    /// nodes against one shared names file on localhost.
    #[arg(long)]
    bind_port: Option<u16>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
enum Algo {
    Flooding,
    Dv,
    #[value(name = "linkstate")]
    LinkState,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
#[value(rename_all = "snake_case")]
enum CliProto {
    Dijkstra,
    Flooding,
    Lsr,
    Dvr,
}

impl From<CliProto> for Proto {
    fn from(proto: CliProto) -> Self {
        match proto {
            CliProto::Dijkstra => Proto::Dijkstra,
            CliProto::Flooding => Proto::Flooding,
            CliProto::Lsr => Proto::Lsr,
            CliProto::Dvr => Proto::Dvr,
        }
    }
}

fn default_proto(algo: Algo) -> Proto {
    match algo {
        Algo::Flooding => Proto::Flooding,
        Algo::Dv => Proto::Dvr,
        Algo::LinkState => Proto::Lsr,
    }
}

/// Replaces the port in a `host:port` address, for `--bind-port`.
fn with_port(address: &str, port: u16) -> Result<String> {
    let host = address
        .rsplit_once(':')
        .map(|(host, _)| host)
        .with_context(|| format!("address {address} has no port to override"))?;
    Ok(format!("{host}:{port}"))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let topology = load_topology(&args.topo)
        .with_context(|| format!("loading topology from {}", args.topo.display()))?;
    let neighbors = topology
        .get(&args.name)
        .cloned()
        .with_context(|| format!("node {} not present in topology", args.name))?;

    let mut addresses = load_names(&args.names)
        .with_context(|| format!("loading names from {}", args.names.display()))?;
    if let Some(port) = args.bind_port {
        let own_address = addresses
            .get(&args.name)
            .with_context(|| format!("node {} not present in names file", args.name))?;
        addresses.insert(args.name.clone(), with_port(own_address, port)?);
    }

    let transport: Arc<dyn Transport> = Arc::new(TcpTransport::bind(&args.name, addresses)?);

    let router: Box<dyn Router> = match args.algo {
        Algo::Flooding => Box::new(FloodingRouter::new(neighbors.len())),
        Algo::Dv => Box::new(DistanceVectorRouter::new(&args.name, neighbors.clone())),
        Algo::LinkState => Box::new(LinkStateRouter::new(&args.name, neighbors.clone())),
    };

    let proto = args
        .proto
        .map(Proto::from)
        .unwrap_or_else(|| default_proto(args.algo));

    let node = Arc::new(Node::new(
        args.name.clone(),
        neighbors,
        proto,
        transport,
        router,
    ));
    node.run()
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}
