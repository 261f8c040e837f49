use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tokio::runtime::Builder;

use lsr_core::config::{LinkConfig, RouterSpec, TopologyConfig};
use lsr_core::report::render_status;
use lsr_core::system::KernelRouteInstaller;
use lsr_core::{Network, Protocol};

#[derive(Parser)]
#[command(name = "lsr-sim", about = "Simulate a link-state routed topology in process")]
struct Cli {
    /// Topology JSON file. Defaults to a four-router OSPF ring.
    #[arg(long)]
    topology: Option<String>,

    /// Take a link down after convergence, given as A,B. Repeatable.
    #[arg(long = "fail-link", value_parser = parse_pair)]
    fail_links: Vec<(String, String)>,

    /// Print routing tables as JSON instead of the status report.
    #[arg(long)]
    json: bool,

    /// Run the hello and SPF schedulers for this many seconds before the
    /// final report.
    #[arg(long, default_value_t = 0)]
    run_for: u64,

    /// Log the kernel route commands each router would issue.
    #[arg(long)]
    kernel: bool,
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once(',') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("expected A,B but got {:?}", s)),
    }
}

fn ring_link(a: &str, b: &str, subnet: u8, cost: u32) -> Result<LinkConfig> {
    Ok(LinkConfig {
        a: a.to_string(),
        b: b.to_string(),
        interface_a: format!("eth-{}", b),
        interface_b: format!("eth-{}", a),
        address_a: format!("10.0.{}.1/30", subnet).parse()?,
        address_b: format!("10.0.{}.2/30", subnet).parse()?,
        cost,
    })
}

fn ring_topology() -> Result<TopologyConfig> {
    Ok(TopologyConfig {
        timers: Default::default(),
        routers: ["R1", "R2", "R3", "R4"]
            .iter()
            .map(|id| RouterSpec { id: id.to_string(), protocol: Protocol::Ospf })
            .collect(),
        links: vec![
            ring_link("R1", "R2", 1, 10)?,
            ring_link("R2", "R3", 2, 10)?,
            ring_link("R3", "R4", 3, 10)?,
            ring_link("R4", "R1", 4, 100)?,
        ],
    })
}

async fn print_tables(network: &Network, json: bool) -> Result<()> {
    for router in network.routers().await {
        let snapshot = router.snapshot().await;
        if json {
            let routes = serde_json::json!({
                "router": snapshot.id,
                "routes": snapshot.routing_table,
            });
            println!("{}", serde_json::to_string_pretty(&routes)?);
        } else {
            println!("{}", render_status(&snapshot));
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let topology = match &cli.topology {
        Some(path) => TopologyConfig::load(path)
            .with_context(|| format!("loading topology from {}", path))?,
        None => ring_topology()?,
    };
    topology.validate()?;

    let rt = Builder::new_multi_thread()
        .enable_all()
        .build()?;

    rt.block_on(async {
        let network = Network::with_timers(topology.timers.clone());
        for spec in &topology.routers {
            let router = network.add_router(spec.id.clone(), spec.protocol).await?;
            if cli.kernel {
                router.add_observer(Arc::new(KernelRouteInstaller::new())).await;
            }
        }
        network.connect_links(&topology.links).await?;
        network.recompute_all().await;
        info!("Topology converged: {} routers", topology.routers.len());

        for (a, b) in &cli.fail_links {
            network.link_down(a, b).await?;
        }
        if !cli.fail_links.is_empty() {
            network.recompute_all().await;
        }

        if cli.run_for > 0 {
            network.start_all().await;
            tokio::time::sleep(Duration::from_secs(cli.run_for)).await;
            network.stop_all().await;
        }

        print_tables(&network, cli.json).await
    })
}
