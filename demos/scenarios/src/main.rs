use std::collections::BTreeSet;
use std::fs;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use log::{info, warn, LevelFilter};
use ripng::concepts::packet::DataKind;
use ripng::config::ScenarioConfig;
use ripng::framework::SplitHorizon;
use ripng::simulation::{Forwarding, Simulation};
use ripng::util::Secs;
use simplelog::*;

const SQUARE: &str = include_str!("../topologies/square.json");
const DIAMOND: &str = include_str!("../topologies/diamond.json");

/// Runs RIPng over a simulated network and pings across it while links fail.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// `square`, `diamond` or the path of a JSON scenario
    #[arg(default_value = "square")]
    scenario: String,
    /// NoSplitHorizon, SplitHorizon or PoisonReverse, overrides the scenario
    #[arg(long)]
    split_horizon: Option<SplitHorizon>,
    /// overrides the scenario seed
    #[arg(long)]
    seed: Option<u64>,
    /// -v logs every routing decision, -vv also dumps every datagram
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// log every echo reply and unreachable notification
    #[arg(long)]
    show_pings: bool,
    /// print all routing tables at the times listed in the scenario
    #[arg(long)]
    print_routing_tables: bool,
}

fn load(scenario: &str) -> anyhow::Result<ScenarioConfig> {
    let json = match scenario {
        "square" => SQUARE.to_string(),
        "diamond" => DIAMOND.to_string(),
        path => fs::read_to_string(path).with_context(|| format!("cannot read scenario {path}"))?,
    };
    Ok(ScenarioConfig::from_json(&json)?)
}

fn print_tables(sim: &Simulation) {
    for router in sim.routers() {
        println!("Node: {}, Time: {}, RIPng routing table", router.name, Secs(sim.now()).to_string().trim());
        println!("{}", router.table);
    }
}

/// Echo sequence numbers that never got a reply, grouped into consecutive runs.
fn outages(sent: u64, answered: &BTreeSet<u64>) -> Vec<(u64, u64)> {
    let mut runs: Vec<(u64, u64)> = Vec::new();
    for id in (0..sent).filter(|id| !answered.contains(id)) {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == id => *end = id,
            _ => runs.push((id, id)),
        }
    }
    runs
}

fn report_pings(sim: &Simulation, config: &ScenarioConfig, show: bool) {
    let Some(probe) = &config.probes else {
        return;
    };
    let mut answered = BTreeSet::new();
    for record in sim.traffic() {
        match (record.packet.kind, record.outcome) {
            (DataKind::EchoReply, Forwarding::Delivered) => {
                answered.insert(record.packet.id);
                if show {
                    info!("{} reply from {} for echo {}", Secs(record.at), record.packet.source, record.packet.id);
                }
            }
            (DataKind::DestinationUnreachable { original }, Forwarding::Delivered) if show => {
                info!("{} {} reports echo {original} as unreachable", Secs(record.at), record.packet.source);
            }
            _ => {}
        }
    }

    println!("{}/{} echo requests answered", answered.len(), probe.count);
    let sent_at = |id: u64| Duration::from_millis(probe.start_ms + id * probe.interval_ms);
    for (first, last) in outages(probe.count, &answered) {
        println!(
            "no replies for echo {first} to {last}, sent between {} and {}",
            Secs(sent_at(first)),
            Secs(sent_at(last))
        );
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;

    let mut config = load(&args.scenario)?;
    if let Some(split_horizon) = args.split_horizon {
        config.params.split_horizon = split_horizon;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    info!(
        "Running {} with {} routers, split horizon strategy {}",
        args.scenario,
        config.nodes.len(),
        config.params.split_horizon
    );

    let mut sim = config.build()?;
    let mut checkpoints: BTreeSet<Duration> = BTreeSet::new();
    if args.print_routing_tables {
        checkpoints.extend(config.print_tables_at_ms.iter().map(|ms| Duration::from_millis(*ms)));
    }
    checkpoints.retain(|at| *at <= config.stop());
    for at in checkpoints {
        sim.run_until(at);
        print_tables(&sim);
    }
    sim.run_until(config.stop());

    if config.probes.is_none() {
        warn!("scenario sends no echo requests, nothing to report");
    }
    report_pings(&sim, &config, args.show_pings);
    info!("Simulation stopped at {}", Secs(sim.now()));
    Ok(())
}
