//! JSON scenario files: topology, protocol settings, failure schedule and probes.

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::time::Duration;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

use crate::feedback::ConfigError;
use crate::framework::ProtocolParams;
use crate::simulation::Simulation;
use crate::topology::{NodeId, Topology, TopologyBuilder};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub a: String,
    pub b: String,
    pub prefix: String,
    #[serde(default = "default_cost")]
    pub cost_a: i64,
    #[serde(default = "default_cost")]
    pub cost_b: i64,
    #[serde(default)]
    pub delay_ms: i64,
    /// names of the endpoints that do not run the protocol on this link
    #[serde(default)]
    pub excluded: Vec<String>,
}

/// A host-facing network attached to a router
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StubConfig {
    pub node: String,
    pub prefix: String,
    #[serde(default = "default_cost")]
    pub cost: i64,
    #[serde(default)]
    pub excluded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkEventConfig {
    pub at_ms: u64,
    pub a: String,
    pub b: String,
    pub up: bool,
}

/// `count` echo requests, one every `interval_ms`, from a host entering the network at `node`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub node: String,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub start_ms: u64,
    pub interval_ms: u64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub params: ProtocolParams,
    pub nodes: Vec<String>,
    pub links: Vec<LinkConfig>,
    #[serde(default)]
    pub stubs: Vec<StubConfig>,
    #[serde(default)]
    pub events: Vec<LinkEventConfig>,
    #[serde(default)]
    pub probes: Option<ProbeConfig>,
    /// routing tables are printed at these times
    #[serde(default)]
    pub print_tables_at_ms: Vec<u64>,
    pub stop_ms: u64,
}

fn default_cost() -> i64 {
    1
}

fn parse_prefix(prefix: &str) -> Result<Ipv6Net, ConfigError> {
    prefix.parse().map_err(|err: ipnet::AddrParseError| ConfigError::InvalidPrefix {
        prefix: prefix.to_string(),
        reason: err.to_string(),
    })
}

impl ScenarioConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn stop(&self) -> Duration {
        Duration::from_millis(self.stop_ms)
    }

    pub fn topology(&self) -> Result<Topology, ConfigError> {
        let mut builder = TopologyBuilder::default();
        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        for name in &self.nodes {
            ids.insert(name.as_str(), builder.add_node(name)?);
        }
        let node = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))
        };

        for (index, link) in self.links.iter().enumerate() {
            if link.delay_ms < 0 {
                return Err(ConfigError::NegativeDelay {
                    link: index,
                    delay_ms: link.delay_ms,
                });
            }
            let (a, b) = (node(&link.a)?, node(&link.b)?);
            let id = builder.add_link(
                a,
                b,
                parse_prefix(&link.prefix)?,
                Duration::from_millis(link.delay_ms as u64),
            )?;
            builder.set_cost(a, id, link.cost_a)?;
            builder.set_cost(b, id, link.cost_b)?;
            for name in &link.excluded {
                let end = node(name)?;
                let itf = builder.interface_on(end, id)?;
                builder.exclude(itf);
            }
        }
        for stub in &self.stubs {
            let itf = builder.add_stub(node(&stub.node)?, parse_prefix(&stub.prefix)?)?;
            builder.set_interface_cost(itf, stub.cost)?;
            if stub.excluded {
                builder.exclude(itf);
            }
        }
        Ok(builder.build())
    }

    /// Builds the simulation with the failure schedule and probes in place.
    pub fn build(&self) -> Result<Simulation, ConfigError> {
        let topology = self.topology()?;
        let mut events = Vec::new();
        for event in &self.events {
            let find = |name: &str| {
                topology
                    .find_node(name)
                    .ok_or_else(|| ConfigError::UnknownNode(name.to_string()))
            };
            let link = topology
                .link_between(find(&event.a)?, find(&event.b)?)
                .ok_or_else(|| ConfigError::UnknownLink {
                    a: event.a.clone(),
                    b: event.b.clone(),
                })?;
            events.push((Duration::from_millis(event.at_ms), link, event.up));
        }
        let probe_node = match &self.probes {
            Some(probe) => Some(
                topology
                    .find_node(&probe.node)
                    .ok_or_else(|| ConfigError::UnknownNode(probe.node.clone()))?,
            ),
            None => None,
        };

        let mut simulation = Simulation::new(topology, self.params.clone(), self.seed)?;
        // nothing has run yet, so none of these can lie in the past
        for (at, link, up) in events {
            simulation.schedule_link_state(at, link, up)?;
        }
        if let (Some(probe), Some(node)) = (&self.probes, probe_node) {
            for i in 0..probe.count {
                let at = i
                    .checked_mul(probe.interval_ms)
                    .and_then(|offset| offset.checked_add(probe.start_ms))
                    .ok_or(ConfigError::ProbeOverflow {
                        count: probe.count,
                        interval_ms: probe.interval_ms,
                    })?;
                simulation.send_probe(Duration::from_millis(at), node, probe.source, probe.destination)?;
            }
        }
        Ok(simulation)
    }
}
