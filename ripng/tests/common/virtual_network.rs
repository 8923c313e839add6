use std::net::Ipv6Addr;
use std::time::Duration;

use ipnet::Ipv6Net;
use ripng::concepts::route::RouteEntry;
use ripng::config::ScenarioConfig;
use ripng::simulation::{Simulation, TrafficRecord};
use ripng::topology::{LinkId, NodeId};

/// A simulation addressed by node names, for readable assertions.
pub struct VirtualNetwork {
    pub sim: Simulation,
}

impl VirtualNetwork {
    pub fn create(config: &ScenarioConfig) -> VirtualNetwork {
        VirtualNetwork {
            sim: config.build().unwrap_or_else(|err| panic!("invalid scenario: {err}")),
        }
    }

    pub fn node(&self, name: &str) -> NodeId {
        self.sim
            .topology()
            .find_node(name)
            .unwrap_or_else(|| panic!("No node {name} found"))
    }

    pub fn link(&self, a: &str, b: &str) -> LinkId {
        self.sim
            .topology()
            .link_between(self.node(a), self.node(b))
            .unwrap_or_else(|| panic!("No link between {a} and {b}"))
    }

    pub fn run_secs(&mut self, secs: u64) {
        self.sim.run_until(Duration::from_secs(secs));
    }

    /// schedules a link failure, both ends notice at exactly `secs`
    pub fn tear_down(&mut self, secs: u64, a: &str, b: &str) {
        let link = self.link(a, b);
        self.sim
            .schedule_link_state(Duration::from_secs(secs), link, false)
            .unwrap();
    }

    pub fn restore(&mut self, secs: u64, a: &str, b: &str) {
        let link = self.link(a, b);
        self.sim
            .schedule_link_state(Duration::from_secs(secs), link, true)
            .unwrap();
    }

    pub fn probe(&mut self, millis: u64, node: &str, source: &str, destination: &str) -> u64 {
        let node = self.node(node);
        self.sim
            .send_probe(
                Duration::from_millis(millis),
                node,
                source.parse().unwrap(),
                destination.parse().unwrap(),
            )
            .unwrap()
    }

    /// the entry for an exact prefix, whatever its state
    pub fn get_route(&self, cur: &str, prefix: &str) -> Option<&RouteEntry> {
        let prefix: Ipv6Net = prefix.parse().unwrap();
        self.sim.router(self.node(cur)).route(&prefix)
    }

    fn lookup(&self, cur: &str, dst: &str) -> &RouteEntry {
        let destination: Ipv6Addr = dst.parse().unwrap();
        self.sim
            .lookup(self.node(cur), destination)
            .unwrap_or_else(|| panic!("No route found to {dst} at {cur}"))
    }

    pub fn has_route(&self, cur: &str, dst: &str) -> bool {
        let destination: Ipv6Addr = dst.parse().unwrap();
        self.sim.lookup(self.node(cur), destination).is_some()
    }

    pub fn get_metric_to(&self, cur: &str, dst: &str) -> u8 {
        self.lookup(cur, dst).metric
    }

    /// name of the neighbour the route to `dst` points at, `cur` itself for connected networks
    pub fn get_next_hop(&self, cur: &str, dst: &str) -> String {
        match self.lookup(cur, dst).next_hop {
            Some(addr) => {
                let owner = self
                    .sim
                    .topology()
                    .owner_of(addr)
                    .unwrap_or_else(|| panic!("next hop {addr} is not a router"));
                self.sim.topology().name(owner).to_string()
            }
            None => cur.to_string(),
        }
    }

    pub fn traffic_at(&self, node: &str) -> Vec<TrafficRecord> {
        let node = self.node(node);
        self.sim
            .traffic()
            .iter()
            .filter(|record| record.node == node)
            .cloned()
            .collect()
    }
}
