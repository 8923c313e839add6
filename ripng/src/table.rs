use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

use crate::concepts::route::{RouteEntry, RouteState};
use crate::framework::INFINITY;
use crate::topology::InterfaceId;

/// A route offered by a neighbour, with the cost of the ingress interface already added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub prefix: Ipv6Net,
    pub metric: u8,
    pub next_hop: Ipv6Addr,
    pub interface: InterfaceId,
}

/// Result of offering a candidate to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Rejected,
    /// accepted from the current next hop without any change, restarts the timeout
    Refreshed { generation: u64 },
    /// metric, next hop or state changed
    Changed { generation: u64, state: RouteState },
}

/// The routes of a single node, at most one entry per prefix.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteTable {
    routes: BTreeMap<Ipv6Net, RouteEntry>,
    /// shared by all entries so a re-created prefix never reuses a generation
    generation: u64,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn get(&self, prefix: &Ipv6Net) -> Option<&RouteEntry> {
        self.routes.get(prefix)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RouteEntry> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Longest prefix match over valid routes. Invalid routes are never used for forwarding.
    pub fn lookup(&self, destination: Ipv6Addr) -> Option<&RouteEntry> {
        self.routes
            .values()
            .filter(|route| route.is_valid() && route.prefix.contains(&destination))
            .max_by_key(|route| route.prefix.prefix_len())
    }

    /// (Re)installs a directly connected network, overriding whatever was known about the prefix.
    pub fn install_connected(&mut self, prefix: Ipv6Net, interface: InterfaceId, cost: u8) -> u64 {
        let generation = self.next_generation();
        self.routes.insert(
            prefix,
            RouteEntry {
                prefix,
                metric: cost,
                next_hop: None,
                interface,
                state: RouteState::Valid,
                generation,
                changed: true,
            },
        );
        generation
    }

    /// Distance-vector admission: accept a strictly better route, or anything coming from the
    /// current next hop since it is authoritative for that path.
    pub fn update(&mut self, candidate: Candidate) -> Admission {
        let metric = candidate.metric.min(INFINITY);
        let Some(entry) = self.routes.get(&candidate.prefix) else {
            if metric >= INFINITY {
                return Admission::Rejected;
            }
            let generation = self.next_generation();
            self.routes.insert(
                candidate.prefix,
                RouteEntry {
                    prefix: candidate.prefix,
                    metric,
                    next_hop: Some(candidate.next_hop),
                    interface: candidate.interface,
                    state: RouteState::Valid,
                    generation,
                    changed: true,
                },
            );
            return Admission::Changed {
                generation,
                state: RouteState::Valid,
            };
        };

        let same_path = entry.next_hop == Some(candidate.next_hop) && entry.interface == candidate.interface;
        if same_path {
            if metric >= INFINITY {
                if !entry.is_valid() {
                    // already poisoned, garbage collection keeps running
                    return Admission::Rejected;
                }
                let generation = self.next_generation();
                if let Some(entry) = self.routes.get_mut(&candidate.prefix) {
                    entry.poison(generation);
                }
                return Admission::Changed {
                    generation,
                    state: RouteState::Invalid,
                };
            }
            let differs = entry.metric != metric || !entry.is_valid();
            let generation = self.next_generation();
            let Some(entry) = self.routes.get_mut(&candidate.prefix) else {
                return Admission::Rejected;
            };
            entry.metric = metric;
            entry.state = RouteState::Valid;
            entry.generation = generation;
            if differs {
                entry.changed = true;
                Admission::Changed {
                    generation,
                    state: RouteState::Valid,
                }
            } else {
                Admission::Refreshed { generation }
            }
        } else if metric < entry.metric && !(entry.is_connected() && entry.is_valid()) {
            let generation = self.next_generation();
            self.routes.insert(
                candidate.prefix,
                RouteEntry {
                    prefix: candidate.prefix,
                    metric,
                    next_hop: Some(candidate.next_hop),
                    interface: candidate.interface,
                    state: RouteState::Valid,
                    generation,
                    changed: true,
                },
            );
            Admission::Changed {
                generation,
                state: RouteState::Valid,
            }
        } else {
            Admission::Rejected
        }
    }

    /// Poisons a valid route, returns the generation to arm garbage collection with.
    pub fn invalidate(&mut self, prefix: &Ipv6Net) -> Option<u64> {
        if !self.routes.get(prefix)?.is_valid() {
            return None;
        }
        let generation = self.next_generation();
        self.routes.get_mut(prefix)?.poison(generation);
        Some(generation)
    }

    /// Poisons every valid route learned from, or connected on, `interface`.
    pub fn invalidate_interface(&mut self, interface: InterfaceId) -> Vec<(Ipv6Net, u64)> {
        let affected: Vec<Ipv6Net> = self
            .routes
            .values()
            .filter(|route| route.interface == interface && route.is_valid())
            .map(|route| route.prefix)
            .collect();
        affected
            .into_iter()
            .filter_map(|prefix| self.invalidate(&prefix).map(|generation| (prefix, generation)))
            .collect()
    }

    /// Timeout expiry, only honoured while the route is still at the generation the timer was armed with.
    pub fn expire(&mut self, prefix: &Ipv6Net, generation: u64) -> Option<u64> {
        if self.routes.get(prefix)?.generation != generation {
            return None;
        }
        self.invalidate(prefix)
    }

    /// Garbage collection, removes the route if it stayed invalid since the timer was armed.
    pub fn collect(&mut self, prefix: &Ipv6Net, generation: u64) -> bool {
        match self.routes.get(prefix) {
            Some(route) if route.generation == generation && !route.is_valid() => {
                self.routes.remove(prefix);
                true
            }
            _ => false,
        }
    }

    pub fn has_changes(&self) -> bool {
        self.routes.values().any(|route| route.changed)
    }

    pub fn clear_changed(&mut self) {
        for route in self.routes.values_mut() {
            route.changed = false;
        }
    }
}

impl Display for RouteTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<22} {:<26} {:<5} {:<3} {}",
            "Destination", "Next Hop", "Flag", "Met", "If"
        )?;
        for route in self.routes.values() {
            writeln!(f, "{route}")?;
        }
        Ok(())
    }
}
