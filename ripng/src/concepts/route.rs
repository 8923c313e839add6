use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

use crate::framework::INFINITY;
use crate::topology::InterfaceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteState {
    /// usable, metric below INFINITY
    Valid,
    /// poisoned, metric is INFINITY. Kept until garbage collected so the withdrawal gets advertised
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub prefix: Ipv6Net,
    /// the metric with which this route is known, INFINITY once invalidated
    pub metric: u8,
    /// the neighbour address this route was learned from, None for directly connected networks
    pub next_hop: Option<Ipv6Addr>,
    /// the interface this route was learned from, or the interface the network is attached to
    pub interface: InterfaceId,
    pub state: RouteState,
    /// bumped on every accepted update, timers armed with an older generation are stale
    pub generation: u64,
    /// route change flag, set until the change went out in an advertisement
    pub changed: bool,
}

impl RouteEntry {
    pub fn is_valid(&self) -> bool {
        self.state == RouteState::Valid
    }

    pub fn is_connected(&self) -> bool {
        self.next_hop.is_none()
    }

    pub(crate) fn poison(&mut self, generation: u64) {
        self.metric = INFINITY;
        self.state = RouteState::Invalid;
        self.generation = generation;
        self.changed = true;
    }
}

impl Display for RouteEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let next_hop = match self.next_hop {
            Some(addr) => addr.to_string(),
            None => "::".to_string(),
        };
        let flags = match (self.state, self.is_connected()) {
            (RouteState::Valid, true) => "U",
            (RouteState::Valid, false) => "UG",
            (RouteState::Invalid, _) => "-",
        };
        write!(
            f,
            "{:<22} {:<26} {:<5} {:<3} {}",
            self.prefix.to_string(),
            next_hop,
            flags,
            self.metric,
            self.interface
        )
    }
}
