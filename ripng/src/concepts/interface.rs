use std::net::Ipv6Addr;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

use crate::topology::InterfaceId;

/// A router's own view of one of its interfaces, this is all the routing engine knows about the topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalInterface {
    pub id: InterfaceId,
    /// the address of this interface, used as the next hop by neighbours
    pub address: Ipv6Addr,
    /// the directly connected network
    pub prefix: Ipv6Net,
    /// administrative cost added to every metric received on this interface, 1..INFINITY
    pub cost: u8,
    /// excluded interfaces forward traffic but never send or accept advertisements
    pub excluded: bool,
    pub up: bool,
}

impl LocalInterface {
    /// whether advertisements are sent and accepted on this interface
    pub fn speaks_protocol(&self) -> bool {
        self.up && !self.excluded
    }
}
