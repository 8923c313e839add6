use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

use crate::topology::InterfaceId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Packet {
    /// asks the neighbour for its whole table, answered immediately with a response
    Request,
    /// a full (periodic, or answering a request) or partial (triggered) view of the sender's table
    Response { routes: Vec<RouteUpdate> },
}

/// A single route table entry as it travels on the wire. The fields are kept raw so a receiver can reject malformed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteUpdate {
    pub prefix: Ipv6Addr,
    pub prefix_len: u8,
    /// the metric in the sender's table, or INFINITY for an unreachable destination
    pub metric: u8,
}

impl Display for RouteUpdate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} metric {}", self.prefix, self.prefix_len, self.metric)
    }
}

/// A protocol datagram waiting to be sent by the link model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundPacket {
    /// send via this interface
    pub itf: InterfaceId,
    pub packet: Packet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataKind {
    EchoRequest,
    EchoReply,
    /// sent back to the origin of packet `original` when no route was found
    DestinationUnreachable { original: u64 },
}

/// Traffic forwarded by routers, as generated by the probing application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataPacket {
    /// echo sequence number, replies and notifications carry the one of the request
    pub id: u64,
    pub kind: DataKind,
    pub source: Ipv6Addr,
    pub destination: Ipv6Addr,
    pub hop_limit: u8,
}

impl DataPacket {
    pub const DEFAULT_HOP_LIMIT: u8 = 64;

    pub fn echo_request(id: u64, source: Ipv6Addr, destination: Ipv6Addr) -> Self {
        Self {
            id,
            kind: DataKind::EchoRequest,
            source,
            destination,
            hop_limit: Self::DEFAULT_HOP_LIMIT,
        }
    }

    pub fn reply(&self) -> Self {
        Self {
            id: self.id,
            kind: DataKind::EchoReply,
            source: self.destination,
            destination: self.source,
            hop_limit: Self::DEFAULT_HOP_LIMIT,
        }
    }

    /// builds the notification a router sends back to the origin of this packet
    pub fn unreachable(&self, router: Ipv6Addr) -> Self {
        Self {
            id: self.id,
            kind: DataKind::DestinationUnreachable { original: self.id },
            source: router,
            destination: self.source,
            hop_limit: Self::DEFAULT_HOP_LIMIT,
        }
    }
}
