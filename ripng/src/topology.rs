//! Nodes, interfaces and the links between them.
//!
//! Nodes, interfaces and links are addressed by opaque index handles into one explicit
//! [Topology] that is built once before the run and passed to every component.

use std::fmt::{Display, Formatter};
use std::net::Ipv6Addr;
use std::time::Duration;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

use crate::concepts::interface::LocalInterface;
use crate::feedback::ConfigError;
use crate::framework::INFINITY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InterfaceId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkId(pub usize);

impl Display for InterfaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "if{}", self.0)
    }
}

impl Display for LinkId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "link{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub interfaces: Vec<InterfaceId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interface {
    pub id: InterfaceId,
    pub node: NodeId,
    pub cost: u8,
    pub up: bool,
    pub excluded: bool,
    /// None for a stub network, hosts attached to it are reached through this interface
    pub link: Option<LinkId>,
    pub prefix: Ipv6Net,
    pub address: Ipv6Addr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    pub ends: [InterfaceId; 2],
    /// propagation delay, applied to every datagram crossing the link
    pub delay: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    nodes: Vec<Node>,
    interfaces: Vec<Interface>,
    links: Vec<Link>,
}

impl Topology {
    pub fn builder() -> TopologyBuilder {
        TopologyBuilder::default()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn interface(&self, id: InterfaceId) -> &Interface {
        &self.interfaces[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    /// the interface at the other end of the link, None for stub interfaces
    pub fn peer(&self, itf: InterfaceId) -> Option<InterfaceId> {
        let link = self.links.get(self.interface(itf).link?.0)?;
        link.ends.iter().copied().find(|end| *end != itf)
    }

    pub fn link_between(&self, a: NodeId, b: NodeId) -> Option<LinkId> {
        self.links
            .iter()
            .find(|link| {
                let [x, y] = link.ends.map(|e| self.interface(e).node);
                (x == a && y == b) || (x == b && y == a)
            })
            .map(|link| link.id)
    }

    /// a link is usable only when both of its ends are up
    pub fn link_usable(&self, link: LinkId) -> bool {
        self.link(link).ends.iter().all(|end| self.interface(*end).up)
    }

    pub fn set_interface_state(&mut self, itf: InterfaceId, up: bool) {
        self.interfaces[itf.0].up = up;
    }

    /// Sets both ends of a link up or down, returns the affected interfaces.
    pub fn set_link_state(&mut self, link: LinkId, up: bool) -> [InterfaceId; 2] {
        let ends = self.link(link).ends;
        for end in ends {
            self.set_interface_state(end, up);
        }
        ends
    }

    /// the node owning an interface address
    pub fn owner_of(&self, address: Ipv6Addr) -> Option<NodeId> {
        self.interfaces
            .iter()
            .find(|itf| itf.address == address)
            .map(|itf| itf.node)
    }

    /// the stub interface of `node` whose network contains `address`, i.e. a host attached to the node
    pub fn attached_stub(&self, node: NodeId, address: Ipv6Addr) -> Option<InterfaceId> {
        self.node(node)
            .interfaces
            .iter()
            .map(|id| self.interface(*id))
            .find(|itf| itf.link.is_none() && itf.up && itf.prefix.contains(&address))
            .map(|itf| itf.id)
    }

    /// everything the routing engine of `node` gets to know about the topology
    pub fn local_interfaces(&self, node: NodeId) -> Vec<LocalInterface> {
        self.node(node)
            .interfaces
            .iter()
            .map(|id| {
                let itf = self.interface(*id);
                LocalInterface {
                    id: itf.id,
                    address: itf.address,
                    prefix: itf.prefix,
                    cost: itf.cost,
                    excluded: itf.excluded,
                    up: itf.up,
                }
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct TopologyBuilder {
    nodes: Vec<Node>,
    interfaces: Vec<Interface>,
    links: Vec<Link>,
}

impl TopologyBuilder {
    pub fn add_node(&mut self, name: &str) -> Result<NodeId, ConfigError> {
        if self.nodes.iter().any(|n| n.name == name) {
            return Err(ConfigError::DuplicateNode(name.to_string()));
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            name: name.to_string(),
            interfaces: Vec::new(),
        });
        Ok(id)
    }

    fn add_interface(&mut self, node: NodeId, prefix: Ipv6Net, host: u128, link: Option<LinkId>) -> InterfaceId {
        let id = InterfaceId(self.interfaces.len());
        let address = Ipv6Addr::from(u128::from(prefix.network()) + host);
        self.interfaces.push(Interface {
            id,
            node,
            cost: 1,
            up: true,
            excluded: false,
            link,
            prefix,
            address,
        });
        self.nodes[node.0].interfaces.push(id);
        id
    }

    /// Connects two distinct nodes, both ends start up with a cost of 1.
    /// The ends are addressed `prefix::1` and `prefix::2`.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, prefix: Ipv6Net, delay: Duration) -> Result<LinkId, ConfigError> {
        let id = LinkId(self.links.len());
        if a == b {
            return Err(ConfigError::SelfLink {
                link: id.0,
                node: self.nodes[a.0].name.clone(),
            });
        }
        let prefix = self.unassigned(checked_prefix(prefix)?)?;
        let ends = [
            self.add_interface(a, prefix, 1, Some(id)),
            self.add_interface(b, prefix, 2, Some(id)),
        ];
        self.links.push(Link { id, ends, delay });
        Ok(id)
    }

    /// Attaches a host-facing network to `node`, the router is addressed `prefix::1`.
    pub fn add_stub(&mut self, node: NodeId, prefix: Ipv6Net) -> Result<InterfaceId, ConfigError> {
        let prefix = self.unassigned(checked_prefix(prefix)?)?;
        Ok(self.add_interface(node, prefix, 1, None))
    }

    /// every network gets its own prefix, otherwise interface addresses would collide
    fn unassigned(&self, prefix: Ipv6Net) -> Result<Ipv6Net, ConfigError> {
        if self.interfaces.iter().any(|itf| itf.prefix == prefix) {
            return Err(ConfigError::InvalidPrefix {
                prefix: prefix.to_string(),
                reason: "prefix is already assigned to another network".to_string(),
            });
        }
        Ok(prefix)
    }

    /// Sets the administrative cost of the interface of `node` on `link`.
    pub fn set_cost(&mut self, node: NodeId, link: LinkId, cost: i64) -> Result<(), ConfigError> {
        let itf = self.interface_on(node, link)?;
        self.set_interface_cost(itf, cost)
    }

    pub fn set_interface_cost(&mut self, itf: InterfaceId, cost: i64) -> Result<(), ConfigError> {
        let node = self.interfaces[itf.0].node;
        if cost < 1 || cost >= INFINITY as i64 {
            return Err(ConfigError::InvalidCost {
                node: self.nodes[node.0].name.clone(),
                cost,
            });
        }
        self.interfaces[itf.0].cost = cost as u8;
        Ok(())
    }

    /// Excludes an interface from the protocol, it keeps forwarding traffic.
    pub fn exclude(&mut self, itf: InterfaceId) {
        self.interfaces[itf.0].excluded = true;
    }

    pub fn interface_on(&self, node: NodeId, link: LinkId) -> Result<InterfaceId, ConfigError> {
        self.nodes[node.0]
            .interfaces
            .iter()
            .copied()
            .find(|itf| self.interfaces[itf.0].link == Some(link))
            .ok_or_else(|| ConfigError::UnknownLink {
                a: self.nodes[node.0].name.clone(),
                b: link.to_string(),
            })
    }

    pub fn build(self) -> Topology {
        Topology {
            nodes: self.nodes,
            interfaces: self.interfaces,
            links: self.links,
        }
    }
}

fn checked_prefix(prefix: Ipv6Net) -> Result<Ipv6Net, ConfigError> {
    // a link needs room for two hosts
    if prefix.prefix_len() > 126 {
        return Err(ConfigError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "prefix is too long to address the link".to_string(),
        });
    }
    Ok(prefix.trunc())
}
