//! Drives the routers and the link model from a single event queue.

use std::collections::HashMap;
use std::net::Ipv6Addr;
use std::time::Duration;

use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::concepts::packet::{DataKind, DataPacket, Packet};
use crate::concepts::route::RouteEntry;
use crate::concepts::timer::{Timer, TimerAction, TimerSlot};
use crate::feedback::{ConfigError, SchedulerError};
use crate::framework::ProtocolParams;
use crate::router::Router;
use crate::scheduler::{EventId, Scheduler};
use crate::topology::{InterfaceId, LinkId, NodeId, Topology};
use crate::util::Secs;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start { node: NodeId },
    Timer { node: NodeId, timer: Timer },
    /// a protocol datagram arriving on `interface`
    Deliver {
        interface: InterfaceId,
        source: Ipv6Addr,
        packet: Packet,
    },
    LinkState { link: LinkId, up: bool },
    /// a data packet arriving at `node` over `via`, or injected there by a host when `via` is None
    Data {
        node: NodeId,
        via: Option<LinkId>,
        packet: DataPacket,
    },
}

/// What a router did with a data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Forwarding {
    /// the destination is this node or a host on one of its stub networks
    Delivered,
    Forwarded { interface: InterfaceId },
    /// no valid route, a notification went back to the origin where possible
    Unreachable,
    /// lost on a down link, out of hops, or an undeliverable notification
    Dropped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficRecord {
    pub at: Duration,
    pub node: NodeId,
    pub packet: DataPacket,
    pub outcome: Forwarding,
}

pub struct Simulation {
    scheduler: Scheduler<Event>,
    topology: Topology,
    routers: Vec<Router>,
    /// the pending event of every armed router timer, cancelled when the slot is re-armed
    armed: HashMap<(NodeId, TimerSlot), EventId>,
    traffic: Vec<TrafficRecord>,
    next_probe: u64,
}

impl Simulation {
    /// Creates one router per node, all of them start at time zero in node order.
    pub fn new(topology: Topology, params: ProtocolParams, seed: u64) -> Result<Self, ConfigError> {
        params.validate()?;
        let routers = topology
            .nodes()
            .iter()
            .map(|node| {
                Router::new(
                    node.id,
                    &node.name,
                    topology.local_interfaces(node.id),
                    params.clone(),
                    seed.wrapping_add(node.id.0 as u64),
                )
            })
            .collect();
        let mut scheduler = Scheduler::new();
        for node in topology.nodes() {
            scheduler.schedule(Duration::ZERO, Event::Start { node: node.id });
        }
        Ok(Self {
            scheduler,
            topology,
            routers,
            armed: HashMap::new(),
            traffic: Vec::new(),
            next_probe: 0,
        })
    }

    pub fn now(&self) -> Duration {
        self.scheduler.now()
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn router(&self, node: NodeId) -> &Router {
        &self.routers[node.0]
    }

    pub fn routers(&self) -> &[Router] {
        &self.routers
    }

    pub fn traffic(&self) -> &[TrafficRecord] {
        &self.traffic
    }

    pub fn lookup(&self, node: NodeId, destination: Ipv6Addr) -> Option<&RouteEntry> {
        self.router(node).lookup(destination)
    }

    /// Schedules a link failure or recovery.
    pub fn schedule_link_state(&mut self, at: Duration, link: LinkId, up: bool) -> Result<EventId, SchedulerError> {
        self.scheduler.schedule_at(at, Event::LinkState { link, up })
    }

    /// Schedules an echo request from a host at `source` entering the network at `node`, returns its sequence number.
    pub fn send_probe(&mut self, at: Duration, node: NodeId, source: Ipv6Addr, destination: Ipv6Addr) -> Result<u64, SchedulerError> {
        let id = self.next_probe;
        let packet = DataPacket::echo_request(id, source, destination);
        self.scheduler.schedule_at(
            at,
            Event::Data {
                node,
                via: None,
                packet,
            },
        )?;
        self.next_probe += 1;
        Ok(id)
    }

    /// Runs every event due at or before `until`, then moves the clock to `until`.
    pub fn run_until(&mut self, until: Duration) {
        while let Some((id, _, event)) = self.scheduler.pop_until(until) {
            self.dispatch(id, event);
        }
        self.scheduler.advance_to(until);
    }

    /// Sets a link up or down right now. Both routers learn about it at this very instant.
    pub fn set_link_state(&mut self, link: LinkId, up: bool) {
        let now = self.now();
        info!(
            "{} link {} between {} and {} {}",
            Secs(now),
            link,
            self.endpoint_name(link, 0),
            self.endpoint_name(link, 1),
            if up { "restored" } else { "torn down" }
        );
        for itf in self.topology.set_link_state(link, up) {
            let node = self.topology.interface(itf).node;
            self.routers[node.0].interface_changed(now, itf, up);
            self.flush(node);
        }
    }

    fn endpoint_name(&self, link: LinkId, end: usize) -> &str {
        let itf = self.topology.link(link).ends[end];
        self.topology.name(self.topology.interface(itf).node)
    }

    fn dispatch(&mut self, id: EventId, event: Event) {
        let now = self.now();
        match event {
            Event::Start { node } => {
                self.routers[node.0].start(now);
                self.flush(node);
            }
            Event::Timer { node, timer } => {
                let slot = (node, timer.slot());
                if self.armed.get(&slot) == Some(&id) {
                    self.armed.remove(&slot);
                }
                self.routers[node.0].on_timer(now, timer);
                self.flush(node);
            }
            Event::Deliver {
                interface,
                source,
                packet,
            } => {
                let Some(link) = self.topology.interface(interface).link else {
                    return;
                };
                if !self.topology.link_usable(link) {
                    trace!("{} datagram from {source} lost, {link} went down in flight", Secs(now));
                    return;
                }
                let node = self.topology.interface(interface).node;
                trace!(
                    "{} {}: received {} from {source} on {interface}",
                    Secs(now),
                    self.topology.name(node),
                    json!(packet)
                );
                let warnings = self.routers[node.0].handle_packet(now, interface, source, &packet);
                if !warnings.is_empty() {
                    warn!(
                        "{} {}: {} malformed entries from {source}",
                        Secs(now),
                        self.topology.name(node),
                        warnings.len()
                    );
                }
                self.flush(node);
            }
            Event::LinkState { link, up } => self.set_link_state(link, up),
            Event::Data { node, via, packet } => {
                if let Some(link) = via.filter(|link| !self.topology.link_usable(*link)) {
                    trace!("{} {:?} {} lost, {link} went down in flight", Secs(now), packet.kind, packet.id);
                    self.record(node, packet, Forwarding::Dropped);
                    return;
                }
                self.forward(node, packet);
            }
        }
    }

    /// drains the outboxes of a router into the link model and the event queue
    fn flush(&mut self, node: NodeId) {
        let packets: Vec<_> = self.routers[node.0].outbound_packets.drain(..).collect();
        for packet in packets {
            self.transmit(packet.itf, packet.packet);
        }
        let actions: Vec<_> = self.routers[node.0].timer_actions.drain(..).collect();
        for action in actions {
            match action {
                TimerAction::Arm { delay, timer } => {
                    let id = self.scheduler.schedule(delay, Event::Timer { node, timer });
                    if let Some(previous) = self.armed.insert((node, timer.slot()), id) {
                        self.scheduler.cancel(previous);
                    }
                }
                TimerAction::Disarm(slot) => {
                    if let Some(previous) = self.armed.remove(&(node, slot)) {
                        self.scheduler.cancel(previous);
                    }
                }
            }
        }
    }

    /// Sends a protocol datagram out of `from`. It reaches the other end after the propagation delay,
    /// or silently disappears if the link is down.
    pub fn transmit(&mut self, from: InterfaceId, packet: Packet) {
        let itf = self.topology.interface(from);
        let (Some(link), Some(peer)) = (itf.link, self.topology.peer(from)) else {
            return;
        };
        if !self.topology.link_usable(link) {
            trace!("{} datagram on {from} dropped, {link} is down", Secs(self.now()));
            return;
        }
        trace!(
            "{} {}: sending {} on {from}",
            Secs(self.now()),
            self.topology.name(itf.node),
            json!(packet)
        );
        let source = itf.address;
        let delay = self.topology.link(link).delay;
        self.scheduler.schedule(
            delay,
            Event::Deliver {
                interface: peer,
                source,
                packet,
            },
        );
    }

    fn record(&mut self, node: NodeId, packet: DataPacket, outcome: Forwarding) -> Forwarding {
        self.traffic.push(TrafficRecord {
            at: self.now(),
            node,
            packet,
            outcome,
        });
        outcome
    }

    /// Forwards a data packet from `node` using its route table. A miss is answered with a single
    /// destination unreachable notification to the origin, it is never retried.
    pub fn forward(&mut self, node: NodeId, packet: DataPacket) -> Forwarding {
        let now = self.now();
        let name = self.topology.name(node).to_string();
        let own = self.topology.owner_of(packet.destination) == Some(node);
        if own || self.topology.attached_stub(node, packet.destination).is_some() {
            debug!("{} {name}: delivered {:?} {} to {}", Secs(now), packet.kind, packet.id, packet.destination);
            let outcome = self.record(node, packet, Forwarding::Delivered);
            if packet.kind == DataKind::EchoRequest {
                self.forward(node, packet.reply());
            }
            return outcome;
        }

        let route = self
            .router(node)
            .lookup(packet.destination)
            .map(|route| route.interface);
        let Some(interface) = route else {
            return self.unreachable(node, packet);
        };
        let Some(link) = self.topology.interface(interface).link else {
            // connected stub without a host at that address
            return self.record(node, packet, Forwarding::Dropped);
        };
        if packet.hop_limit <= 1 {
            warn!("{} {name}: hop limit exceeded for {:?} {}", Secs(now), packet.kind, packet.id);
            return self.record(node, packet, Forwarding::Dropped);
        }
        if !self.topology.link_usable(link) {
            return self.record(node, packet, Forwarding::Dropped);
        }
        let Some(peer) = self.topology.peer(interface) else {
            return self.record(node, packet, Forwarding::Dropped);
        };
        let next = self.topology.interface(peer).node;
        let delay = self.topology.link(link).delay;
        let mut packet = packet;
        packet.hop_limit -= 1;
        self.scheduler.schedule(
            delay,
            Event::Data {
                node: next,
                via: Some(link),
                packet,
            },
        );
        Forwarding::Forwarded { interface }
    }

    fn unreachable(&mut self, node: NodeId, packet: DataPacket) -> Forwarding {
        let now = self.now();
        let name = self.topology.name(node).to_string();
        self.record(node, packet, Forwarding::Unreachable);
        if matches!(packet.kind, DataKind::DestinationUnreachable { .. }) {
            debug!("{} {name}: no route back to {} for an unreachable notification", Secs(now), packet.destination);
            return Forwarding::Unreachable;
        }
        info!("{} {name}: no route to {}, notifying {}", Secs(now), packet.destination, packet.source);
        let Some(address) = self
            .topology
            .node(node)
            .interfaces
            .first()
            .map(|itf| self.topology.interface(*itf).address)
        else {
            return Forwarding::Unreachable;
        };
        self.forward(node, packet.unreachable(address));
        Forwarding::Unreachable
    }
}
