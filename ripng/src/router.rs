use std::collections::BTreeMap;
use std::net::Ipv6Addr;
use std::time::Duration;

use ipnet::Ipv6Net;
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::advertise::{advertisement_view, into_responses};
use crate::concepts::interface::LocalInterface;
use crate::concepts::packet::{OutboundPacket, Packet, RouteUpdate};
use crate::concepts::route::{RouteEntry, RouteState};
use crate::concepts::timer::{Timer, TimerAction, TimerSlot};
use crate::feedback::RoutingWarning;
use crate::framework::{ProtocolParams, INFINITY};
use crate::table::{Admission, Candidate, RouteTable};
use crate::topology::{InterfaceId, NodeId};
use crate::util::{sum_inf, Secs};

/// The distance-vector engine of a single node.
///
/// The router does no I/O and keeps no clock. Every entry point takes the current virtual time,
/// datagrams to send are written to `outbound_packets` and timers to (re)arm to `timer_actions`.
/// Whoever drives the router drains both after each call.
#[derive(Debug)]
pub struct Router {
    pub node: NodeId,
    pub name: String,
    pub interfaces: BTreeMap<InterfaceId, LocalInterface>,
    pub table: RouteTable,
    pub params: ProtocolParams,
    pub outbound_packets: Vec<OutboundPacket>,
    pub timer_actions: Vec<TimerAction>,
    periodic_generation: u64,
    triggered_pending: bool,
    rng: StdRng,
}

impl Router {
    pub fn new(node: NodeId, name: &str, interfaces: Vec<LocalInterface>, params: ProtocolParams, seed: u64) -> Self {
        Self {
            node,
            name: name.to_string(),
            interfaces: interfaces.into_iter().map(|itf| (itf.id, itf)).collect(),
            table: RouteTable::new(),
            params,
            outbound_packets: Vec::new(),
            timer_actions: Vec::new(),
            periodic_generation: 0,
            triggered_pending: false,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Installs the connected networks, asks every neighbour for its table and arms the first unsolicited update.
    pub fn start(&mut self, now: Duration) {
        info!("{} {}: starting RIPng on {} interfaces", Secs(now), self.name, self.interfaces.len());
        let connected: Vec<(Ipv6Net, InterfaceId, u8)> = self
            .interfaces
            .values()
            .filter(|itf| itf.up)
            .map(|itf| (itf.prefix, itf.id, itf.cost))
            .collect();
        for (prefix, itf, cost) in connected {
            self.table.install_connected(prefix, itf, cost);
        }
        for itf in self.protocol_interfaces() {
            self.write_packet(itf, Packet::Request);
        }
        let delay = self.rng.gen_range(Duration::ZERO..=self.params.startup_delay);
        self.arm_periodic(delay);
    }

    pub fn lookup(&self, destination: Ipv6Addr) -> Option<&RouteEntry> {
        self.table.lookup(destination)
    }

    pub fn route(&self, prefix: &Ipv6Net) -> Option<&RouteEntry> {
        self.table.get(prefix)
    }

    // region Interface

    fn protocol_interfaces(&self) -> Vec<InterfaceId> {
        self.interfaces
            .values()
            .filter(|itf| itf.speaks_protocol())
            .map(|itf| itf.id)
            .collect()
    }

    fn write_packet(&mut self, itf: InterfaceId, packet: Packet) {
        self.outbound_packets.push(OutboundPacket { itf, packet });
    }

    /// writes the (possibly split) view of the table for `itf` to the outbound packet queue
    fn write_view(&mut self, itf: InterfaceId, only_changed: bool) {
        let view = advertisement_view(&self.table, itf, self.params.split_horizon, only_changed);
        if view.is_empty() {
            return;
        }
        for packet in into_responses(view, self.params.max_entries_per_message) {
            self.write_packet(itf, packet);
        }
    }

    /// Reacts to an interface going up or down, detection is immediate.
    pub fn interface_changed(&mut self, now: Duration, itf: InterfaceId, up: bool) {
        let Some(local) = self.interfaces.get_mut(&itf) else {
            return;
        };
        if local.up == up {
            return;
        }
        local.up = up;
        let local = local.clone();

        if up {
            info!("{} {}: interface {} up, {} reachable at cost {}", Secs(now), self.name, itf, local.prefix, local.cost);
            let generation = self.table.install_connected(local.prefix, itf, local.cost);
            self.arm_route_timer(local.prefix, generation, RouteState::Valid, false);
            if local.speaks_protocol() {
                self.write_packet(itf, Packet::Request);
            }
        } else {
            let invalidated = self.table.invalidate_interface(itf);
            info!(
                "{} {}: interface {} down, {} routes invalidated",
                Secs(now),
                self.name,
                itf,
                invalidated.len()
            );
            for (prefix, generation) in invalidated {
                self.arm_route_timer(prefix, generation, RouteState::Invalid, true);
            }
        }
        self.schedule_triggered_update();
    }

    // endregion

    // region Advertisements

    /// handle a single datagram received on `ingress` from the neighbour at `source`
    pub fn handle_packet(&mut self, now: Duration, ingress: InterfaceId, source: Ipv6Addr, packet: &Packet) -> Vec<RoutingWarning> {
        let Some(itf) = self.interfaces.get(&ingress).cloned() else {
            return Vec::new();
        };
        if !itf.speaks_protocol() {
            debug!("{} {}: ignoring datagram from {source} on {ingress}, interface does not run RIPng", Secs(now), self.name);
            return Vec::new();
        }
        match packet {
            Packet::Request => {
                debug!("{} {}: answering table request from {source}", Secs(now), self.name);
                self.write_view(ingress, false);
                Vec::new()
            }
            Packet::Response { routes } => self.handle_response(now, &itf, source, routes),
        }
    }

    fn handle_response(&mut self, now: Duration, itf: &LocalInterface, source: Ipv6Addr, routes: &[RouteUpdate]) -> Vec<RoutingWarning> {
        let mut warnings = Vec::new();
        let mut changed = false;
        for update in routes {
            let prefix = match validate(update) {
                Ok(prefix) => prefix,
                Err(warning) => {
                    warn!("{} {}: dropping entry from {source}: {warning}", Secs(now), self.name);
                    warnings.push(warning);
                    continue;
                }
            };
            let candidate = Candidate {
                prefix,
                metric: sum_inf(update.metric, itf.cost),
                next_hop: source,
                interface: itf.id,
            };
            match self.table.update(candidate) {
                Admission::Rejected => {}
                Admission::Refreshed { generation } => {
                    self.arm_route_timer(prefix, generation, RouteState::Valid, false);
                }
                Admission::Changed { generation, state } => {
                    if state == RouteState::Valid {
                        debug!(
                            "{} {}: {prefix} via {source} on {}, metric {}",
                            Secs(now),
                            self.name,
                            itf.id,
                            candidate.metric
                        );
                    } else {
                        info!("{} {}: {prefix} withdrawn by {source}", Secs(now), self.name);
                    }
                    self.arm_route_timer(prefix, generation, state, true);
                    changed = true;
                }
            }
        }
        if changed {
            self.schedule_triggered_update();
        }
        warnings
    }

    /// Coalesces changes: at most one triggered update is pending, it fires after a random hold down.
    fn schedule_triggered_update(&mut self) {
        if self.triggered_pending {
            return;
        }
        self.triggered_pending = true;
        let delay = self
            .rng
            .gen_range(self.params.triggered_min..=self.params.triggered_max);
        self.timer_actions.push(TimerAction::Arm {
            delay,
            timer: Timer::Triggered,
        });
    }

    fn arm_periodic(&mut self, delay: Duration) {
        self.periodic_generation += 1;
        self.timer_actions.push(TimerAction::Arm {
            delay,
            timer: Timer::Periodic {
                generation: self.periodic_generation,
            },
        });
    }

    /// Valid routes get a timeout, invalid ones are handed to garbage collection.
    /// A refresh keeps a running garbage collection timer alone, since the route was valid already.
    fn arm_route_timer(&mut self, prefix: Ipv6Net, generation: u64, state: RouteState, state_changed: bool) {
        let connected = self.table.get(&prefix).is_some_and(|route| route.is_connected());
        let (arm, disarm) = match state {
            RouteState::Valid if connected => (None, TimerSlot::GarbageCollection(prefix)),
            RouteState::Valid => (
                Some((self.params.timeout, Timer::Timeout { prefix, generation })),
                TimerSlot::GarbageCollection(prefix),
            ),
            RouteState::Invalid => (
                Some((
                    self.params.garbage_collection,
                    Timer::GarbageCollection { prefix, generation },
                )),
                TimerSlot::Timeout(prefix),
            ),
        };
        if state_changed || connected {
            self.timer_actions.push(TimerAction::Disarm(disarm));
        }
        if let Some((delay, timer)) = arm {
            self.timer_actions.push(TimerAction::Arm { delay, timer });
        }
    }

    // endregion

    /// handle a timer armed earlier, stale timers are ignored
    pub fn on_timer(&mut self, now: Duration, timer: Timer) {
        match timer {
            Timer::Periodic { generation } => {
                if generation != self.periodic_generation {
                    return;
                }
                debug!("{} {}: periodic update", Secs(now), self.name);
                for itf in self.protocol_interfaces() {
                    self.write_view(itf, false);
                }
                self.table.clear_changed();
                // the full update carried every pending change
                if self.triggered_pending {
                    self.triggered_pending = false;
                    self.timer_actions.push(TimerAction::Disarm(TimerSlot::Triggered));
                }
                let jitter = self.rng.gen_range(Duration::ZERO..=self.params.periodic_jitter);
                self.arm_periodic(self.params.periodic_interval + jitter);
            }
            Timer::Triggered => {
                if !self.triggered_pending {
                    return;
                }
                self.triggered_pending = false;
                debug!("{} {}: triggered update", Secs(now), self.name);
                for itf in self.protocol_interfaces() {
                    self.write_view(itf, true);
                }
                self.table.clear_changed();
            }
            Timer::Timeout { prefix, generation } => {
                if let Some(generation) = self.table.expire(&prefix, generation) {
                    info!("{} {}: {prefix} timed out", Secs(now), self.name);
                    self.arm_route_timer(prefix, generation, RouteState::Invalid, true);
                    self.schedule_triggered_update();
                }
            }
            Timer::GarbageCollection { prefix, generation } => {
                if self.table.collect(&prefix, generation) {
                    info!("{} {}: {prefix} deleted", Secs(now), self.name);
                }
            }
        }
    }
}

/// Checks a received entry, returning the prefix it describes.
fn validate(update: &RouteUpdate) -> Result<Ipv6Net, RoutingWarning> {
    if update.metric == 0 || update.metric > INFINITY {
        return Err(RoutingWarning::MalformedMetric {
            prefix: update.prefix,
            prefix_len: update.prefix_len,
            metric: update.metric,
        });
    }
    let prefix = Ipv6Net::new(update.prefix, update.prefix_len)
        .map_err(|_| RoutingWarning::InvalidPrefixLength {
            prefix: update.prefix,
            prefix_len: update.prefix_len,
        })?
        .trunc();
    let network = prefix.network();
    let link_local = network.segments()[0] & 0xffc0 == 0xfe80;
    // ::/0 stays usable as a default route, the unspecified address itself is not
    let unspecified = network.is_unspecified() && prefix.prefix_len() == 128;
    if network.is_multicast() || network.is_loopback() || link_local || unspecified {
        return Err(RoutingWarning::UnrecognizedPrefix {
            prefix: update.prefix,
            prefix_len: update.prefix_len,
        });
    }
    Ok(prefix)
}
