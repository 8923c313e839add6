use std::collections::BTreeMap;

use ipnet::Ipv6Net;
use ripng::framework::INFINITY;
use ripng::topology::{NodeId, Topology};

/// Bellman-Ford over the usable links, with the cost of the receiving interface added per hop,
/// the way advertisements are accounted. Connected networks keep their interface cost.
pub fn expected_metrics(topology: &Topology) -> BTreeMap<(NodeId, Ipv6Net), u8> {
    let mut connected = BTreeMap::new();
    for node in topology.nodes() {
        for itf in &node.interfaces {
            let itf = topology.interface(*itf);
            if itf.up {
                connected.insert((node.id, itf.prefix), itf.cost);
            }
        }
    }
    let mut dist = connected.clone();
    for _ in 0..topology.nodes().len() {
        for link in topology.links() {
            if !topology.link_usable(link.id) {
                continue;
            }
            for (receiver, sender) in [(link.ends[0], link.ends[1]), (link.ends[1], link.ends[0])] {
                let receiver = topology.interface(receiver);
                let sender = topology.interface(sender).node;
                let advertised: Vec<(Ipv6Net, u8)> = dist
                    .iter()
                    .filter(|((node, _), _)| *node == sender)
                    .map(|((_, prefix), metric)| (*prefix, *metric))
                    .collect();
                for (prefix, metric) in advertised {
                    let key = (receiver.node, prefix);
                    if connected.contains_key(&key) {
                        continue;
                    }
                    let candidate = metric + receiver.cost;
                    if candidate < INFINITY && dist.get(&key).map_or(true, |m| candidate < *m) {
                        dist.insert(key, candidate);
                    }
                }
            }
        }
    }
    dist
}
