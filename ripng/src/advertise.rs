//! Builds what a router tells the neighbours behind one interface.

use crate::concepts::packet::{Packet, RouteUpdate};
use crate::framework::{SplitHorizon, INFINITY};
use crate::table::RouteTable;
use crate::topology::InterfaceId;

/// The view of `table` advertised on `egress`, with the loop-suppression policy applied.
/// With `only_changed` set, only routes carrying the route change flag are included (triggered updates).
pub fn advertisement_view(
    table: &RouteTable,
    egress: InterfaceId,
    policy: SplitHorizon,
    only_changed: bool,
) -> Vec<RouteUpdate> {
    table
        .iter()
        .filter(|route| !only_changed || route.changed)
        .filter_map(|route| {
            let learned_here = route.interface == egress;
            let metric = match policy {
                SplitHorizon::NoSplitHorizon => route.metric,
                SplitHorizon::SplitHorizon if learned_here => return None,
                SplitHorizon::SplitHorizon => route.metric,
                SplitHorizon::PoisonReverse if learned_here => INFINITY,
                SplitHorizon::PoisonReverse => route.metric,
            };
            Some(RouteUpdate {
                prefix: route.prefix.network(),
                prefix_len: route.prefix.prefix_len(),
                metric: metric.min(INFINITY),
            })
        })
        .collect()
}

/// Splits a view into responses of at most `max_entries` routes each.
pub fn into_responses(routes: Vec<RouteUpdate>, max_entries: usize) -> Vec<Packet> {
    routes
        .chunks(max_entries.max(1))
        .map(|chunk| Packet::Response {
            routes: chunk.to_vec(),
        })
        .collect()
}
