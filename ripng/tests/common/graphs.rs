use ripng::config::{LinkConfig, ScenarioConfig, StubConfig};
use ripng::framework::{ProtocolParams, SplitHorizon};

pub const SRC_NET: &str = "2001:db8:10::/64";
pub const DST_NET: &str = "2001:db8:20::/64";
/// hosts on the source and destination networks
pub const SRC_HOST: &str = "2001:db8:10::100";
pub const DST_HOST: &str = "2001:db8:20::100";

fn link(id: u16, a: &str, b: &str, cost: i64) -> LinkConfig {
    LinkConfig {
        a: a.to_string(),
        b: b.to_string(),
        prefix: format!("2001:db8:0:{id:x}::/64"),
        cost_a: cost,
        cost_b: cost,
        delay_ms: 5,
        excluded: Vec::new(),
    }
}

fn stub(node: &str, prefix: &str) -> StubConfig {
    StubConfig {
        node: node.to_string(),
        prefix: prefix.to_string(),
        cost: 1,
        excluded: true,
    }
}

fn scenario(policy: SplitHorizon, nodes: &[&str], links: Vec<LinkConfig>, stubs: Vec<StubConfig>) -> ScenarioConfig {
    ScenarioConfig {
        seed: 42,
        params: ProtocolParams::default().with_split_horizon(policy),
        nodes: nodes.iter().map(|n| n.to_string()).collect(),
        links,
        stubs,
        events: Vec::new(),
        probes: None,
        print_tables_at_ms: Vec::new(),
        stop_ms: 300_000,
    }
}

/// Four routers in a square, the source network hangs off A and the destination network off D.
/// A-C-D (2 + 4) is cheaper than A-B-D (5 + 3).
pub fn vnet_square(policy: SplitHorizon) -> ScenarioConfig {
    scenario(
        policy,
        &["A", "B", "C", "D"],
        vec![
            link(1, "A", "B", 5),
            link(2, "A", "C", 2),
            link(3, "C", "D", 4),
            link(4, "B", "D", 3),
        ],
        vec![stub("A", SRC_NET), stub("D", DST_NET)],
    )
}

/// Five routers, with the diamond B-D-E closed by B-E. The destination network hangs off E.
pub fn vnet_diamond(policy: SplitHorizon) -> ScenarioConfig {
    scenario(
        policy,
        &["A", "B", "C", "D", "E"],
        vec![
            link(1, "A", "B", 1),
            link(2, "A", "C", 1),
            link(3, "B", "D", 2),
            link(4, "B", "E", 1),
            link(5, "C", "D", 3),
            link(6, "D", "E", 1),
        ],
        vec![stub("A", SRC_NET), stub("E", DST_NET)],
    )
}

/// Weighted mesh with a stub network on every router, asymmetric on the 3-4 link.
pub fn vnet_simple_weighted(policy: SplitHorizon) -> ScenarioConfig {
    let mut links = vec![
        link(1, "1", "2", 2),
        link(2, "1", "3", 1),
        link(3, "2", "3", 4),
        link(4, "2", "4", 5),
        link(5, "3", "4", 12),
        link(6, "3", "5", 8),
        link(7, "4", "5", 1),
    ];
    links[4].cost_b = 9;
    let nodes = ["1", "2", "3", "4", "5"];
    let stubs = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| stub(node, &format!("2001:db8:1{i}::/64")))
        .collect();
    scenario(policy, &nodes, links, stubs)
}
