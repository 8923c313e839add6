use std::time::Duration;

use ripng::config::ScenarioConfig;
use ripng::feedback::{ConfigError, SchedulerError};
use ripng::framework::{ProtocolParams, SplitHorizon};
use serde_json::json;

use crate::common::graphs::vnet_square;
use crate::common::virtual_network::VirtualNetwork;

mod common;

const SQUARE: &str = include_str!("../../demos/scenarios/topologies/square.json");
const DIAMOND: &str = include_str!("../../demos/scenarios/topologies/diamond.json");

fn parse(value: serde_json::Value) -> ScenarioConfig {
    ScenarioConfig::from_json(&value.to_string()).unwrap()
}

fn minimal() -> serde_json::Value {
    json!({
        "nodes": ["A", "B"],
        "links": [{ "a": "A", "b": "B", "prefix": "2001:0:1::/64" }],
        "stop_ms": 1000
    })
}

#[test]
fn demo_scenarios_parse() {
    for json in [SQUARE, DIAMOND] {
        let config = ScenarioConfig::from_json(json).unwrap();
        assert_eq!(config.params.split_horizon, SplitHorizon::PoisonReverse);
        assert!(config.build().is_ok());
    }
}

#[test]
fn demo_square_reconverges() {
    let config = ScenarioConfig::from_json(SQUARE).unwrap();
    let mut network = VirtualNetwork::create(&config);
    network.run_secs(25);
    assert_eq!(network.get_metric_to("A", "2001:2::2"), 7);
    network.run_secs(config.stop_ms / 1000);
    assert_eq!(network.get_metric_to("A", "2001:2::2"), 9);
}

#[test]
fn defaults_fill_in() {
    let config = parse(minimal());
    assert_eq!(config.params, ProtocolParams::default());
    assert_eq!(config.links[0].cost_a, 1);
    assert_eq!(config.links[0].delay_ms, 0);
    assert_eq!(config.stop(), Duration::from_secs(1));

    let topology = config.topology().unwrap();
    let a = topology.find_node("A").unwrap();
    let itf = topology.interface(topology.node(a).interfaces[0]);
    assert_eq!(itf.address, "2001:0:1::1".parse::<std::net::Ipv6Addr>().unwrap());
    assert_eq!(itf.cost, 1);
}

#[test]
fn timers_in_milliseconds() {
    let mut value = minimal();
    value["params"] = json!({ "periodic_interval": 10000, "timeout": 60000, "split_horizon": "SplitHorizon" });
    let config = parse(value);
    assert_eq!(config.params.periodic_interval, Duration::from_secs(10));
    assert_eq!(config.params.timeout, Duration::from_secs(60));
    assert_eq!(config.params.garbage_collection, Duration::from_secs(120));
    assert_eq!(config.params.split_horizon, SplitHorizon::SplitHorizon);
}

#[test]
fn self_referencing_link() {
    let mut value = minimal();
    value["links"][0]["b"] = json!("A");
    assert!(matches!(parse(value).build(), Err(ConfigError::SelfLink { link: 0, .. })));
}

#[test]
fn costs_must_be_usable() {
    for cost in [0, -3, 16] {
        let mut value = minimal();
        value["links"][0]["cost_b"] = json!(cost);
        assert_eq!(
            parse(value).build().err(),
            Some(ConfigError::InvalidCost {
                node: "B".to_string(),
                cost
            })
        );
    }
}

#[test]
fn negative_delay() {
    let mut value = minimal();
    value["links"][0]["delay_ms"] = json!(-2);
    assert_eq!(
        parse(value).build().err(),
        Some(ConfigError::NegativeDelay { link: 0, delay_ms: -2 })
    );
}

#[test]
fn unknown_and_duplicate_nodes() {
    let mut value = minimal();
    value["links"][0]["b"] = json!("Z");
    assert_eq!(parse(value).build().err(), Some(ConfigError::UnknownNode("Z".to_string())));

    let mut value = minimal();
    value["nodes"] = json!(["A", "B", "A"]);
    assert_eq!(parse(value).build().err(), Some(ConfigError::DuplicateNode("A".to_string())));
}

#[test]
fn events_need_a_link() {
    let mut value = minimal();
    value["nodes"] = json!(["A", "B", "C"]);
    value["events"] = json!([{ "at_ms": 10, "a": "A", "b": "C", "up": false }]);
    assert!(matches!(parse(value).build(), Err(ConfigError::UnknownLink { .. })));
}

#[test]
fn bad_prefixes() {
    let mut value = minimal();
    value["links"][0]["prefix"] = json!("2001:0:1::");
    assert!(matches!(parse(value).build(), Err(ConfigError::InvalidPrefix { .. })));

    let mut value = minimal();
    value["links"][0]["prefix"] = json!("2001:0:1::/127");
    assert!(matches!(parse(value).build(), Err(ConfigError::InvalidPrefix { .. })));
}

#[test]
fn prefixes_are_not_shared() {
    let mut value = minimal();
    value["nodes"] = json!(["A", "B", "C"]);
    value["links"]
        .as_array_mut()
        .unwrap()
        .push(json!({ "a": "B", "b": "C", "prefix": "2001:0:1::/64" }));
    assert!(matches!(parse(value).build(), Err(ConfigError::InvalidPrefix { .. })));

    let mut value = minimal();
    value["stubs"] = json!([{ "node": "A", "prefix": "2001:0:1::/64" }]);
    assert!(matches!(parse(value).build(), Err(ConfigError::InvalidPrefix { .. })));
}

#[test]
fn probe_schedule_must_fit_in_time() {
    let mut value = minimal();
    value["probes"] = json!({
        "node": "A",
        "source": "2001:1::2",
        "destination": "2001:2::2",
        "start_ms": 1000,
        "interval_ms": u64::MAX / 2,
        "count": 3
    });
    assert_eq!(
        parse(value).build().err(),
        Some(ConfigError::ProbeOverflow {
            count: 3,
            interval_ms: u64::MAX / 2
        })
    );
}

#[test]
fn inconsistent_timers() {
    let mut config = vnet_square(SplitHorizon::PoisonReverse);
    config.params.triggered_min = Duration::from_secs(10);
    assert!(matches!(config.build(), Err(ConfigError::InvalidTimers(_))));

    let mut config = vnet_square(SplitHorizon::PoisonReverse);
    config.params.timeout = Duration::from_secs(20);
    assert!(matches!(config.build(), Err(ConfigError::InvalidTimers(_))));
}

#[test]
fn unparsable_scenarios() {
    assert!(matches!(ScenarioConfig::from_json("{"), Err(ConfigError::Parse(_))));

    let mut value = minimal();
    value["params"] = json!({ "split_horizon": "Sometimes" });
    assert!(matches!(
        ScenarioConfig::from_json(&value.to_string()),
        Err(ConfigError::Parse(_))
    ));
    assert_eq!(
        "Sometimes".parse::<SplitHorizon>(),
        Err(ConfigError::UnknownStrategy("Sometimes".to_string()))
    );
}

#[test]
fn scheduling_in_the_past() {
    let mut network = VirtualNetwork::create(&vnet_square(SplitHorizon::PoisonReverse));
    network.run_secs(10);
    let link = network.link("A", "B");
    assert_eq!(
        network.sim.schedule_link_state(Duration::from_secs(5), link, false),
        Err(SchedulerError::InThePast {
            now: Duration::from_secs(10),
            at: Duration::from_secs(5)
        })
    );
}
