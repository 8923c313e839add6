use std::net::Ipv6Addr;
use std::time::Duration;

use thiserror::Error;

use crate::framework::INFINITY;

/// Fatal problems with a scenario, reported before the simulation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("link {link} connects node {node} to itself")]
    SelfLink { link: usize, node: String },
    /// Costs must be positive and leave room below the infinity metric.
    #[error("interface cost {cost} on node {node} is outside of 1..{INFINITY}")]
    InvalidCost { node: String, cost: i64 },
    #[error("link {link} has a negative propagation delay of {delay_ms}ms")]
    NegativeDelay { link: usize, delay_ms: i64 },
    #[error("unknown node {0}")]
    UnknownNode(String),
    #[error("node {0} is declared twice")]
    DuplicateNode(String),
    #[error("no link between {a} and {b}")]
    UnknownLink { a: String, b: String },
    #[error("invalid prefix {prefix}: {reason}")]
    InvalidPrefix { prefix: String, reason: String },
    #[error("unknown split horizon strategy {0}, expected NoSplitHorizon, SplitHorizon or PoisonReverse")]
    UnknownStrategy(String),
    #[error("invalid timer configuration: {0}")]
    InvalidTimers(&'static str),
    #[error("{count} echo requests every {interval_ms}ms run past the end of virtual time")]
    ProbeOverflow { count: u64, interval_ms: u64 },
    #[error("cannot parse scenario: {0}")]
    Parse(String),
    #[error(transparent)]
    Schedule(#[from] SchedulerError),
}

/// Although this is an error enum, these should be treated as warnings.
/// The offending route entry is dropped, the remaining entries of the same message are still processed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingWarning {
    /// Metrics on the wire must be within 1..=INFINITY
    #[error("metric {metric} for {prefix}/{prefix_len} is outside of 1..={INFINITY}")]
    MalformedMetric {
        prefix: Ipv6Addr,
        prefix_len: u8,
        metric: u8,
    },
    #[error("prefix length {prefix_len} for {prefix} exceeds 128")]
    InvalidPrefixLength { prefix: Ipv6Addr, prefix_len: u8 },
    /// Multicast, loopback and link-local prefixes, and the unspecified address, are never routed.
    #[error("prefix {prefix}/{prefix_len} is not routable")]
    UnrecognizedPrefix { prefix: Ipv6Addr, prefix_len: u8 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("cannot schedule an event at {at:?}, the clock is already at {now:?}")]
    InThePast { now: Duration, at: Duration },
}
