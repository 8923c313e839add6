use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};

use crate::feedback::ConfigError;

/// Metric that marks a destination as unreachable. Usable metrics are `1..INFINITY`.
pub const INFINITY: u8 = 16;

/// Loop-suppression policy applied when building the advertisement for an egress interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SplitHorizon {
    /// advertise every route on every interface, including back where it came from
    NoSplitHorizon,
    /// omit routes on the interface they were learned from
    SplitHorizon,
    /// advertise routes back on the interface they were learned from with an infinite metric
    #[default]
    PoisonReverse,
}

impl Display for SplitHorizon {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SplitHorizon::NoSplitHorizon => "NoSplitHorizon",
            SplitHorizon::SplitHorizon => "SplitHorizon",
            SplitHorizon::PoisonReverse => "PoisonReverse",
        };
        f.write_str(name)
    }
}

impl FromStr for SplitHorizon {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NoSplitHorizon" => Ok(SplitHorizon::NoSplitHorizon),
            "SplitHorizon" => Ok(SplitHorizon::SplitHorizon),
            "PoisonReverse" => Ok(SplitHorizon::PoisonReverse),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Protocol timers and tunables, applied once before a run starts.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// the first unsolicited update is sent after a random delay in `[0, startup_delay]`
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub startup_delay: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub periodic_interval: Duration,
    /// random extra delay in `[0, periodic_jitter]` added to every periodic interval
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub periodic_jitter: Duration,
    /// a learned route that is not refreshed within this interval becomes invalid
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub timeout: Duration,
    /// an invalid route is deleted after this interval
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub garbage_collection: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub triggered_min: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub triggered_max: Duration,
    /// route entries per response, (1500 MTU - 40 IPv6 - 8 UDP - 4 RIPng) / 20
    pub max_entries_per_message: usize,
    pub split_horizon: SplitHorizon,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            startup_delay: Duration::from_secs(1),
            periodic_interval: Duration::from_secs(30),
            periodic_jitter: Duration::from_secs(5),
            timeout: Duration::from_secs(180),
            garbage_collection: Duration::from_secs(120),
            triggered_min: Duration::from_secs(1),
            triggered_max: Duration::from_secs(5),
            max_entries_per_message: 72,
            split_horizon: SplitHorizon::default(),
        }
    }
}

impl ProtocolParams {
    pub fn with_split_horizon(mut self, split_horizon: SplitHorizon) -> Self {
        self.split_horizon = split_horizon;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.periodic_interval.is_zero() {
            return Err(ConfigError::InvalidTimers("periodic interval must be positive"));
        }
        if self.triggered_min > self.triggered_max {
            return Err(ConfigError::InvalidTimers(
                "minimum triggered update delay exceeds the maximum",
            ));
        }
        if self.timeout <= self.periodic_interval + self.periodic_jitter {
            return Err(ConfigError::InvalidTimers(
                "route timeout must be longer than the periodic update interval",
            ));
        }
        if self.garbage_collection.is_zero() {
            return Err(ConfigError::InvalidTimers(
                "garbage collection interval must be positive",
            ));
        }
        if self.max_entries_per_message == 0 {
            return Err(ConfigError::InvalidTimers(
                "a response must carry at least one route entry",
            ));
        }
        Ok(())
    }
}
