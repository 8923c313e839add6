use std::time::Duration;

use ipnet::Ipv6Net;
use serde::{Deserialize, Serialize};

/// A timer owned by a router. Generations are captured when the timer is armed, a timer
/// whose generation no longer matches the router's state is stale and does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timer {
    /// unsolicited full table update
    Periodic { generation: u64 },
    /// coalesced update carrying only changed routes
    Triggered,
    /// the route was not refreshed in time
    Timeout { prefix: Ipv6Net, generation: u64 },
    /// the route stayed invalid long enough to be removed
    GarbageCollection { prefix: Ipv6Net, generation: u64 },
}

/// Identifies the timer a router can have at most one of, re-arming a slot replaces the previous timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerSlot {
    Periodic,
    Triggered,
    Timeout(Ipv6Net),
    GarbageCollection(Ipv6Net),
}

impl Timer {
    pub fn slot(&self) -> TimerSlot {
        match self {
            Timer::Periodic { .. } => TimerSlot::Periodic,
            Timer::Triggered => TimerSlot::Triggered,
            Timer::Timeout { prefix, .. } => TimerSlot::Timeout(*prefix),
            Timer::GarbageCollection { prefix, .. } => TimerSlot::GarbageCollection(*prefix),
        }
    }
}

/// Requests from a router to whoever drives its clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    Arm { delay: Duration, timer: Timer },
    Disarm(TimerSlot),
}
