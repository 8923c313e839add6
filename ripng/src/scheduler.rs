//! Virtual clock and discrete event queue.
//!
//! Time never passes on its own: popping an event moves the clock to the time the event was
//! scheduled for. Events scheduled for the same instant are popped in insertion order.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::time::Duration;

use educe::Educe;

use crate::feedback::SchedulerError;

/// Handle of a scheduled event, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

struct Scheduled<E> {
    at: Duration,
    /// assigned in insertion order, breaks ties between events at the same instant
    id: EventId,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.id == other.id
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max heap, reverse to pop the earliest event first
        other.at.cmp(&self.at).then_with(|| other.id.cmp(&self.id))
    }
}

#[derive(Educe)]
#[educe(Debug(bound()))]
pub struct Scheduler<E> {
    now: Duration,
    next_id: u64,
    #[educe(Debug(ignore))]
    queue: BinaryHeap<Scheduled<E>>,
    pending: HashSet<EventId>,
    cancelled: HashSet<EventId>,
}

impl<E> Default for Scheduler<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Scheduler<E> {
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BinaryHeap::new(),
            pending: HashSet::new(),
            cancelled: HashSet::new(),
        }
    }

    /// current virtual time
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedules `event` at `now + delay`.
    pub fn schedule(&mut self, delay: Duration, event: E) -> EventId {
        self.push(self.now + delay, event)
    }

    /// Schedules `event` at an absolute virtual time, which must not lie in the past.
    pub fn schedule_at(&mut self, at: Duration, event: E) -> Result<EventId, SchedulerError> {
        if at < self.now {
            return Err(SchedulerError::InThePast { now: self.now, at });
        }
        Ok(self.push(at, event))
    }

    fn push(&mut self, at: Duration, event: E) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        self.pending.insert(id);
        self.queue.push(Scheduled { at, id, event });
        id
    }

    /// Cancels a pending event, returns false if it already fired or was cancelled before.
    pub fn cancel(&mut self, id: EventId) -> bool {
        if self.pending.remove(&id) {
            self.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    /// Pops the earliest event due at or before `until` and moves the clock to its time.
    /// Cancelled events are discarded on the way.
    pub fn pop_until(&mut self, until: Duration) -> Option<(EventId, Duration, E)> {
        loop {
            if self.queue.peek()?.at > until {
                return None;
            }
            let Scheduled { at, id, event } = self.queue.pop()?;
            if self.cancelled.remove(&id) {
                continue;
            }
            self.pending.remove(&id);
            self.now = at;
            return Some((id, at, event));
        }
    }

    /// Moves the clock forward to `until`, never backwards.
    pub fn advance_to(&mut self, until: Duration) {
        if until > self.now {
            self.now = until;
        }
    }

    /// number of pending, non-cancelled events
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
