//! An I/O free RIPng engine and the discrete-event network it runs on.
//!
//! [router::Router] holds the distance-vector logic of a single node and never touches a clock or a
//! socket. [simulation::Simulation] wires routers to a [topology::Topology] through a
//! [scheduler::Scheduler] that jumps from event to event in virtual time.

pub mod advertise;
pub mod concepts;
pub mod config;
pub mod feedback;
pub mod framework;
pub mod router;
pub mod scheduler;
pub mod simulation;
pub mod table;
pub mod topology;
pub mod util;
