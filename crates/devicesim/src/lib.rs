//! Development dispenser simulator.
//!
//! Stands in for the physical four-reservoir dispenser during backend
//! development: claims itself with a pairing code, heartbeats, polls for
//! jobs, "executes" them with configurable delays and injected failures,
//! and delivers the terminal completion report — with retries, the same
//! way the firmware re-sends after a connectivity drop.

pub mod client;
pub mod simulate;
