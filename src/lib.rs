//! Bugcastle - session orchestration core for the Castle of Bugs debugging
//! adventure.
//!
//! The crate drives multi-turn game sessions against an external content
//! generator: a per-user state machine, per-user concurrency gating, and
//! durable session persistence across restarts.

pub mod config;
pub mod engine;
pub mod generator;
pub mod router;
pub mod session;
pub mod sync;
