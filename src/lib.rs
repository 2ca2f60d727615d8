//! fxforge — simulated multi-factor forex and metals trading bot.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`]. The [`orchestrator`]
//! wires a full stack together and drives it on periodic cycles.

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod orchestrator;
pub mod ports;
