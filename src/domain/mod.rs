//! Core domain: instruments, market data, indicator math, signal fusion,
//! and the paper trading ledger. Everything here is synchronous and talks
//! to storage through the port traits.

pub mod analysis;
pub mod bar;
pub mod config;
pub mod error;
pub mod fusion;
pub mod indicator;
pub mod instrument;
pub mod lifecycle;
pub mod risk;
pub mod signal;
pub mod stats;
pub mod trade;
