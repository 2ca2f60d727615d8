//! Port traits for external collaborators.
//!
//! The core never talks to a database, API layer, or data generator directly;
//! everything crosses one of these seams. Implementations live in `adapters`.

pub mod config_port;
pub mod event_port;
pub mod market_port;
pub mod signal_port;
pub mod trade_port;
