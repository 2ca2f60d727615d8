//! Adapters: concrete implementations of the port traits.

pub mod csv_adapter;
pub mod event_adapter;
pub mod file_config_adapter;
pub mod memory_adapter;
pub mod sim_adapter;
