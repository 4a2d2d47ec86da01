pub mod config;
pub mod formatter;
pub mod models;
pub mod selector;
pub mod signals;
pub mod snapshot_provider;
pub mod sources;
pub mod threshold;
pub mod upgrade;
