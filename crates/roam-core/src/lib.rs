pub mod config;
pub mod logging;

pub mod autoupdate;
pub mod capacity;
pub mod engine;
pub mod error;
pub mod geo;
pub mod network;
pub mod registry;
pub mod scheduler;
pub mod snapshot;
pub mod store;
