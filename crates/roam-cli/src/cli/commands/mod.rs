//! CLI command handlers. Each command lives in its own file.

mod autoupdate;
mod check;
mod covered;
mod fetch;
mod list;
mod remove;
mod snapshot;
mod usage;
mod watch;

pub use autoupdate::run_autoupdate;
pub use check::{parse_network, run_check};
pub use covered::run_covered;
pub use fetch::{parse_point, run_fetch};
pub use list::run_list;
pub use remove::run_remove;
pub use snapshot::run_snapshot;
pub use usage::run_usage;
pub use watch::run_watch;
