use prometheus::Registry;
use slog::Logger;

mod backend;
mod bag;
mod cleaner;
mod client;
mod constants;
mod deleted_watch;
mod discovery;
mod leader_queue;
mod metrics;

pub use self::backend::Zookeeper;

/// Register this backend's zookeeper-specific metrics with `registry`.
pub fn register_metrics(logger: &Logger, registry: &Registry) {
    self::metrics::register_metrics(logger, registry);
}
