use std::sync::Arc;

use prometheus::Registry;
use slog::Logger;

use super::backend;
use super::backend::Backend;
use super::bag::Bag;
use super::config::Backend as BackendConfig;
use super::config::Config;
use super::discovery::Discovery;
use super::discovery::DiscoveryMulti;
use super::leader_queue::LeaderQueue;
use super::local_store::LocalStore;
use super::metrics;
use super::NodeId;
use super::Result;

/// Entry point to the distributed coordination primitives.
///
/// Wraps a concrete `Backend` (zookeeper in production, an in-process mock in
/// tests) behind the three public facades (`Bag`, `LeaderQueue`,
/// `Discovery`/`DiscoveryMulti`).
#[derive(Clone)]
pub struct Coordinator(Arc<dyn Backend>);

impl Coordinator {
    pub fn new(config: Config, logger: Logger, registry: &Registry) -> Result<Coordinator> {
        metrics::register_metrics(&logger, registry);
        let node_id = {
            let mut node = NodeId::new();
            node.extra(config.node_attributes);
            node
        };
        let local_store = Arc::new(LocalStore::new(config.local_store.extra_search_path));
        let backend: Arc<dyn Backend> = match config.backend {
            BackendConfig::Zookeeper(zookeeper) => {
                Arc::new(backend::zookeeper::Zookeeper::new(zookeeper, local_store, node_id, logger)?)
            }
        };
        Ok(Coordinator(backend))
    }

    /// Internal constructor used by `mock::MockCoordinator`.
    pub(crate) fn with_backend(backend: Arc<dyn Backend>) -> Coordinator {
        Coordinator(backend)
    }
}

impl Coordinator {
    /// Get the ID of the current node.
    pub fn node_id(&self) -> &NodeId {
        self.0.node_id()
    }

    /// Open (creating if needed) the distributed bag rooted at `path`.
    pub fn bag<S: Into<String>>(&self, path: S) -> Result<Bag> {
        self.0.bag(path.into())
    }

    /// Open (creating if needed) the leader queue rooted at `path`.
    pub fn leader_queue<S: Into<String>>(&self, path: S) -> Result<LeaderQueue> {
        self.0.leader_queue(path.into())
    }

    /// Open the single-result discovery view.
    pub fn discovery(&self) -> Discovery {
        self.0.discovery()
    }

    /// Open the all-results discovery view.
    pub fn discovery_multi(&self) -> DiscoveryMulti {
        self.0.discovery_multi()
    }
}
