use std::sync::Arc;

use slog::Logger;

use super::super::super::bag::Bag;
use super::super::super::config::ZookeeperConfig;
use super::super::super::discovery::Discovery;
use super::super::super::discovery::DiscoveryMulti;
use super::super::super::leader_queue::LeaderQueue;
use super::super::super::local_store::LocalStore;
use super::super::super::NodeId;
use super::super::super::Result;
use super::super::Backend;
use super::bag::ZookeeperBag;
use super::cleaner::Cleaner;
use super::client::Client;
use super::constants::PREFIX_BAG;
use super::constants::PREFIX_LEADER_QUEUE;
use super::deleted_watch::DeletionRegistry;
use super::discovery::ZookeeperDiscovery;
use super::leader_queue::ZookeeperLeaderQueue;

/// Zookeeper-backed `Backend`: the `Client` session, the background
/// `Cleaner`, the shared `DeletionRegistry`, and constructors for the three
/// coordination primitives, all rooted at hash-sharded paths under a single
/// session.
pub struct Zookeeper {
    client: Arc<Client>,
    deletions: Arc<DeletionRegistry>,
    local_store: Arc<LocalStore>,
    discovery_root: String,
    logger: Logger,
    node_id: NodeId,
    _cleaner: Cleaner,
}

impl Zookeeper {
    pub fn new(
        config: ZookeeperConfig,
        local_store: Arc<LocalStore>,
        node_id: NodeId,
        logger: Logger,
    ) -> Result<Zookeeper> {
        let discovery_root = config.discovery_root.clone();
        let client = Arc::new(Client::new(config.clone(), Some(&node_id), logger.clone())?);
        let cleaner = Cleaner::new(Arc::clone(&client), config, logger.clone())?;
        let deletions = Arc::new(DeletionRegistry::new(Arc::clone(&client), logger.clone()));
        Ok(Zookeeper {
            client,
            deletions,
            local_store,
            discovery_root,
            logger,
            node_id,
            _cleaner: cleaner,
        })
    }
}

impl Backend for Zookeeper {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn bag(&self, path: String) -> Result<Bag> {
        let root = Client::path_from_key(PREFIX_BAG, &path);
        let inner = ZookeeperBag::new(
            Arc::clone(&self.client),
            Arc::clone(&self.deletions),
            root,
            self.logger.clone(),
        )?;
        Ok(Bag::new(Box::new(inner)))
    }

    fn leader_queue(&self, path: String) -> Result<LeaderQueue> {
        let root = Client::path_from_key(PREFIX_LEADER_QUEUE, &path);
        let inner = ZookeeperLeaderQueue::new(
            Arc::clone(&self.client),
            Arc::clone(&self.deletions),
            root,
            self.logger.clone(),
        )?;
        Ok(LeaderQueue::new(Box::new(inner)))
    }

    fn discovery(&self) -> Discovery {
        let inner = ZookeeperDiscovery::new(
            Arc::clone(&self.client),
            Arc::clone(&self.local_store),
            self.discovery_root.clone(),
            self.logger.clone(),
        );
        Discovery::new(Box::new(inner))
    }

    fn discovery_multi(&self) -> DiscoveryMulti {
        let inner = ZookeeperDiscovery::new(
            Arc::clone(&self.client),
            Arc::clone(&self.local_store),
            self.discovery_root.clone(),
            self.logger.clone(),
        );
        DiscoveryMulti::new(Box::new(inner))
    }
}
