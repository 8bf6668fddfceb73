use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use super::super::backend::Backend;
use super::super::bag::Bag;
use super::super::discovery::Discovery;
use super::super::discovery::DiscoveryMulti;
use super::super::leader_queue::LeaderQueue;
use super::super::NodeId;
use super::super::Result;
use super::bag::MockBag;
use super::bag::MockBagState;
use super::discovery::MockDiscovery;
use super::discovery::MockDiscoveryState;
use super::leader_queue::MockLeaderQueue;
use super::leader_queue::MockLeaderQueueState;

/// In-process stand-in for `backend::zookeeper::Zookeeper`, used by
/// `MockCoordinator`.
///
/// Every `bag`/`leader_queue` path gets its own independent state, lazily
/// created on first open; discovery has a single shared state, matching the
/// zookeeper backend's single discovery root per coordinator.
pub struct MockBackend {
    node_id: NodeId,
    bags: Mutex<HashMap<String, Arc<MockBagState>>>,
    leader_queues: Mutex<HashMap<String, Arc<MockLeaderQueueState>>>,
    discovery: Arc<MockDiscoveryState>,
}

impl MockBackend {
    pub fn new(node_id: NodeId) -> MockBackend {
        MockBackend {
            node_id,
            bags: Mutex::new(HashMap::new()),
            leader_queues: Mutex::new(HashMap::new()),
            discovery: Arc::new(MockDiscoveryState::default()),
        }
    }
}

impl Backend for MockBackend {
    fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn bag(&self, path: String) -> Result<Bag> {
        let state = {
            let mut bags = self.bags.lock().expect("MockBackend::bags poisoned");
            Arc::clone(bags.entry(path).or_insert_with(|| Arc::new(MockBagState::default())))
        };
        Ok(Bag::new(Box::new(MockBag { state })))
    }

    fn leader_queue(&self, path: String) -> Result<LeaderQueue> {
        let state = {
            let mut leader_queues = self.leader_queues.lock().expect("MockBackend::leader_queues poisoned");
            Arc::clone(
                leader_queues
                    .entry(path)
                    .or_insert_with(|| Arc::new(MockLeaderQueueState::default())),
            )
        };
        Ok(LeaderQueue::new(Box::new(MockLeaderQueue { state })))
    }

    fn discovery(&self) -> Discovery {
        let state = Arc::clone(&self.discovery);
        Discovery::new(Box::new(MockDiscovery { state }))
    }

    fn discovery_multi(&self) -> DiscoveryMulti {
        let state = Arc::clone(&self.discovery);
        DiscoveryMulti::new(Box::new(MockDiscovery { state }))
    }
}
