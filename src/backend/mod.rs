use std::sync::Arc;

use super::NodeId;
use super::Result;
use super::bag::Bag;
use super::discovery::Discovery;
use super::discovery::DiscoveryMulti;
use super::leader_queue::Candidate;
use super::leader_queue::LeaderQueue;

pub mod zookeeper;


/// Distributed coordination backend interface.
///
/// Implemented by the zookeeper backend and, for tests, by the in-process
/// mock backend in `crate::mock`.
pub trait Backend: Send + Sync {
    /// Get the ID of the current node.
    fn node_id(&self) -> &NodeId;

    /// Open (creating if needed) the distributed bag rooted at `path`.
    fn bag(&self, path: String) -> Result<Bag>;

    /// Open (creating if needed) the leader queue rooted at `path`.
    fn leader_queue(&self, path: String) -> Result<LeaderQueue>;

    /// Open the single-result discovery view, rooted at the backend's
    /// configured discovery root.
    fn discovery(&self) -> Discovery;

    /// Open the all-results discovery view, rooted at the backend's
    /// configured discovery root.
    fn discovery_multi(&self) -> DiscoveryMulti;
}


/// Behaviour a concrete bag backend (zookeeper, mock) must implement.
///
/// `Bag` is the public facade wrapping a `Box<dyn BagBehaviour>`.
pub trait BagBehaviour: Send + Sync {
    fn add(&self, data: Vec<u8>, ephemeral: bool) -> Result<i64>;
    fn remove(&self, id: i64) -> Result<bool>;
    fn get(&self, id: i64) -> Result<Option<Vec<u8>>>;
    fn add_listeners(
        &self,
        add: Option<BagCallback>,
        remove: Option<BagCallback>,
    ) -> Result<Vec<i64>>;
    fn get_items(&self) -> Result<Vec<i64>>;
}

/// Callback invoked when a bag item is added or removed.
///
/// Returning `CallbackOutcome::Cancel` unregisters the callback: this is the
/// Rust stand-in for the "callback raised a cancellation exception" protocol
/// described for `DeletedWatch`.
pub type BagCallback = Box<dyn Fn(i64) -> CallbackOutcome + Send + Sync>;


/// Behaviour a concrete leader queue backend must implement.
pub trait LeaderQueueBehaviour: Send + Sync {
    fn add_candidate(&self, candidate: Arc<dyn Candidate>, metadata: Option<Vec<u8>>) -> Result<bool>;
    fn remove_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool>;
    fn has_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool>;
}


/// One discovery provider record, decoded from its YAML wire payload.
pub type Record = serde_yaml::Value;

/// Callback invoked when the live provider set for a discovery path changes.
///
/// Receives the znode path that changed and the current records for it (a
/// single-element slice for the single-result flavor, any length for multi).
pub type DiscoveryCallback = Box<dyn Fn(&str, &[Record]) + Send + Sync>;

/// Behaviour a concrete discovery backend must implement.
pub trait DiscoveryBehaviour: Send + Sync {
    fn load_config(
        &self,
        class: &str,
        name: &str,
        callback: Option<DiscoveryCallback>,
    ) -> Result<Vec<Record>>;
    fn get_service_classes(&self) -> Result<Vec<String>>;
    fn get_service_names(&self, class: &str) -> Result<Vec<String>>;
    fn count_nodes(&self, class: &str, name: &str) -> Result<usize>;
    fn write_distributed_config(
        &self,
        class: &str,
        name: &str,
        record: Record,
        key: Option<String>,
        interface: &str,
        ephemeral: bool,
    ) -> Result<String>;
    fn remove_stale_config(&self, class: &str, name: &str, key: &str) -> Result<()>;
}


/// Outcome of a user callback, used to implement unsubscribe-on-cancel.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum CallbackOutcome {
    Continue,
    Cancel,
}
