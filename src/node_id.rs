use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;


/// Unique ID for nodes participating in the coordinator backend.
///
/// Node IDs are primarily used for debugging and introspection: the
/// background registration in `backend::zookeeper::Client` stamps one under
/// the `nodes/` prefix so operators can enumerate live processes.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct NodeId {
    extra: BTreeMap<String, String>,
    id: Uuid,
}

impl NodeId {
    pub fn new() -> NodeId {
        NodeId {
            extra: BTreeMap::new(),
            id: Uuid::new_v4(),
        }
    }

    /// Set the extra attributes attached to this node ID.
    pub fn extra(&mut self, extra: BTreeMap<String, String>) {
        self.extra = extra;
    }
}

impl Default for NodeId {
    fn default() -> NodeId {
        NodeId::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.id.fmt(f)
    }
}
