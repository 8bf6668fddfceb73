use super::backend::BagCallback;
use super::backend::BagBehaviour;
use super::Result;


/// An unordered, multi-producer set of opaque items mirrored from zookeeper.
///
/// Items are added with [`Bag::add`] and observed by every `Bag` instance
/// opened on the same path, including ones in other processes. Add/remove
/// notifications are delivered to callbacks registered with
/// [`Bag::add_listeners`]; registration also returns a snapshot of the ids
/// live at that instant, which the caller is responsible for reconciling
/// with any callbacks fired afterwards (no replay is performed).
pub struct Bag(Box<dyn BagBehaviour>);

impl Bag {
    pub(crate) fn new(inner: Box<dyn BagBehaviour>) -> Self {
        Bag(inner)
    }
}

impl Bag {
    /// Add an item to the bag, returning its assigned id.
    ///
    /// When `ephemeral` is true the item is removed automatically if this
    /// process's coordinator session ends.
    pub fn add(&self, data: Vec<u8>, ephemeral: bool) -> Result<i64> {
        self.0.add(data, ephemeral)
    }

    /// Remove an item by id. Returns `false` if it was already gone.
    pub fn remove(&self, id: i64) -> Result<bool> {
        self.0.remove(id)
    }

    /// Fetch the current payload for an item, if it is still present.
    pub fn get(&self, id: i64) -> Result<Option<Vec<u8>>> {
        self.0.get(id)
    }

    /// Register add/remove callbacks, returning a snapshot of current ids.
    pub fn add_listeners(
        &self,
        add: Option<BagCallback>,
        remove: Option<BagCallback>,
    ) -> Result<Vec<i64>> {
        self.0.add_listeners(add, remove)
    }

    /// Snapshot of all ids currently believed to be live.
    pub fn get_items(&self) -> Result<Vec<i64>> {
        self.0.get_items()
    }
}
