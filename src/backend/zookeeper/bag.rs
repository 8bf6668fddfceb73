use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::RwLock;

use failure::ResultExt;
use slog::Logger;

use zookeeper::Acl;
use zookeeper::CreateMode;
use zookeeper::ZkError;

use super::super::super::counter;
use super::super::super::metrics::BAG_ADD_FAIL;
use super::super::super::metrics::BAG_ADD_TOTAL;
use super::super::super::metrics::BAG_REMOVE_FAIL;
use super::super::super::metrics::BAG_REMOVE_TOTAL;
use super::super::super::Error;
use super::super::super::ErrorKind;
use super::super::super::Result;
use super::super::BagBehaviour;
use super::super::BagCallback;
use super::super::CallbackOutcome;
use super::client::Client;
use super::constants::BAG_ITEM_DIR;
use super::constants::BAG_TOKEN_DIR;
use super::constants::PREFIX_ITEM;
use super::constants::PREFIX_TOKEN;
use super::deleted_watch::DeletionRegistry;

/// Zookeeper-backed `BagBehaviour`.
///
/// Items live at `<root>/item/item<id>`, compaction tokens at
/// `<root>/token/token<id>`. Observers watch `<root>/token` for children
/// changes; on each change they walk `max_token` up to the newly observed
/// maximum, installing a `DeletionRegistry` watch on each freshly discovered
/// item so its removal is noticed without polling.
pub struct ZookeeperBag {
    client: Arc<Client>,
    deletions: Arc<DeletionRegistry>,
    logger: Logger,
    root: String,
    state: Arc<RwLock<BagState>>,
}

struct BagState {
    ids: HashSet<i64>,
    max_token: i64,
    add_callbacks: Vec<BagCallback>,
    remove_callbacks: Vec<BagCallback>,
}

impl ZookeeperBag {
    pub fn new(client: Arc<Client>, deletions: Arc<DeletionRegistry>, root: String, logger: Logger) -> Result<ZookeeperBag> {
        let keeper = client.get()?;
        Client::create_recursive(&keeper, &format!("{}/{}", root, BAG_ITEM_DIR))?;
        Client::create_recursive(&keeper, &format!("{}/{}", root, BAG_TOKEN_DIR))?;

        let bag = ZookeeperBag {
            client,
            deletions,
            logger,
            root,
            state: Arc::new(RwLock::new(BagState {
                ids: HashSet::new(),
                max_token: counter::NONE,
                add_callbacks: Vec::new(),
                remove_callbacks: Vec::new(),
            })),
        };
        bag.populate_ids(&keeper)?;
        bag.watch_tokens()?;
        Ok(bag)
    }

    fn item_dir(&self) -> String {
        format!("{}/{}", self.root, BAG_ITEM_DIR)
    }

    fn token_dir(&self) -> String {
        format!("{}/{}", self.root, BAG_TOKEN_DIR)
    }

    /// Populate initial ids from the items already present at construction.
    fn populate_ids(&self, keeper: &zookeeper::ZooKeeper) -> Result<()> {
        let children = match Client::get_children(keeper, &self.item_dir(), false) {
            Ok(children) => children,
            Err(ZkError::NoNode) => Vec::new(),
            Err(error) => return Err(error).with_context(|_| ErrorKind::Backend("bag populate"))?,
        };
        let max = counter::max_counter(&children);
        for child in &children {
            if let Some(id) = counter::counter_value(child) {
                self.on_new_id(id);
            }
        }
        let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
        state.max_token = max;
        Ok(())
    }

    fn watch_tokens(&self) -> Result<()> {
        let keeper = self.client.get()?;
        let closure = BagWatchContext {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            deletions: Arc::clone(&self.deletions),
            logger: self.logger.clone(),
            root: self.root.clone(),
        };
        let token_dir = self.token_dir();
        Client::get_children_w(&keeper, &token_dir, move |_event| {
            closure.tokens_changed();
        })
        .with_context(|_| ErrorKind::Backend("bag token watch"))?;
        Ok(())
    }

    fn on_new_id(&self, id: i64) {
        {
            let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
            if !state.ids.insert(id) {
                return;
            }
        }
        {
            let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
            state.add_callbacks.retain(|callback| callback(id) != CallbackOutcome::Cancel);
        }
        // Dispatch the add notification above before arming the deletion watch: if the
        // item znode is already gone, `deletions.watch` fires its callback synchronously,
        // and that must never be observed before this id's add notification.
        let item_path = format!("{}/{}", self.item_dir(), counter::counter_path(PREFIX_ITEM, id));
        let state = Arc::clone(&self.state);
        let logger = self.logger.clone();
        let result = self.deletions.watch(
            &item_path,
            Box::new(move || ZookeeperBag::on_delete_id_static(&state, id, &logger)),
        );
        if let Err(error) = result {
            error!(self.logger, "Failed to install bag item deletion watch"; "id" => id, "error" => %error);
        }
    }

    fn on_delete_id_static(state: &Arc<RwLock<BagState>>, id: i64, logger: &Logger) {
        {
            let mut state = state.write().expect("ZookeeperBag::state poisoned");
            if !state.ids.remove(&id) {
                return;
            }
        }
        debug!(logger, "Bag item removed"; "id" => id);
        let mut state = state.write().expect("ZookeeperBag::state poisoned");
        state.remove_callbacks.retain(|callback| callback(id) != CallbackOutcome::Cancel);
    }
}

/// Data a token-watch closure needs, cloned into the closure on each re-arm.
struct BagWatchContext {
    client: Arc<Client>,
    state: Arc<RwLock<BagState>>,
    deletions: Arc<DeletionRegistry>,
    logger: Logger,
    root: String,
}

impl BagWatchContext {
    fn item_dir(&self) -> String {
        format!("{}/{}", self.root, BAG_ITEM_DIR)
    }

    fn token_dir(&self) -> String {
        format!("{}/{}", self.root, BAG_TOKEN_DIR)
    }

    fn tokens_changed(&self) {
        let keeper = match self.client.get() {
            Ok(keeper) => keeper,
            Err(error) => {
                error!(self.logger, "Failed to refresh bag after token change"; "error" => %error);
                return;
            }
        };
        let token_dir = self.token_dir();
        let closure = BagWatchContext {
            client: Arc::clone(&self.client),
            state: Arc::clone(&self.state),
            deletions: Arc::clone(&self.deletions),
            logger: self.logger.clone(),
            root: self.root.clone(),
        };
        let children = match Client::get_children_w(&keeper, &token_dir, move |_event| {
            closure.tokens_changed();
        }) {
            Ok(children) => children,
            Err(ZkError::NoNode) => return,
            Err(error) => {
                error!(self.logger, "Failed to list bag tokens"; "error" => ?error);
                return;
            }
        };

        let new_max = counter::max_counter(&children);
        loop {
            let next = {
                let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
                if state.max_token >= new_max {
                    break;
                }
                state.max_token += 1;
                state.max_token
            };
            self.on_new_id(next);
        }
    }

    fn on_new_id(&self, id: i64) {
        {
            let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
            if !state.ids.insert(id) {
                return;
            }
        }
        {
            let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
            state.add_callbacks.retain(|callback| callback(id) != CallbackOutcome::Cancel);
        }
        // Dispatch the add notification above before arming the deletion watch: if the
        // item znode is already gone, `deletions.watch` fires its callback synchronously,
        // and that must never be observed before this id's add notification.
        let item_path = format!("{}/{}", self.item_dir(), counter::counter_path(PREFIX_ITEM, id));
        let state = Arc::clone(&self.state);
        let logger = self.logger.clone();
        let result = self.deletions.watch(
            &item_path,
            Box::new(move || ZookeeperBag::on_delete_id_static(&state, id, &logger)),
        );
        if let Err(error) = result {
            error!(self.logger, "Failed to install bag item deletion watch"; "id" => id, "error" => %error);
        }
    }
}

impl BagBehaviour for ZookeeperBag {
    fn add(&self, data: Vec<u8>, ephemeral: bool) -> Result<i64> {
        BAG_ADD_TOTAL.inc();
        let keeper = self.client.get().map_err(|error| {
            BAG_ADD_FAIL.inc();
            error
        })?;
        let mode = if ephemeral { CreateMode::EphemeralSequential } else { CreateMode::PersistentSequential };
        let item_prefix = format!("{}/{}", self.item_dir(), PREFIX_ITEM);
        let created = match Client::create(&keeper, &item_prefix, data, Acl::open_unsafe().clone(), mode) {
            Ok(created) => created,
            Err(error) => {
                BAG_ADD_FAIL.inc();
                Err(error).with_context(|_| ErrorKind::Backend("bag add"))?
            }
        };
        let id = counter::counter_value(&created)
            .ok_or_else(|| Error::from(ErrorKind::Decode("bag item sequence number")))?;

        let token_path = format!("{}/{}", self.token_dir(), counter::counter_path(PREFIX_TOKEN, id));
        match Client::create(&keeper, &token_path, Vec::new(), Acl::open_unsafe().clone(), CreateMode::Persistent) {
            Ok(_) | Err(ZkError::NodeExists) => (),
            Err(error) => warn!(self.logger, "Failed to create bag token"; "id" => id, "error" => ?error),
        }
        self.cleanup_tokens(&keeper, id);
        Ok(id)
    }

    fn remove(&self, id: i64) -> Result<bool> {
        BAG_REMOVE_TOTAL.inc();
        let keeper = self.client.get().map_err(|error| {
            BAG_REMOVE_FAIL.inc();
            error
        })?;
        let item_path = format!("{}/{}", self.item_dir(), counter::counter_path(PREFIX_ITEM, id));
        match Client::delete(&keeper, &item_path, None) {
            Ok(()) => Ok(true),
            Err(ZkError::NoNode) => Ok(false),
            Err(error) => {
                BAG_REMOVE_FAIL.inc();
                Err(error).with_context(|_| ErrorKind::Backend("bag remove"))?
            }
        }
    }

    fn get(&self, id: i64) -> Result<Option<Vec<u8>>> {
        let keeper = self.client.get()?;
        let item_path = format!("{}/{}", self.item_dir(), counter::counter_path(PREFIX_ITEM, id));
        match Client::get_data(&keeper, &item_path, false) {
            Ok((data, _stat)) => Ok(Some(data)),
            Err(ZkError::NoNode) => Ok(None),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("bag get"))?,
        }
    }

    fn add_listeners(&self, add: Option<BagCallback>, remove: Option<BagCallback>) -> Result<Vec<i64>> {
        let mut state = self.state.write().expect("ZookeeperBag::state poisoned");
        if let Some(add) = add {
            state.add_callbacks.push(add);
        }
        if let Some(remove) = remove {
            state.remove_callbacks.push(remove);
        }
        Ok(state.ids.iter().cloned().collect())
    }

    fn get_items(&self) -> Result<Vec<i64>> {
        let state = self.state.read().expect("ZookeeperBag::state poisoned");
        Ok(state.ids.iter().cloned().collect())
    }
}

impl ZookeeperBag {
    /// Delete every token with id strictly less than `current`, keeping
    /// `<root>/token` sized O(1) in steady state.
    fn cleanup_tokens(&self, keeper: &zookeeper::ZooKeeper, current: i64) {
        let token_dir = self.token_dir();
        let children = match Client::get_children(keeper, &token_dir, false) {
            Ok(children) => children,
            Err(error) => {
                warn!(self.logger, "Failed to list bag tokens for cleanup"; "error" => ?error);
                return;
            }
        };
        for child in children {
            let value = match counter::counter_value(&child) {
                Some(value) => value,
                None => continue,
            };
            if value >= current {
                continue;
            }
            let path = format!("{}/{}", token_dir, child);
            match Client::delete(keeper, &path, None) {
                Ok(()) | Err(ZkError::NoNode) => (),
                Err(error) => warn!(self.logger, "Failed to delete stale bag token"; "path" => &path, "error" => ?error),
            }
        }
    }
}
