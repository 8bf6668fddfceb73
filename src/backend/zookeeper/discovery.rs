use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use failure::ResultExt;
use if_addrs::get_if_addrs;
use slog::Logger;

use zookeeper::Acl;
use zookeeper::CreateMode;
use zookeeper::ZkError;

use super::super::super::discovery::stamp_metadata;
use super::super::super::discovery::validate_record;
use super::super::super::local_store::LocalStore;
use super::super::super::metrics::DISCOVERY_LOAD_TOTAL;
use super::super::super::metrics::DISCOVERY_WRITE_FAIL;
use super::super::super::ErrorKind;
use super::super::super::Result;
use super::super::DiscoveryBehaviour;
use super::super::DiscoveryCallback;
use super::super::Record;
use super::client::Client;

struct State {
    cache: Mutex<HashMap<String, Vec<Record>>>,
    callbacks: Mutex<HashMap<String, Vec<DiscoveryCallback>>>,
    /// Paths with a currently live zookeeper children watch, keyed by path,
    /// holding the `(class, name)` needed to re-arm it after each fire. This
    /// is the handle map that keeps a path's watch alive across fires instead
    /// of only ever being armed once.
    children: Mutex<HashMap<String, (String, String)>>,
}

/// Shared state cloned into watch closures so they do not borrow the owning
/// `ZookeeperDiscovery`.
#[derive(Clone)]
struct Shared {
    client: Arc<Client>,
    local_store: Arc<LocalStore>,
    logger: Logger,
    root: String,
    state: Arc<State>,
}

impl Shared {
    fn class_path(&self, class: &str) -> String {
        format!("{}/{}", self.root, class)
    }

    fn service_path(&self, class: &str, name: &str) -> String {
        format!("{}/{}/{}", self.root, class, name)
    }

    /// Re-read `path`'s children, revalidate and restamp each record, update
    /// the cache, notify every callback registered for `path`, then re-arm
    /// the watch so it keeps observing `path` across fires.
    fn refresh(&self, path: &str, class: &str, name: &str) {
        let records = self.read_children(path, class, name).unwrap_or_else(|error| {
            warn!(self.logger, "Failed to refresh discovery path"; "path" => path, "error" => %error);
            Vec::new()
        });
        if records.is_empty() {
            warn!(self.logger, "Discovery path has no live providers"; "path" => path);
        }
        self.state
            .cache
            .lock()
            .expect("ZookeeperDiscovery::cache poisoned")
            .insert(path.to_string(), records.clone());
        {
            let callbacks = self.state.callbacks.lock().expect("ZookeeperDiscovery::callbacks poisoned");
            if let Some(callbacks) = callbacks.get(path) {
                for callback in callbacks {
                    callback(path, &records);
                }
            }
        }
        self.rearm(path, class, name);
    }

    /// Re-install the children watch for `path` after a fire, keeping it
    /// alive for the lifetime of the `ZookeeperDiscovery` instance.
    fn rearm(&self, path: &str, class: &str, name: &str) {
        let keeper = match self.client.get() {
            Ok(keeper) => keeper,
            Err(error) => {
                error!(self.logger, "Failed to get zookeeper client to re-arm discovery watch"; "path" => path, "error" => %error);
                return;
            }
        };
        match self.arm(&keeper, path, class, name) {
            Ok(_) => (),
            Err(ZkError::NoNode) => (),
            Err(error) => error!(self.logger, "Failed to re-arm discovery watch"; "path" => path, "error" => ?error),
        }
    }

    fn read_children(&self, path: &str, class: &str, name: &str) -> Result<Vec<Record>> {
        let keeper = self.client.get()?;
        let children = match Client::get_children(&keeper, path, false) {
            Ok(children) => children,
            Err(ZkError::NoNode) => return Ok(Vec::new()),
            Err(error) => return Err(error).with_context(|_| ErrorKind::Backend("discovery children"))?,
        };
        let mut records = Vec::with_capacity(children.len());
        for child in children {
            let child_path = format!("{}/{}", path, child);
            let (data, _stat) = match Client::get_data(&keeper, &child_path, false) {
                Ok(data) => data,
                Err(ZkError::NoNode) => continue,
                Err(error) => return Err(error).with_context(|_| ErrorKind::Backend("discovery get"))?,
            };
            let mut record: Record = serde_yaml::from_slice(&data)
                .with_context(|_| ErrorKind::Decode("discovery record"))?;
            validate_record(&record, class)?;
            stamp_metadata(&mut record, name, Some(&child));
            records.push(record);
        }
        Ok(records)
    }

    fn load_from_local_store(&self, class: &str, name: &str) -> Result<Vec<Record>> {
        let key = format!("discovery/{}/{}", class, name);
        let document = match self.local_store.lookup(&key, None)? {
            Some(document) => document,
            None => return Ok(Vec::new()),
        };
        let records = match document.get("server_list").and_then(|list| list.as_sequence()) {
            Some(list) => list.clone(),
            None => vec![document],
        };
        Ok(records)
    }

    /// Install (or re-install, after it fires) the children watch for `path`.
    ///
    /// Returns the raw zookeeper result so callers can distinguish `NoNode`
    /// (fall back to the local store) from other failures. Records `path` in
    /// the `children` handle map on success so `refresh` knows to re-arm it,
    /// and removes it on `NoNode` since there is nothing left to watch.
    fn arm(&self, keeper: &zookeeper::ZooKeeper, path: &str, class: &str, name: &str) -> zookeeper::ZkResult<Vec<String>> {
        let shared = self.clone();
        let watch_path = path.to_string();
        let watch_class = class.to_string();
        let watch_name = name.to_string();
        let result = Client::get_children_w(keeper, path, move |_event| {
            shared.refresh(&watch_path, &watch_class, &watch_name);
        });
        let mut children = self.state.children.lock().expect("ZookeeperDiscovery::children poisoned");
        match &result {
            Ok(_) => {
                children.insert(path.to_string(), (class.to_string(), name.to_string()));
            }
            Err(ZkError::NoNode) => {
                children.remove(path);
            }
            Err(_) => (),
        }
        result
    }
}

/// Zookeeper-backed `DiscoveryBehaviour`, shared by both the single-result
/// and all-results facades (they differ only in how many records the
/// caller-facing wrapper keeps, not in how records are loaded).
pub struct ZookeeperDiscovery {
    shared: Shared,
}

impl ZookeeperDiscovery {
    pub fn new(client: Arc<Client>, local_store: Arc<LocalStore>, root: String, logger: Logger) -> ZookeeperDiscovery {
        ZookeeperDiscovery {
            shared: Shared {
                client,
                local_store,
                logger,
                root,
                state: Arc::new(State {
                    cache: Mutex::new(HashMap::new()),
                    callbacks: Mutex::new(HashMap::new()),
                    children: Mutex::new(HashMap::new()),
                }),
            },
        }
    }
}

impl DiscoveryBehaviour for ZookeeperDiscovery {
    fn load_config(&self, class: &str, name: &str, callback: Option<DiscoveryCallback>) -> Result<Vec<Record>> {
        let shared = &self.shared;
        let path = shared.service_path(class, name);

        if let Some(callback) = callback {
            let mut callbacks = shared.state.callbacks.lock().expect("ZookeeperDiscovery::callbacks poisoned");
            callbacks.entry(path.clone()).or_insert_with(Vec::new).push(callback);
        }

        if let Some(cached) = shared.state.cache.lock().expect("ZookeeperDiscovery::cache poisoned").get(&path) {
            DISCOVERY_LOAD_TOTAL.with_label_values(&["cache"]).inc();
            return Ok(cached.clone());
        }

        let keeper = shared.client.get()?;
        let children = match shared.arm(&keeper, &path, class, name) {
            Ok(children) => children,
            Err(ZkError::NoNode) => {
                DISCOVERY_LOAD_TOTAL.with_label_values(&["local"]).inc();
                let records = shared.load_from_local_store(class, name)?;
                shared.state.cache.lock().expect("ZookeeperDiscovery::cache poisoned").insert(path, records.clone());
                return Ok(records);
            }
            Err(error) => return Err(error).with_context(|_| ErrorKind::Backend("discovery watch"))?,
        };

        if children.is_empty() {
            DISCOVERY_LOAD_TOTAL.with_label_values(&["local"]).inc();
            let records = shared.load_from_local_store(class, name)?;
            shared.state.cache.lock().expect("ZookeeperDiscovery::cache poisoned").insert(path, records.clone());
            return Ok(records);
        }

        DISCOVERY_LOAD_TOTAL.with_label_values(&["zookeeper"]).inc();
        let records = shared.read_children(&path, class, name)?;
        shared.state.cache.lock().expect("ZookeeperDiscovery::cache poisoned").insert(path, records.clone());
        Ok(records)
    }

    fn get_service_classes(&self) -> Result<Vec<String>> {
        let keeper = self.shared.client.get()?;
        match Client::get_children(&keeper, &self.shared.root, false) {
            Ok(children) => Ok(children),
            Err(ZkError::NoNode) => Ok(Vec::new()),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("discovery classes"))?,
        }
    }

    fn get_service_names(&self, class: &str) -> Result<Vec<String>> {
        let keeper = self.shared.client.get()?;
        match Client::get_children(&keeper, &self.shared.class_path(class), false) {
            Ok(children) => Ok(children),
            Err(ZkError::NoNode) => Ok(Vec::new()),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("discovery names"))?,
        }
    }

    fn count_nodes(&self, class: &str, name: &str) -> Result<usize> {
        let keeper = self.shared.client.get()?;
        match Client::get_children(&keeper, &self.shared.service_path(class, name), false) {
            Ok(children) => Ok(children.len()),
            Err(ZkError::NoNode) => Ok(0),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("discovery count"))?,
        }
    }

    fn write_distributed_config(
        &self,
        class: &str,
        name: &str,
        mut record: Record,
        key: Option<String>,
        interface: &str,
        ephemeral: bool,
    ) -> Result<String> {
        validate_record(&record, class).map_err(|error| {
            DISCOVERY_WRITE_FAIL.inc();
            error
        })?;

        let key = match key {
            Some(key) => key,
            None => interface_address(interface).map_err(|error| {
                DISCOVERY_WRITE_FAIL.inc();
                error
            })?,
        };
        stamp_metadata(&mut record, name, Some(&key));

        let keeper = self.shared.client.get().map_err(|error| {
            DISCOVERY_WRITE_FAIL.inc();
            error
        })?;
        let service_dir = self.shared.service_path(class, name);
        Client::create_recursive(&keeper, &service_dir).map_err(|error| {
            DISCOVERY_WRITE_FAIL.inc();
            error
        })?;

        let znode = format!("{}/{}", service_dir, key);
        match Client::delete(&keeper, &znode, None) {
            Ok(()) | Err(ZkError::NoNode) => (),
            Err(error) => {
                DISCOVERY_WRITE_FAIL.inc();
                Err(error).with_context(|_| ErrorKind::Backend("discovery write (delete stale)"))?
            }
        }

        let payload = serde_yaml::to_vec(&record).with_context(|_| ErrorKind::Encode("discovery record"))?;
        let mode = if ephemeral { CreateMode::Ephemeral } else { CreateMode::Persistent };
        match Client::create(&keeper, &znode, payload, Acl::open_unsafe().clone(), mode) {
            Ok(_) => Ok(key),
            Err(error) => {
                DISCOVERY_WRITE_FAIL.inc();
                Err(error).with_context(|_| ErrorKind::Backend("discovery write"))?
            }
        }
    }

    fn remove_stale_config(&self, class: &str, name: &str, key: &str) -> Result<()> {
        let keeper = self.shared.client.get()?;
        let znode = format!("{}/{}", self.shared.service_path(class, name), key);
        match Client::delete(&keeper, &znode, None) {
            Ok(()) | Err(ZkError::NoNode) => Ok(()),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("discovery remove"))?,
        }
    }
}

/// Resolve `interface`'s local IPv4 address, for `writeDistributedConfig`
/// callers that do not supply an explicit `key`.
fn interface_address(interface: &str) -> Result<String> {
    let addrs = get_if_addrs().with_context(|_| ErrorKind::Backend("interface enumeration"))?;
    addrs
        .into_iter()
        .find(|iface| iface.name == interface && iface.ip().is_ipv4())
        .map(|iface| iface.ip().to_string())
        .ok_or_else(|| ErrorKind::NoInterfaceAddress(interface.to_string()).into())
}
