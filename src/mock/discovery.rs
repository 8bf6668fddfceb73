use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use super::super::backend::DiscoveryBehaviour;
use super::super::backend::DiscoveryCallback;
use super::super::backend::Record;
use super::super::discovery::stamp_metadata;
use super::super::discovery::validate_record;
use super::super::Result;

type ServiceKey = (String, String);

/// Shared, in-process state backing every `MockDiscovery` view opened on the
/// same `MockCoordinator`.
#[derive(Default)]
pub struct MockDiscoveryState {
    records: Mutex<HashMap<ServiceKey, Vec<Record>>>,
    callbacks: Mutex<HashMap<ServiceKey, Vec<DiscoveryCallback>>>,
}

pub struct MockDiscovery {
    pub state: Arc<MockDiscoveryState>,
}

impl DiscoveryBehaviour for MockDiscovery {
    fn load_config(&self, class: &str, name: &str, callback: Option<DiscoveryCallback>) -> Result<Vec<Record>> {
        let key = (class.to_string(), name.to_string());
        if let Some(callback) = callback {
            self.state
                .callbacks
                .lock()
                .expect("MockDiscoveryState::callbacks poisoned")
                .entry(key.clone())
                .or_insert_with(Vec::new)
                .push(callback);
        }
        Ok(self
            .state
            .records
            .lock()
            .expect("MockDiscoveryState::records poisoned")
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    fn get_service_classes(&self) -> Result<Vec<String>> {
        let records = self.state.records.lock().expect("MockDiscoveryState::records poisoned");
        let mut classes: Vec<String> = records.keys().map(|(class, _)| class.clone()).collect();
        classes.sort();
        classes.dedup();
        Ok(classes)
    }

    fn get_service_names(&self, class: &str) -> Result<Vec<String>> {
        let records = self.state.records.lock().expect("MockDiscoveryState::records poisoned");
        let mut names: Vec<String> = records
            .keys()
            .filter(|(candidate_class, _)| candidate_class == class)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn count_nodes(&self, class: &str, name: &str) -> Result<usize> {
        let key = (class.to_string(), name.to_string());
        Ok(self
            .state
            .records
            .lock()
            .expect("MockDiscoveryState::records poisoned")
            .get(&key)
            .map(Vec::len)
            .unwrap_or(0))
    }

    fn write_distributed_config(
        &self,
        class: &str,
        name: &str,
        mut record: Record,
        key: Option<String>,
        _interface: &str,
        _ephemeral: bool,
    ) -> Result<String> {
        validate_record(&record, class)?;
        let key = key.unwrap_or_else(|| "mock".to_string());
        stamp_metadata(&mut record, name, Some(&key));

        let map_key = (class.to_string(), name.to_string());
        {
            let mut records = self.state.records.lock().expect("MockDiscoveryState::records poisoned");
            let entry = records.entry(map_key.clone()).or_insert_with(Vec::new);
            entry.retain(|existing| existing["header"]["metadata"]["key"].as_str() != Some(key.as_str()));
            entry.push(record);
        }
        self.notify(&map_key, class, name);
        Ok(key)
    }

    fn remove_stale_config(&self, class: &str, name: &str, key: &str) -> Result<()> {
        let map_key = (class.to_string(), name.to_string());
        {
            let mut records = self.state.records.lock().expect("MockDiscoveryState::records poisoned");
            if let Some(entry) = records.get_mut(&map_key) {
                entry.retain(|existing| existing["header"]["metadata"]["key"].as_str() != Some(key));
            }
        }
        self.notify(&map_key, class, name);
        Ok(())
    }
}

impl MockDiscovery {
    fn notify(&self, map_key: &ServiceKey, class: &str, name: &str) {
        let callbacks = self.state.callbacks.lock().expect("MockDiscoveryState::callbacks poisoned");
        let callbacks = match callbacks.get(map_key) {
            Some(callbacks) => callbacks,
            None => return,
        };
        let path = format!("{}/{}", class, name);
        let current = self
            .state
            .records
            .lock()
            .expect("MockDiscoveryState::records poisoned")
            .get(map_key)
            .cloned()
            .unwrap_or_default();
        for callback in callbacks {
            callback(&path, &current);
        }
    }
}
