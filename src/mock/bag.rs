use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use super::super::backend::BagBehaviour;
use super::super::backend::BagCallback;
use super::super::backend::CallbackOutcome;
use super::super::Result;

/// Shared, in-process state backing every `MockBag` opened on the same path.
#[derive(Default)]
pub struct MockBagState {
    next_id: Mutex<i64>,
    items: Mutex<HashMap<i64, Vec<u8>>>,
    add_callbacks: Mutex<Vec<BagCallback>>,
    remove_callbacks: Mutex<Vec<BagCallback>>,
}

pub struct MockBag {
    pub state: Arc<MockBagState>,
}

impl BagBehaviour for MockBag {
    fn add(&self, data: Vec<u8>, _ephemeral: bool) -> Result<i64> {
        let id = {
            let mut next_id = self.state.next_id.lock().expect("MockBagState::next_id poisoned");
            let id = *next_id;
            *next_id += 1;
            id
        };
        self.state.items.lock().expect("MockBagState::items poisoned").insert(id, data);
        let mut callbacks = self.state.add_callbacks.lock().expect("MockBagState::add_callbacks poisoned");
        callbacks.retain(|callback| callback(id) != CallbackOutcome::Cancel);
        Ok(id)
    }

    fn remove(&self, id: i64) -> Result<bool> {
        let removed = self
            .state
            .items
            .lock()
            .expect("MockBagState::items poisoned")
            .remove(&id)
            .is_some();
        if removed {
            let mut callbacks = self.state.remove_callbacks.lock().expect("MockBagState::remove_callbacks poisoned");
            callbacks.retain(|callback| callback(id) != CallbackOutcome::Cancel);
        }
        Ok(removed)
    }

    fn get(&self, id: i64) -> Result<Option<Vec<u8>>> {
        Ok(self.state.items.lock().expect("MockBagState::items poisoned").get(&id).cloned())
    }

    fn add_listeners(&self, add: Option<BagCallback>, remove: Option<BagCallback>) -> Result<Vec<i64>> {
        if let Some(add) = add {
            self.state.add_callbacks.lock().expect("MockBagState::add_callbacks poisoned").push(add);
        }
        if let Some(remove) = remove {
            self.state.remove_callbacks.lock().expect("MockBagState::remove_callbacks poisoned").push(remove);
        }
        self.get_items()
    }

    fn get_items(&self) -> Result<Vec<i64>> {
        Ok(self.state.items.lock().expect("MockBagState::items poisoned").keys().cloned().collect())
    }
}
