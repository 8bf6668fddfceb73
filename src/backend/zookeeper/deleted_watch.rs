use std::collections::HashMap;
use std::panic::catch_unwind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::Mutex;

use failure::ResultExt;
use slog::Logger;

use zookeeper::WatchedEvent;
use zookeeper::WatchedEventType;
use zookeeper::ZkError;
use zookeeper::ZkState;

use super::super::super::ErrorKind;
use super::super::super::Result;
use super::client::Client;

/// Callback invoked, at most once, when the watched znode is observed deleted.
pub type DeletionCallback = Box<dyn Fn() + Send + Sync>;

/// Per-session registry of "exists -> deleted" watches, keyed by znode path.
///
/// `DistributedBag` (item deletion) and `LeaderQueue` (predecessor deletion)
/// both need this primitive. A single real zookeeper watch is installed per
/// path; additional local listeners for the same path piggyback on it
/// instead of installing a second server-side watch, matching the source's
/// `DeletedWatch` co-listener behaviour.
pub struct DeletionRegistry {
    client: Arc<Client>,
    logger: Logger,
    slots: Arc<Mutex<HashMap<String, Arc<Slot>>>>,
}

struct Slot {
    path: String,
    callbacks: Mutex<Vec<DeletionCallback>>,
}

impl DeletionRegistry {
    pub fn new(client: Arc<Client>, logger: Logger) -> DeletionRegistry {
        DeletionRegistry {
            client,
            logger,
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Watch `path` for deletion, invoking `callback` once it is gone.
    ///
    /// If `path` is not currently present, `callback` is invoked
    /// synchronously before this call returns (matching the "initial exists
    /// check returns absent" case in the one-shot watch contract).
    pub fn watch(&self, path: &str, callback: DeletionCallback) -> Result<()> {
        let mut slots = self.slots.lock().expect("DeletionRegistry::slots poisoned");
        if let Some(slot) = slots.get(path) {
            slot.callbacks
                .lock()
                .expect("DeletedWatch::callbacks poisoned")
                .push(callback);
            return Ok(());
        }
        let slot = Arc::new(Slot {
            path: path.to_string(),
            callbacks: Mutex::new(vec![callback]),
        });
        slots.insert(path.to_string(), Arc::clone(&slot));
        drop(slots);
        self.arm(slot)
    }

    /// Install (or re-install, after a `NoNode` race) the real watch for `slot`.
    fn arm(&self, slot: Arc<Slot>) -> Result<()> {
        let resolved = match Client::resolve(&slot.path) {
            Ok(resolved) => resolved,
            Err(error) => {
                self.fire(&slot);
                return Err(error);
            }
        };
        let keeper = match self.client.get() {
            Ok(keeper) => keeper,
            Err(error) => {
                self.fire(&slot);
                return Err(error);
            }
        };

        let closure_slots = Arc::clone(&self.slots);
        let closure_logger = self.logger.clone();
        let closure_path = slot.path.clone();
        let result = Client::exists_w(&keeper, &resolved, move |event: WatchedEvent| {
            if event.keeper_state != ZkState::Connected {
                trace!(
                    closure_logger, "Ignoring deletion watch event outside CONNECTED state";
                    "path" => &closure_path, "state" => ?event.keeper_state
                );
                return;
            }
            if event.event_type != WatchedEventType::NodeDeleted {
                return;
            }
            let fired = {
                let mut slots = closure_slots.lock().expect("DeletionRegistry::slots poisoned");
                slots.remove(&closure_path)
            };
            if let Some(slot) = fired {
                DeletionRegistry::invoke(&slot, &closure_logger);
            }
        });

        match result {
            Ok(Some(_stat)) => Ok(()),
            Ok(None) => {
                self.fire(&slot);
                Ok(())
            }
            Err(ZkError::NoNode) => {
                self.fire(&slot);
                Ok(())
            }
            Err(error) => {
                self.fire(&slot);
                let result: Result<()> =
                    Err(error).with_context(|_| ErrorKind::Backend("deletion watch arm")).map_err(Into::into);
                result
            }
        }
    }

    /// Remove and invoke `slot`'s listeners, as if deletion had just fired.
    fn fire(&self, slot: &Arc<Slot>) {
        let fired = {
            let mut slots = self.slots.lock().expect("DeletionRegistry::slots poisoned");
            slots.remove(&slot.path)
        };
        if let Some(slot) = fired {
            DeletionRegistry::invoke(&slot, &self.logger);
        }
    }

    fn invoke(slot: &Slot, logger: &Logger) {
        let callbacks = slot.callbacks.lock().expect("DeletedWatch::callbacks poisoned");
        for callback in callbacks.iter() {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback()));
            if let Err(payload) = outcome {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(
                    logger, "Deletion watch callback panicked";
                    "path" => &slot.path, "panic" => message
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    // `DeletionRegistry` is exercised end to end through `mock::MockBag` and
    // `mock::MockLeaderQueue`, which reimplement the same piggyback contract
    // without a real zookeeper session. Direct unit tests here would require
    // a live ensemble.
}
