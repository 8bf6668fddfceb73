use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;

use failure::ResultExt;
use slog::Logger;

use zookeeper::Acl;
use zookeeper::CreateMode;
use zookeeper::ZkError;

use super::super::super::counter;
use super::super::super::metrics::LEADER_QUEUE_ADD_FAIL;
use super::super::super::metrics::LEADER_QUEUE_ELECTED_TOTAL;
use super::super::super::ErrorKind;
use super::super::super::Result;
use super::super::LeaderQueueBehaviour;
use super::client::Client;
use super::constants::CANDIDATE_DIR;
use super::constants::PREFIX_CANDIDATE;
use super::deleted_watch::DeletionRegistry;
use crate::leader_queue::Candidate;

type CandidateKey = usize;

fn key_of(candidate: &Arc<dyn Candidate>) -> CandidateKey {
    Arc::as_ptr(candidate) as *const () as CandidateKey
}

struct LocalCandidate {
    candidate: Arc<dyn Candidate>,
    counter: i64,
    znode: String,
}

/// Shared state cloned into every predecessor-watch closure.
///
/// Kept separate from `ZookeeperLeaderQueue` so closures only need to clone a
/// handful of `Arc`s to become `'static`, rather than borrow the owning
/// struct.
#[derive(Clone)]
struct Shared {
    client: Arc<Client>,
    deletions: Arc<DeletionRegistry>,
    logger: Logger,
    root: String,
    local: Arc<Mutex<HashMap<CandidateKey, LocalCandidate>>>,
}

impl Shared {
    fn candidate_dir(&self) -> String {
        format!("{}/{}", self.root, CANDIDATE_DIR)
    }

    /// Compute and (re-)install this candidate's predecessor watch, electing
    /// it if it turns out to have none.
    fn refresh_predecessor(&self, key: CandidateKey) {
        if let Err(error) = self.refresh_predecessor_inner(key) {
            error!(self.logger, "Failed to refresh leader queue predecessor"; "error" => %error);
        }
    }

    fn refresh_predecessor_inner(&self, key: CandidateKey) -> Result<()> {
        let keeper = self.client.get()?;
        let candidate_dir = self.candidate_dir();
        let children = Client::get_children(&keeper, &candidate_dir, false)
            .with_context(|_| ErrorKind::Backend("leader queue children lookup"))?;

        let (my_counter, candidate) = {
            let local = self.local.lock().expect("ZookeeperLeaderQueue::local poisoned");
            match local.get(&key) {
                Some(entry) => (entry.counter, Arc::clone(&entry.candidate)),
                None => return Ok(()),
            }
        };

        let predecessor = counter::min_predecessor(&children, my_counter);
        if predecessor == counter::NONE {
            LEADER_QUEUE_ELECTED_TOTAL.inc();
            debug!(self.logger, "Candidate elected leader"; "root" => &self.root, "counter" => my_counter);
            candidate.on_elected();
            return Ok(());
        }

        let predecessor_path = format!("{}/{}", candidate_dir, counter::counter_path(PREFIX_CANDIDATE, predecessor));
        let shared = self.clone();
        self.deletions.watch(
            &predecessor_path,
            Box::new(move || shared.refresh_predecessor(key)),
        )
    }
}

/// Zookeeper-backed `LeaderQueueBehaviour`.
///
/// Candidates are sequence znodes under `<root>/candidate`. Each local
/// candidate watches only its immediate predecessor (the greatest present
/// counter strictly less than its own), so a predecessor's failure produces
/// at most one notification per local candidate instead of a thundering herd
/// on a single container watch. This matches the election rework the
/// zookeeper recipe suggests over watching the whole candidate container.
pub struct ZookeeperLeaderQueue {
    shared: Shared,
}

impl ZookeeperLeaderQueue {
    pub fn new(client: Arc<Client>, deletions: Arc<DeletionRegistry>, root: String, logger: Logger) -> Result<ZookeeperLeaderQueue> {
        let keeper = client.get()?;
        Client::create_recursive(&keeper, &format!("{}/{}", root, CANDIDATE_DIR))?;
        Ok(ZookeeperLeaderQueue {
            shared: Shared {
                client,
                deletions,
                logger,
                root,
                local: Arc::new(Mutex::new(HashMap::new())),
            },
        })
    }
}

impl LeaderQueueBehaviour for ZookeeperLeaderQueue {
    fn add_candidate(&self, candidate: Arc<dyn Candidate>, metadata: Option<Vec<u8>>) -> Result<bool> {
        let key = key_of(&candidate);
        {
            let local = self.shared.local.lock().expect("ZookeeperLeaderQueue::local poisoned");
            if local.contains_key(&key) {
                return Ok(false);
            }
        }

        let keeper = self.shared.client.get().map_err(|error| {
            LEADER_QUEUE_ADD_FAIL.inc();
            error
        })?;
        let candidate_prefix = format!("{}/{}", self.shared.candidate_dir(), PREFIX_CANDIDATE);
        let payload = metadata.unwrap_or_default();
        let created = match Client::create(&keeper, &candidate_prefix, payload, Acl::open_unsafe().clone(), CreateMode::EphemeralSequential) {
            Ok(created) => created,
            Err(error) => {
                LEADER_QUEUE_ADD_FAIL.inc();
                Err(error).with_context(|_| ErrorKind::Backend("leader queue add candidate"))?
            }
        };
        let counter = counter::counter_value(&created)
            .ok_or_else(|| crate::Error::from(ErrorKind::Decode("leader queue candidate sequence number")))?;

        {
            let mut local = self.shared.local.lock().expect("ZookeeperLeaderQueue::local poisoned");
            local.insert(
                key,
                LocalCandidate {
                    candidate,
                    counter,
                    znode: created,
                },
            );
        }
        self.shared.refresh_predecessor(key);
        Ok(true)
    }

    fn remove_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        let key = key_of(candidate);
        let znode = {
            let mut local = self.shared.local.lock().expect("ZookeeperLeaderQueue::local poisoned");
            match local.remove(&key) {
                Some(entry) => entry.znode,
                None => return Ok(false),
            }
        };
        let keeper = self.shared.client.get()?;
        match Client::delete(&keeper, &znode, None) {
            Ok(()) | Err(ZkError::NoNode) => Ok(true),
            Err(error) => Err(error).with_context(|_| ErrorKind::Backend("leader queue remove candidate"))?,
        }
    }

    fn has_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        let key = key_of(candidate);
        let local = self.shared.local.lock().expect("ZookeeperLeaderQueue::local poisoned");
        Ok(local.contains_key(&key))
    }
}
