use std::sync::Arc;
use std::sync::Mutex;

use super::super::backend::LeaderQueueBehaviour;
use super::super::leader_queue::Candidate;
use super::super::Result;

fn key_of(candidate: &Arc<dyn Candidate>) -> usize {
    Arc::as_ptr(candidate) as *const () as usize
}

/// Shared, in-process state backing every `MockLeaderQueue` opened on the
/// same path. Candidates form a FIFO queue; the head is always the elected
/// one, mirroring the zookeeper backend's predecessor chain without needing
/// any watches.
#[derive(Default)]
pub struct MockLeaderQueueState {
    candidates: Mutex<Vec<Arc<dyn Candidate>>>,
}

pub struct MockLeaderQueue {
    pub state: Arc<MockLeaderQueueState>,
}

impl LeaderQueueBehaviour for MockLeaderQueue {
    fn add_candidate(&self, candidate: Arc<dyn Candidate>, _metadata: Option<Vec<u8>>) -> Result<bool> {
        let key = key_of(&candidate);
        let elect = {
            let mut candidates = self.state.candidates.lock().expect("MockLeaderQueueState::candidates poisoned");
            if candidates.iter().any(|existing| key_of(existing) == key) {
                return Ok(false);
            }
            let elect = candidates.is_empty();
            candidates.push(Arc::clone(&candidate));
            elect
        };
        if elect {
            candidate.on_elected();
        }
        Ok(true)
    }

    fn remove_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        let key = key_of(candidate);
        let next = {
            let mut candidates = self.state.candidates.lock().expect("MockLeaderQueueState::candidates poisoned");
            let position = match candidates.iter().position(|existing| key_of(existing) == key) {
                Some(position) => position,
                None => return Ok(false),
            };
            candidates.remove(position);
            if position == 0 {
                candidates.first().cloned()
            } else {
                None
            }
        };
        if let Some(next) = next {
            next.on_elected();
        }
        Ok(true)
    }

    fn has_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        let key = key_of(candidate);
        let candidates = self.state.candidates.lock().expect("MockLeaderQueueState::candidates poisoned");
        Ok(candidates.iter().any(|existing| key_of(existing) == key))
    }
}
