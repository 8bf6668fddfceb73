use std::sync::Arc;

use super::backend::LeaderQueueBehaviour;
use super::Result;


/// A participant able to run for leadership in a `LeaderQueue`.
///
/// `on_elected` is called exactly once per successful election, without any
/// lock held by the queue, so implementations may call back into the queue
/// (e.g. to register a new candidate) without deadlocking.
pub trait Candidate: Send + Sync {
    fn on_elected(&self);
}


/// FIFO leader-election queue.
///
/// Each enrolled candidate watches only its immediate predecessor in
/// registration order; when a predecessor disappears (its ephemeral znode is
/// deleted, whether by `remove_candidate` or session expiry) the next
/// candidate in line is notified via `Candidate::on_elected`. At most one
/// local candidate holds the "no predecessor" slot at a time.
pub struct LeaderQueue(Box<dyn LeaderQueueBehaviour>);

impl LeaderQueue {
    pub(crate) fn new(inner: Box<dyn LeaderQueueBehaviour>) -> Self {
        LeaderQueue(inner)
    }
}

impl LeaderQueue {
    /// Enroll `candidate`, optionally attaching `metadata` to its candidate
    /// znode. Returns `false` if it was already enrolled.
    pub fn add_candidate(&self, candidate: Arc<dyn Candidate>, metadata: Option<Vec<u8>>) -> Result<bool> {
        self.0.add_candidate(candidate, metadata)
    }

    /// Withdraw `candidate`. Returns `false` if it was not enrolled.
    pub fn remove_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        self.0.remove_candidate(candidate)
    }

    /// Check whether `candidate` is currently enrolled.
    pub fn has_candidate(&self, candidate: &Arc<dyn Candidate>) -> Result<bool> {
        self.0.has_candidate(candidate)
    }
}
