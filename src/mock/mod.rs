use std::sync::Arc;

mod backend;
mod bag;
mod discovery;
mod leader_queue;

pub use self::backend::MockBackend;
pub use self::bag::MockBagState;
pub use self::discovery::MockDiscoveryState;
pub use self::leader_queue::MockLeaderQueueState;

use super::Coordinator;
use super::NodeId;

/// In-process `Coordinator` backed by `MockBackend`, for tests that exercise
/// coordination logic without a real zookeeper ensemble.
pub struct MockCoordinator {
    backend: Arc<MockBackend>,
}

impl MockCoordinator {
    pub fn new() -> MockCoordinator {
        MockCoordinator {
            backend: Arc::new(MockBackend::new(NodeId::new())),
        }
    }

    /// The `Coordinator` facade for this mock backend.
    pub fn mock(&self) -> Coordinator {
        Coordinator::with_backend(Arc::clone(&self.backend) as Arc<dyn super::backend::Backend>)
    }
}

impl Default for MockCoordinator {
    fn default() -> MockCoordinator {
        MockCoordinator::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use super::super::leader_queue::Candidate;
    use super::MockCoordinator;

    struct CountingCandidate {
        elections: AtomicUsize,
    }

    impl CountingCandidate {
        fn new() -> CountingCandidate {
            CountingCandidate {
                elections: AtomicUsize::new(0),
            }
        }
    }

    impl Candidate for CountingCandidate {
        fn on_elected(&self) {
            self.elections.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bag_add_remove_round_trip() {
        let mock = MockCoordinator::new();
        let bag = mock.mock().bag("test/bag").unwrap();

        let id = bag.add(b"hello".to_vec(), false).unwrap();
        assert_eq!(bag.get(id).unwrap(), Some(b"hello".to_vec()));
        assert_eq!(bag.get_items().unwrap(), vec![id]);

        assert!(bag.remove(id).unwrap());
        assert_eq!(bag.get(id).unwrap(), None);
        assert!(bag.get_items().unwrap().is_empty());
    }

    #[test]
    fn leader_queue_elects_next_on_removal() {
        let mock = MockCoordinator::new();
        let queue = mock.mock().leader_queue("test/queue").unwrap();

        let first = Arc::new(CountingCandidate::new());
        let second = Arc::new(CountingCandidate::new());
        let first_dyn: Arc<dyn Candidate> = first.clone();
        let second_dyn: Arc<dyn Candidate> = second.clone();

        assert!(queue.add_candidate(Arc::clone(&first_dyn), None).unwrap());
        assert_eq!(first.elections.load(Ordering::SeqCst), 1);

        assert!(queue.add_candidate(Arc::clone(&second_dyn), None).unwrap());
        assert_eq!(second.elections.load(Ordering::SeqCst), 0);

        assert!(queue.remove_candidate(&first_dyn).unwrap());
        assert_eq!(second.elections.load(Ordering::SeqCst), 1);
    }
}
