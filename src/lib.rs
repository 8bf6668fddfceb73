//! Distributed coordination primitives backed by zookeeper.
//!
//! Provides a distributed bag, a FIFO leader election queue, and a discovery
//! registry (with a local filesystem fallback), all reachable through the
//! single [`Coordinator`] entry point.
#[macro_use]
extern crate failure_derive;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate slog;

mod backend;
mod bag;
mod coordinator;
mod counter;
mod discovery;
mod error;
mod leader_queue;
mod local_store;
mod logging;
mod metrics;
mod node_id;

pub mod config;
pub mod mock;

pub use self::bag::Bag;
pub use self::config::Config;
pub use self::coordinator::Coordinator;
pub use self::discovery::Discovery;
pub use self::discovery::DiscoveryMulti;
pub use self::error::Error;
pub use self::error::ErrorKind;
pub use self::error::Result;
pub use self::leader_queue::Candidate;
pub use self::leader_queue::LeaderQueue;
pub use self::local_store::LocalStore;
pub use self::metrics::register_metrics;
pub use self::node_id::NodeId;
