use prometheus::Counter;
use prometheus::CounterVec;
use prometheus::Opts;
use prometheus::Registry;
use slog::Logger;


lazy_static! {
    pub static ref BAG_ADD_TOTAL: Counter = Counter::new(
        "coordinator_bag_add_total",
        "Total number of items added to distributed bags"
    ).expect("Failed to create BAG_ADD_TOTAL counter");

    pub static ref BAG_ADD_FAIL: Counter = Counter::new(
        "coordinator_bag_add_fail",
        "Number of distributed bag add operations that failed"
    ).expect("Failed to create BAG_ADD_FAIL counter");

    pub static ref BAG_REMOVE_TOTAL: Counter = Counter::new(
        "coordinator_bag_remove_total",
        "Total number of distributed bag remove operations"
    ).expect("Failed to create BAG_REMOVE_TOTAL counter");

    pub static ref BAG_REMOVE_FAIL: Counter = Counter::new(
        "coordinator_bag_remove_fail",
        "Number of distributed bag remove operations that failed"
    ).expect("Failed to create BAG_REMOVE_FAIL counter");

    pub static ref LEADER_QUEUE_ELECTED_TOTAL: Counter = Counter::new(
        "coordinator_leader_queue_elected_total",
        "Number of times a local candidate was elected leader"
    ).expect("Failed to create LEADER_QUEUE_ELECTED_TOTAL counter");

    pub static ref LEADER_QUEUE_ADD_FAIL: Counter = Counter::new(
        "coordinator_leader_queue_add_fail",
        "Number of leader queue candidate registrations that failed"
    ).expect("Failed to create LEADER_QUEUE_ADD_FAIL counter");

    pub static ref DISCOVERY_LOAD_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            "coordinator_discovery_load_total",
            "Number of discovery loadConfig calls, by source"
        ),
        &["source"]
    ).expect("Failed to create DISCOVERY_LOAD_TOTAL counter");

    pub static ref DISCOVERY_WRITE_FAIL: Counter = Counter::new(
        "coordinator_discovery_write_fail",
        "Number of writeDistributedConfig calls that failed"
    ).expect("Failed to create DISCOVERY_WRITE_FAIL counter");
}


/// Attempts to register metrics with the Registry.
///
/// Metrics that fail to register are logged and ignored.
pub fn register_metrics(logger: &Logger, registry: &Registry) {
    if let Err(err) = registry.register(Box::new(BAG_ADD_TOTAL.clone())) {
        debug!(logger, "Failed to register BAG_ADD_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(BAG_ADD_FAIL.clone())) {
        debug!(logger, "Failed to register BAG_ADD_FAIL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(BAG_REMOVE_TOTAL.clone())) {
        debug!(logger, "Failed to register BAG_REMOVE_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(BAG_REMOVE_FAIL.clone())) {
        debug!(logger, "Failed to register BAG_REMOVE_FAIL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(LEADER_QUEUE_ELECTED_TOTAL.clone())) {
        debug!(logger, "Failed to register LEADER_QUEUE_ELECTED_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(LEADER_QUEUE_ADD_FAIL.clone())) {
        debug!(logger, "Failed to register LEADER_QUEUE_ADD_FAIL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(DISCOVERY_LOAD_TOTAL.clone())) {
        debug!(logger, "Failed to register DISCOVERY_LOAD_TOTAL"; "error" => ?err);
    }
    if let Err(err) = registry.register(Box::new(DISCOVERY_WRITE_FAIL.clone())) {
        debug!(logger, "Failed to register DISCOVERY_WRITE_FAIL"; "error" => ?err);
    }
    super::backend::zookeeper::register_metrics(logger, registry);
}
