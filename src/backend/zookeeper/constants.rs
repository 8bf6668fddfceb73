/// Root under which per-process debug registrations are stored.
pub const PREFIX_NODE: &str = "/nodes";

/// Root under which distributed bag containers are stored.
pub const PREFIX_BAG: &str = "/bags";

/// Root under which leader queue containers are stored.
pub const PREFIX_LEADER_QUEUE: &str = "/queues";

/// Name of the children directory holding a bag's live items.
pub const BAG_ITEM_DIR: &str = "item";

/// Name of the children directory holding a bag's compaction tokens.
pub const BAG_TOKEN_DIR: &str = "token";

/// Sequence prefix for bag item znodes.
pub const PREFIX_ITEM: &str = "item";

/// Sequence prefix for bag token znodes.
pub const PREFIX_TOKEN: &str = "token";

/// Name of the children directory holding a leader queue's candidates.
pub const CANDIDATE_DIR: &str = "candidate";

/// Sequence prefix for leader queue candidate znodes.
pub const PREFIX_CANDIDATE: &str = "candidate";
