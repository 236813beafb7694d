/// Node identity this process stamps onto CRDT tags and vector-clock
/// increments when no explicit node id is supplied.
pub const DEFAULT_NODE_ID: &str = "local";

/// The pending-operations log per plan is bounded like the message log and
/// progress history, trimming oldest-first on insertion.
pub const MAX_PENDING_OPERATIONS: usize = 1000;
