/// Default heartbeat interval in seconds (spec §6).
pub const HEARTBEAT_INTERVAL_SECS: i64 = 30;

/// Consecutive missed heartbeats before an agent is marked `offline`.
pub const MISSED_HEARTBEAT_THRESHOLD: u32 = 3;

/// How long a `crashed` record is retained before garbage collection.
pub const CRASHED_RETENTION_SECS: i64 = 3600;
