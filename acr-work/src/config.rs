/// A claim is auto-released back to `available` if the claimant does not
/// `startTask` within this window (spec §6 defaults).
pub const CLAIM_TIMEOUT_SECS: i64 = 300;

/// A `ProgressTimeout` event fires once if an in-progress task receives no
/// progress report within this window. Firing is observational only — the
/// task itself is left in progress.
pub const PROGRESS_TIMEOUT_SECS: i64 = 600;

/// Default retry budget for a newly created task when not overridden.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Topic `completeTask`/`failTask`/`claimTask`/etc. publish status changes to.
pub const TASK_STATUS_TOPIC: &str = "task.status";
