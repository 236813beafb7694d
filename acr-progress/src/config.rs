/// Per-task progress history is bounded to the most recent N entries.
pub const MAX_HISTORY_PER_TASK: usize = 1000;

/// Topic `reportProgress` optionally publishes to.
pub const PROGRESS_TOPIC: &str = "progress";
