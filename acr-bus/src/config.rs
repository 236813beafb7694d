/// Default processing tick cadence in milliseconds.
pub const PROCESSING_TICK_MS: u64 = 100;

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: i64 = 30;

/// Default message expiry in seconds.
pub const DEFAULT_MESSAGE_EXPIRY_SECS: i64 = 3600;

/// Bounded size of the append-only message log.
pub const MAX_MESSAGE_LOG: usize = 1000;
