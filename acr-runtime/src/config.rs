/// Cadence at which the owning process should invoke [`crate::AcrRuntime::tick`]
/// (spec §5, §6). Subsystems expose their own finer-grained timeout constants;
/// this is only the recommended driver-loop period.
pub const DEFAULT_TICK_MS: u64 = 100;
