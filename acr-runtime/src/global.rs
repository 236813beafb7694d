//! Process-wide singleton access to a single [`AcrRuntime`] instance.
//!
//! A server process wants exactly one runtime for its lifetime; tests want a
//! fresh one per case. `once_cell::sync::OnceCell` gives the former without
//! forcing every caller to thread an `Arc<AcrRuntime>` through, and
//! [`reset`] gives the latter an explicit escape hatch rather than leaving
//! stale state wedged in a `lazy_static`.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::AcrRuntime;

static RUNTIME: OnceCell<RwLock<Arc<AcrRuntime>>> = OnceCell::new();

/// Returns the process-wide runtime, constructing it with
/// [`AcrRuntime::with_defaults`] on first access.
pub fn runtime() -> Arc<AcrRuntime> {
    RUNTIME
        .get_or_init(|| RwLock::new(Arc::new(AcrRuntime::with_defaults())))
        .read()
        .clone()
}

/// Replaces the process-wide runtime with a caller-supplied instance, for
/// callers that need non-default wiring (a custom event sink, for example).
pub fn install(runtime: AcrRuntime) {
    let cell = RUNTIME.get_or_init(|| RwLock::new(Arc::new(AcrRuntime::with_defaults())));
    *cell.write() = Arc::new(runtime);
}

/// Tears down the process-wide runtime, replacing it with a fresh default
/// instance. Tests that rely on global state call this between cases; a
/// long-running server never needs to.
pub fn reset() {
    install(AcrRuntime::with_defaults());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_replaces_the_singleton_with_a_fresh_instance() {
        let first = runtime();
        reset();
        let second = runtime();
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
