//! Request-versioning guard for async-derived state.
//!
//! Every place an async fetch result is stored is guarded by a token from
//! a `RequestVersion`: the caller takes a token before dispatching, and the
//! result is applied only if no newer request started in the meantime.
//! Last-request-wins — stale responses are discarded, not cancelled.

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing request counter.
///
/// Shared between the dispatch site and the completion site of an async
/// operation. `begin()` invalidates every token handed out before it.
#[derive(Debug, Default)]
pub struct RequestVersion(AtomicU64);

impl RequestVersion {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Start a new request, invalidating all previously issued tokens.
    pub fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether `token` still identifies the latest request.
    pub fn is_current(&self, token: u64) -> bool {
        self.0.load(Ordering::SeqCst) == token
    }
}
