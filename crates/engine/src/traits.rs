use std::time::Instant;

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Source of "now" for timed state transitions (the error display reset).
///
/// Production code reads the system monotonic clock; tests and scripted
/// scenarios drive a manual clock so timing is deterministic.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}
