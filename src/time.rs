use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch. The only clock read in the engine;
/// kept as a single function so it can be swapped for a fixed clock in tests.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64
}
