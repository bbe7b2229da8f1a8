use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide operational counters, exposed for logging/diagnostics only —
/// not a metrics-export surface (spec Non-goals). Scoped to the scheduler,
/// the one component that runs unattended and benefits from a cheap health
/// signal in logs; per-request counts are already visible in the audit log.
#[derive(Clone, Default)]
pub struct Counters {
    pub scheduler_ticks: Arc<AtomicU64>,
    pub triggers_executed: Arc<AtomicU64>,
}

impl Counters {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}
