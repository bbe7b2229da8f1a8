//! Trigger Scheduler: a single cooperative loop that evaluates armed
//! triggers against fresh quotes (spec.md §4.5).
//!
//! Each iteration lists triggers with `executable = true`, fetches a fresh
//! quote per trigger, and fires the Trigger Engine's `execute` when the
//! price condition is met. A failure on any one trigger (quote-fetch or
//! execution) is logged and the loop continues — it must not abort the
//! iteration (mirrors the original source's per-row error tolerance in its
//! trigger-evaluation query).

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::gateway::StoreGateway;
use crate::metrics::counters::Counters;
use crate::quote::QuoteOracle;
use crate::trigger::TriggerEngine;

pub struct Scheduler {
    gateway: Arc<dyn StoreGateway>,
    oracle: Arc<QuoteOracle>,
    engine: Arc<TriggerEngine>,
    counters: Counters,
}

impl Scheduler {
    pub fn new(
        gateway: Arc<dyn StoreGateway>,
        oracle: Arc<QuoteOracle>,
        engine: Arc<TriggerEngine>,
        counters: Counters,
    ) -> Self {
        Self {
            gateway,
            oracle,
            engine,
            counters,
        }
    }

    /// Runs the tick loop forever. Intended to be `tokio::spawn`ed once at
    /// startup; never returns under normal operation.
    pub async fn run(self: Arc<Self>, tick: Duration) {
        let mut ticker = interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(every_ms = tick.as_millis(), "trigger scheduler started");

        loop {
            ticker.tick().await;
            self.on_tick().await;
        }
    }

    /// Evaluates all armed triggers once. Public (not just via `run`) so
    /// tests can drive individual ticks deterministically.
    pub async fn on_tick(&self) {
        Counters::incr(&self.counters.scheduler_ticks);

        let triggers = match self.gateway.list_armed_triggers().await {
            Ok(t) => t,
            Err(e) => {
                warn!(error = %e, "failed to list armed triggers; skipping tick");
                return;
            }
        };

        debug!(count = triggers.len(), "evaluating armed triggers");

        for trigger in triggers {
            let txn_id = format!("sched-{}", Uuid::new_v4());

            let price = match self
                .oracle
                .quote_fresh(&trigger.username, &trigger.symbol, &txn_id)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    warn!(tid = %trigger.tid, error = %e, "quote fetch failed; skipping trigger this tick");
                    continue;
                }
            };

            if !TriggerEngine::should_fire(&trigger, price) {
                continue;
            }

            match self.engine.execute(trigger.tid, price).await {
                Ok(()) => {
                    Counters::incr(&self.counters.triggers_executed);
                    info!(tid = %trigger.tid, price, "trigger executed");
                }
                Err(e) => {
                    warn!(tid = %trigger.tid, error = %e, "trigger execution failed");
                }
            }
        }
    }
}
