use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::db::gateway::StoreGateway;
use crate::db::types::{Side, Trigger};
use crate::error::AppError;

/// Persistent conditional orders: amount-set, price-set, cancel, execute
/// (spec.md §4.4). Each public method maps to exactly one `StoreGateway`
/// transaction; this layer adds no policy beyond delegating to it.
///
/// SELL-trigger semantics follow spec.md's own resolution of the source's
/// inconsistent drafts: shares are debited at set-amount time, the trigger
/// fires when the observed price is at or above `triggerPrice`, and
/// execution credits `shares * price` without returning the shares.
pub struct TriggerEngine {
    gateway: Arc<dyn StoreGateway>,
}

impl TriggerEngine {
    pub fn new(gateway: Arc<dyn StoreGateway>) -> Self {
        Self { gateway }
    }

    #[instrument(skip(self), fields(username = %username, symbol = %symbol, side = ?side))]
    pub async fn set_amount(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        amount_hundredths: i64,
    ) -> Result<Trigger, AppError> {
        self.gateway
            .create_trigger(username, symbol, side, amount_hundredths)
            .await
    }

    #[instrument(skip(self), fields(username = %username, symbol = %symbol, side = ?side))]
    pub async fn set_price(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        trigger_price_hundredths: i64,
    ) -> Result<(), AppError> {
        self.gateway
            .arm_trigger(username, symbol, side, trigger_price_hundredths)
            .await
    }

    #[instrument(skip(self), fields(username = %username, symbol = %symbol, side = ?side))]
    pub async fn cancel(&self, username: &str, symbol: &str, side: Side) -> Result<(), AppError> {
        self.gateway.cancel_trigger(username, symbol, side).await
    }

    /// Fires a trigger at an already-observed price. Callers (the scheduler,
    /// or a test endpoint) are responsible for having checked the firing
    /// condition; this only applies the fill.
    #[instrument(skip(self))]
    pub async fn execute(&self, tid: Uuid, observed_price_hundredths: i64) -> Result<(), AppError> {
        self.gateway
            .execute_trigger(tid, observed_price_hundredths)
            .await
    }

    /// Determines whether a trigger should fire against an observed price,
    /// per spec.md §4.5: BUY fires at `price <= triggerPrice`, SELL fires at
    /// `price >= triggerPrice`.
    pub fn should_fire(trigger: &Trigger, observed_price_hundredths: i64) -> bool {
        match trigger.side {
            Side::Buy => observed_price_hundredths <= trigger.trigger_price_hundredths,
            Side::Sell => observed_price_hundredths >= trigger.trigger_price_hundredths,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now_ms;

    fn mk_trigger(side: Side, trigger_price: i64) -> Trigger {
        Trigger {
            tid: Uuid::new_v4(),
            username: "alice".into(),
            symbol: "ABC".into(),
            side,
            amount_hundredths: 1000,
            trigger_price_hundredths: trigger_price,
            executable: true,
            created_ms: now_ms(),
        }
    }

    #[test]
    fn buy_fires_at_or_below_trigger_price() {
        let t = mk_trigger(Side::Buy, 250);
        assert!(TriggerEngine::should_fire(&t, 250));
        assert!(TriggerEngine::should_fire(&t, 200));
        assert!(!TriggerEngine::should_fire(&t, 300));
    }

    #[test]
    fn sell_fires_at_or_above_trigger_price() {
        let t = mk_trigger(Side::Sell, 250);
        assert!(TriggerEngine::should_fire(&t, 250));
        assert!(TriggerEngine::should_fire(&t, 300));
        assert!(!TriggerEngine::should_fire(&t, 200));
    }
}
