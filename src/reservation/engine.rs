use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::gateway::StoreGateway;
use crate::db::types::{Reservation, Side};
use crate::error::AppError;
use crate::quote::QuoteOracle;
use crate::time::now_ms;

/// Two-phase buy/sell: reserve now, commit or cancel later, expire
/// automatically after `lifetime` if neither happens (spec.md §4.3).
pub struct ReservationEngine {
    gateway: Arc<dyn StoreGateway>,
    oracle: Arc<QuoteOracle>,
    lifetime: Duration,
}

/// Outcome of successfully placing a reservation, returned to the dispatcher
/// for its success payload.
#[derive(Clone, Debug)]
pub struct PlacedReservation {
    pub rid: Uuid,
    pub shares: i64,
    pub amount_hundredths: i64,
}

/// Converts a requested amount into whole shares at `price`, rounding down.
/// Degenerate per spec.md §8: an amount smaller than one share's price
/// yields `shares = 0`, `actual_amount = 0` rather than an error.
fn fill_shares(amount_requested_hundredths: i64, price_hundredths: i64) -> (i64, i64) {
    let shares = amount_requested_hundredths / price_hundredths;
    let actual_amount = shares * price_hundredths;
    (shares, actual_amount)
}

impl ReservationEngine {
    pub fn new(gateway: Arc<dyn StoreGateway>, oracle: Arc<QuoteOracle>, lifetime: Duration) -> Self {
        Self {
            gateway,
            oracle,
            lifetime,
        }
    }

    #[instrument(skip(self), fields(username = %username, symbol = %symbol, side = ?side))]
    pub async fn place(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        amount_requested_hundredths: i64,
        txn_id: &str,
    ) -> Result<PlacedReservation, AppError> {
        if amount_requested_hundredths <= 0 {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }

        let user = self
            .gateway
            .get_user(username)
            .await?
            .ok_or_else(|| AppError::UnknownUser(username.to_string()))?;

        if side == Side::Buy && user.money_hundredths < amount_requested_hundredths {
            return Err(AppError::InsufficientFunds);
        }

        let price = self.oracle.quote(username, symbol, txn_id).await?;

        let (shares, actual_amount) = fill_shares(amount_requested_hundredths, price);

        if side == Side::Sell {
            let holding = self.gateway.get_holding(username, symbol).await?;
            if holding.shares < shares {
                return Err(AppError::InsufficientShares);
            }
        }

        let rid = Uuid::new_v4();
        let reservation = Reservation {
            rid,
            username: username.to_string(),
            symbol: symbol.to_string(),
            side,
            shares,
            amount_hundredths: actual_amount,
            created_ms: now_ms(),
        };

        self.gateway.insert_reservation(&reservation).await?;
        self.spawn_expiry(rid);

        info!(%rid, shares, actual_amount, "reservation placed");

        Ok(PlacedReservation {
            rid,
            shares,
            amount_hundredths: actual_amount,
        })
    }

    /// Commits the most recent reservation of `side` for `username`.
    #[instrument(skip(self), fields(username = %username, side = ?side))]
    pub async fn commit(&self, username: &str, side: Side) -> Result<(), AppError> {
        let reservation = self
            .gateway
            .find_last_reservation(username, side)
            .await?
            .ok_or(AppError::NoReservation)?;

        self.gateway.commit_reservation(reservation.rid).await
    }

    /// Cancels the most recent reservation of `side` for `username`. No
    /// resource adjustment occurs — reservations never held resources.
    #[instrument(skip(self), fields(username = %username, side = ?side))]
    pub async fn cancel(&self, username: &str, side: Side) -> Result<(), AppError> {
        let reservation = self
            .gateway
            .find_last_reservation(username, side)
            .await?
            .ok_or(AppError::NoReservation)?;

        let deleted = self.gateway.delete_reservation(reservation.rid).await?;
        if !deleted {
            // Raced with expiry between the find and the delete.
            return Err(AppError::NoReservation);
        }

        Ok(())
    }

    /// Spawns the 60-second (configurable) expiry task. Deletion is
    /// idempotent with respect to commit/cancel — whichever runs first wins
    /// the race, the loser's delete is simply a no-op (spec.md §5).
    fn spawn_expiry(&self, rid: Uuid) {
        let gateway = self.gateway.clone();
        let lifetime = self.lifetime;

        tokio::spawn(async move {
            tokio::time::sleep(lifetime).await;

            match gateway.delete_reservation(rid).await {
                Ok(true) => info!(%rid, "reservation expired"),
                Ok(false) => {} // already committed or cancelled
                Err(e) => warn!(%rid, error = %e, "reservation expiry delete failed"),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fill_never_exceeds_requested(amount in 1i64..1_000_000_000, price in 1i64..1_000_000) {
            let (shares, actual) = fill_shares(amount, price);
            prop_assert!(shares >= 0);
            prop_assert!(actual <= amount);
            prop_assert_eq!(actual, shares * price);
            // one more share would always overshoot the requested amount
            prop_assert!((shares + 1) * price > amount);
        }
    }

    #[test]
    fn degenerate_amount_below_one_share_yields_zero() {
        assert_eq!(fill_shares(50, 100), (0, 0));
    }
}
