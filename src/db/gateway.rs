//! Typed operations against the relational store.
//!
//! Every operation here is total: it returns a value, a distinguished
//! "not found" outcome (surfaced as the matching `AppError` variant), or a
//! store error. Multi-row mutations are grouped into the four short
//! transactions spec'd in §4.1; read-only queries run outside a transaction.
//! This module makes no policy decisions (it never checks "is this a valid
//! command" — only store-level constraints such as existence and the CAS
//! preconditions baked into each `UPDATE ... WHERE`).

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use crate::db::types::{Holding, Reservation, Side, Trigger, User};
use crate::error::AppError;
use crate::logger::warn_if_slow;
use crate::time::now_ms;

/// Budget for the four atomic transactions in §4.1; past this, the teacher's
/// own `SessionStore::load_by_id`/`persist_fairness` tripwire (wrapped the
/// same way here) logs a `performance` warning rather than failing the call.
const SLOW_TXN_BUDGET: Duration = Duration::from_millis(50);

#[async_trait]
pub trait StoreGateway: Send + Sync + 'static {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError>;

    /// Creates the user with zero balance on first reference, matching
    /// spec.md §3's "created on first ADD" lifecycle note generalized to
    /// "created on first reference" for read paths that need one (GET_QUOTE
    /// etc. still require `UnknownUser` if the user has never been ADDed;
    /// callers that must not auto-create use `get_user` directly).
    async fn add_funds(&self, username: &str, amount_hundredths: i64) -> Result<User, AppError>;

    async fn get_holding(&self, username: &str, symbol: &str) -> Result<Holding, AppError>;

    async fn find_last_reservation(
        &self,
        username: &str,
        side: Side,
    ) -> Result<Option<Reservation>, AppError>;

    async fn insert_reservation(&self, r: &Reservation) -> Result<(), AppError>;

    /// Idempotent delete used by both the expiry task and explicit cancel;
    /// returns whether a row was actually removed.
    async fn delete_reservation(&self, rid: Uuid) -> Result<bool, AppError>;

    /// Re-checks the resource precondition and, if it still holds, applies
    /// the holding/money adjustment and deletes the reservation — all in one
    /// transaction (spec.md §4.3: "reservations do not lock resources").
    async fn commit_reservation(&self, rid: Uuid) -> Result<(), AppError>;

    async fn get_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
    ) -> Result<Option<Trigger>, AppError>;

    /// Debits the resource (money for BUY, shares for SELL) and inserts the
    /// trigger in `ARMED_PENDING` (`executable = false`), atomically.
    async fn create_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        amount_hundredths: i64,
    ) -> Result<Trigger, AppError>;

    /// Arms a trigger in `ARMED_PENDING`, setting `triggerPrice` and
    /// `executable = true`. No resource movement.
    async fn arm_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        trigger_price_hundredths: i64,
    ) -> Result<(), AppError>;

    /// Refunds the held resource and deletes the trigger, atomically.
    async fn cancel_trigger(&self, username: &str, symbol: &str, side: Side)
    -> Result<(), AppError>;

    async fn list_armed_triggers(&self) -> Result<Vec<Trigger>, AppError>;

    /// Read-only views backing `DISPLAY_SUMMARY` (spec.md §9: "a view of the
    /// user's holdings, active reservations, and active triggers").
    async fn list_holdings(&self, username: &str) -> Result<Vec<Holding>, AppError>;
    async fn list_reservations(&self, username: &str) -> Result<Vec<Reservation>, AppError>;
    async fn list_triggers(&self, username: &str) -> Result<Vec<Trigger>, AppError>;

    /// Applies the fill for a trigger firing at `observed_price` and deletes
    /// the trigger, atomically. `observed_price` is assumed to have already
    /// satisfied the firing condition (scheduler's responsibility).
    async fn execute_trigger(&self, tid: Uuid, observed_price: i64) -> Result<(), AppError>;
}

pub struct SqlxStoreGateway {
    pool: AnyPool,
}

impl SqlxStoreGateway {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::any::AnyRow) -> User {
    User {
        username: row.get("username"),
        money_hundredths: row.get("money_hundredths"),
    }
}

fn row_to_reservation(row: &sqlx::any::AnyRow) -> Result<Reservation, AppError> {
    let rid: String = row.get("rid");
    let side: String = row.get("side");
    let created_ms: i64 = row.get("created_ms");

    Ok(Reservation {
        rid: Uuid::parse_str(&rid).map_err(|e| AppError::StoreError(e.to_string()))?,
        username: row.get("username"),
        symbol: row.get("symbol"),
        side: Side::parse(&side).ok_or_else(|| AppError::StoreError("bad side".into()))?,
        shares: row.get("shares"),
        amount_hundredths: row.get("amount_hundredths"),
        created_ms: created_ms as u64,
    })
}

fn row_to_trigger(row: &sqlx::any::AnyRow) -> Result<Trigger, AppError> {
    let tid: String = row.get("tid");
    let side: String = row.get("side");
    let created_ms: i64 = row.get("created_ms");

    Ok(Trigger {
        tid: Uuid::parse_str(&tid).map_err(|e| AppError::StoreError(e.to_string()))?,
        username: row.get("username"),
        symbol: row.get("symbol"),
        side: Side::parse(&side).ok_or_else(|| AppError::StoreError("bad side".into()))?,
        amount_hundredths: row.get("amount_hundredths"),
        trigger_price_hundredths: row.get("trigger_price_hundredths"),
        executable: row.get::<i64, _>("executable") != 0,
        created_ms: created_ms as u64,
    })
}

#[async_trait]
impl StoreGateway for SqlxStoreGateway {
    async fn get_user(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query("SELECT username, money_hundredths FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| row_to_user(&r)))
    }

    async fn add_funds(&self, username: &str, amount_hundredths: i64) -> Result<User, AppError> {
        if amount_hundredths <= 0 {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }

        let mut tx = self.pool.begin().await?;

        let existing =
            sqlx::query("SELECT username, money_hundredths FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&mut *tx)
                .await?;

        if existing.is_none() {
            sqlx::query("INSERT INTO users(username, money_hundredths) VALUES (?, 0)")
                .bind(username)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("UPDATE users SET money_hundredths = money_hundredths + ? WHERE username = ?")
            .bind(amount_hundredths)
            .bind(username)
            .execute(&mut *tx)
            .await?;

        let row = sqlx::query("SELECT username, money_hundredths FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(row_to_user(&row))
    }

    async fn get_holding(&self, username: &str, symbol: &str) -> Result<Holding, AppError> {
        let row =
            sqlx::query("SELECT shares FROM stocks WHERE username = ? AND symbol = ?")
                .bind(username)
                .bind(symbol)
                .fetch_optional(&self.pool)
                .await?;

        Ok(Holding {
            username: username.to_string(),
            symbol: symbol.to_string(),
            shares: row.map(|r| r.get::<i64, _>("shares")).unwrap_or(0),
        })
    }

    async fn find_last_reservation(
        &self,
        username: &str,
        side: Side,
    ) -> Result<Option<Reservation>, AppError> {
        let row = sqlx::query(
            r#"
SELECT rid, username, symbol, side, shares, amount_hundredths, created_ms
FROM reservations
WHERE username = ? AND side = ?
ORDER BY created_ms DESC, rid DESC
LIMIT 1;
"#,
        )
        .bind(username)
        .bind(side.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_reservation(&r)).transpose()
    }

    async fn insert_reservation(&self, r: &Reservation) -> Result<(), AppError> {
        sqlx::query(
            r#"
INSERT INTO reservations(rid, username, symbol, side, shares, amount_hundredths, created_ms)
VALUES (?, ?, ?, ?, ?, ?, ?);
"#,
        )
        .bind(r.rid.to_string())
        .bind(&r.username)
        .bind(&r.symbol)
        .bind(r.side.as_str())
        .bind(r.shares)
        .bind(r.amount_hundredths)
        .bind(r.created_ms as i64)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_reservation(&self, rid: Uuid) -> Result<bool, AppError> {
        let res = sqlx::query("DELETE FROM reservations WHERE rid = ?")
            .bind(rid.to_string())
            .execute(&self.pool)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn commit_reservation(&self, rid: Uuid) -> Result<(), AppError> {
        warn_if_slow("db_commit_reservation", SLOW_TXN_BUDGET, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                r#"
SELECT rid, username, symbol, side, shares, amount_hundredths, created_ms
FROM reservations WHERE rid = ?;
"#,
            )
            .bind(rid.to_string())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tx.rollback().await?;
                return Err(AppError::NoReservation);
            };
            let reservation = row_to_reservation(&row)?;

            match reservation.side {
                Side::Buy => {
                    let res = sqlx::query(
                        r#"
UPDATE users SET money_hundredths = money_hundredths - ?
WHERE username = ? AND money_hundredths >= ?;
"#,
                    )
                    .bind(reservation.amount_hundredths)
                    .bind(&reservation.username)
                    .bind(reservation.amount_hundredths)
                    .execute(&mut *tx)
                    .await?;

                    if res.rows_affected() != 1 {
                        tx.rollback().await?;
                        return Err(AppError::InsufficientFunds);
                    }

                    upsert_holding(&mut tx, &reservation.username, &reservation.symbol, reservation.shares)
                        .await?;
                }
                Side::Sell => {
                    let res = sqlx::query(
                        r#"
UPDATE stocks SET shares = shares - ?
WHERE username = ? AND symbol = ? AND shares >= ?;
"#,
                    )
                    .bind(reservation.shares)
                    .bind(&reservation.username)
                    .bind(&reservation.symbol)
                    .bind(reservation.shares)
                    .execute(&mut *tx)
                    .await?;

                    if res.rows_affected() != 1 {
                        tx.rollback().await?;
                        return Err(AppError::InsufficientShares);
                    }

                    sqlx::query(
                        "UPDATE users SET money_hundredths = money_hundredths + ? WHERE username = ?",
                    )
                    .bind(reservation.amount_hundredths)
                    .bind(&reservation.username)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            sqlx::query("DELETE FROM reservations WHERE rid = ?")
                .bind(rid.to_string())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn get_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
    ) -> Result<Option<Trigger>, AppError> {
        let row = sqlx::query(
            r#"
SELECT tid, username, symbol, side, amount_hundredths, trigger_price_hundredths,
       CAST(executable AS INTEGER) AS executable, created_ms
FROM triggers WHERE username = ? AND symbol = ? AND side = ?;
"#,
        )
        .bind(username)
        .bind(symbol)
        .bind(side.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| row_to_trigger(&r)).transpose()
    }

    async fn create_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        amount_hundredths: i64,
    ) -> Result<Trigger, AppError> {
        if amount_hundredths <= 0 {
            return Err(AppError::InvalidInput("amount must be positive".into()));
        }

        warn_if_slow("db_create_trigger", SLOW_TXN_BUDGET, async {
            let mut tx = self.pool.begin().await?;

            let existing = sqlx::query(
                "SELECT tid FROM triggers WHERE username = ? AND symbol = ? AND side = ?",
            )
            .bind(username)
            .bind(symbol)
            .bind(side.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                tx.rollback().await?;
                return Err(AppError::DuplicateTrigger);
            }

            match side {
                Side::Buy => {
                    let res = sqlx::query(
                        r#"
UPDATE users SET money_hundredths = money_hundredths - ?
WHERE username = ? AND money_hundredths >= ?;
"#,
                    )
                    .bind(amount_hundredths)
                    .bind(username)
                    .bind(amount_hundredths)
                    .execute(&mut *tx)
                    .await?;

                    if res.rows_affected() != 1 {
                        tx.rollback().await?;
                        return Err(AppError::InsufficientFunds);
                    }
                }
                Side::Sell => {
                    let res = sqlx::query(
                        r#"
UPDATE stocks SET shares = shares - ?
WHERE username = ? AND symbol = ? AND shares >= ?;
"#,
                    )
                    .bind(amount_hundredths)
                    .bind(username)
                    .bind(symbol)
                    .bind(amount_hundredths)
                    .execute(&mut *tx)
                    .await?;

                    if res.rows_affected() != 1 {
                        tx.rollback().await?;
                        return Err(AppError::InsufficientShares);
                    }
                }
            }

            let tid = Uuid::new_v4();
            let created_ms = now_ms() as i64;

            sqlx::query(
                r#"
INSERT INTO triggers(tid, username, symbol, side, amount_hundredths, trigger_price_hundredths, executable, created_ms)
VALUES (?, ?, ?, ?, ?, 0, 0, ?);
"#,
            )
            .bind(tid.to_string())
            .bind(username)
            .bind(symbol)
            .bind(side.as_str())
            .bind(amount_hundredths)
            .bind(created_ms)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;

            Ok(Trigger {
                tid,
                username: username.to_string(),
                symbol: symbol.to_string(),
                side,
                amount_hundredths,
                trigger_price_hundredths: 0,
                executable: false,
                created_ms: created_ms as u64,
            })
        })
        .await
    }

    async fn arm_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
        trigger_price_hundredths: i64,
    ) -> Result<(), AppError> {
        if trigger_price_hundredths <= 0 {
            return Err(AppError::InvalidInput("trigger price must be positive".into()));
        }

        let res = sqlx::query(
            r#"
UPDATE triggers SET trigger_price_hundredths = ?, executable = 1
WHERE username = ? AND symbol = ? AND side = ? AND executable = 0;
"#,
        )
        .bind(trigger_price_hundredths)
        .bind(username)
        .bind(symbol)
        .bind(side.as_str())
        .execute(&self.pool)
        .await?;

        if res.rows_affected() != 1 {
            return Err(AppError::NoTrigger);
        }

        Ok(())
    }

    async fn cancel_trigger(
        &self,
        username: &str,
        symbol: &str,
        side: Side,
    ) -> Result<(), AppError> {
        warn_if_slow("db_cancel_trigger", SLOW_TXN_BUDGET, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                r#"
SELECT tid, amount_hundredths FROM triggers
WHERE username = ? AND symbol = ? AND side = ?;
"#,
            )
            .bind(username)
            .bind(symbol)
            .bind(side.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tx.rollback().await?;
                return Err(AppError::NoTrigger);
            };

            let amount_hundredths: i64 = row.get("amount_hundredths");
            let tid: String = row.get("tid");

            match side {
                Side::Buy => {
                    sqlx::query(
                        "UPDATE users SET money_hundredths = money_hundredths + ? WHERE username = ?",
                    )
                    .bind(amount_hundredths)
                    .bind(username)
                    .execute(&mut *tx)
                    .await?;
                }
                Side::Sell => {
                    upsert_holding(&mut tx, username, symbol, amount_hundredths).await?;
                }
            }

            sqlx::query("DELETE FROM triggers WHERE tid = ?")
                .bind(tid)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn list_armed_triggers(&self) -> Result<Vec<Trigger>, AppError> {
        let rows = sqlx::query(
            r#"
SELECT tid, username, symbol, side, amount_hundredths, trigger_price_hundredths,
       CAST(executable AS INTEGER) AS executable, created_ms
FROM triggers WHERE executable = 1;
"#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_trigger(row) {
                Ok(t) => out.push(t),
                Err(e) => tracing::warn!(error = %e, "skipping malformed trigger row"),
            }
        }
        Ok(out)
    }

    async fn execute_trigger(&self, tid: Uuid, observed_price: i64) -> Result<(), AppError> {
        if observed_price <= 0 {
            return Err(AppError::QuoteUnavailable(format!(
                "refusing to execute trigger at non-positive price {observed_price}"
            )));
        }

        warn_if_slow("db_execute_trigger", SLOW_TXN_BUDGET, async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query(
                r#"
SELECT tid, username, symbol, side, amount_hundredths, trigger_price_hundredths,
       CAST(executable AS INTEGER) AS executable, created_ms
FROM triggers WHERE tid = ? AND executable = 1;
"#,
            )
            .bind(tid.to_string())
            .fetch_optional(&mut *tx)
            .await?;

            let Some(row) = row else {
                tx.rollback().await?;
                return Err(AppError::NoTrigger);
            };
            let trigger = row_to_trigger(&row)?;

            match trigger.side {
                Side::Buy => {
                    let shares = trigger.amount_hundredths / observed_price;
                    let remainder = trigger.amount_hundredths - shares * observed_price;

                    upsert_holding(&mut tx, &trigger.username, &trigger.symbol, shares).await?;

                    if remainder != 0 {
                        sqlx::query(
                            "UPDATE users SET money_hundredths = money_hundredths + ? WHERE username = ?",
                        )
                        .bind(remainder)
                        .bind(&trigger.username)
                        .execute(&mut *tx)
                        .await?;
                    }
                }
                Side::Sell => {
                    // Shares were already debited at set-amount time; `amount`
                    // here is a share count, not a currency amount.
                    let proceeds = trigger.amount_hundredths * observed_price;

                    sqlx::query(
                        "UPDATE users SET money_hundredths = money_hundredths + ? WHERE username = ?",
                    )
                    .bind(proceeds)
                    .bind(&trigger.username)
                    .execute(&mut *tx)
                    .await?;
                }
            }

            sqlx::query("DELETE FROM triggers WHERE tid = ?")
                .bind(tid.to_string())
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        })
        .await
    }

    async fn list_holdings(&self, username: &str) -> Result<Vec<Holding>, AppError> {
        let rows = sqlx::query("SELECT symbol, shares FROM stocks WHERE username = ? AND shares != 0")
            .bind(username)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| Holding {
                username: username.to_string(),
                symbol: r.get("symbol"),
                shares: r.get("shares"),
            })
            .collect())
    }

    async fn list_reservations(&self, username: &str) -> Result<Vec<Reservation>, AppError> {
        let rows = sqlx::query(
            r#"
SELECT rid, username, symbol, side, shares, amount_hundredths, created_ms
FROM reservations WHERE username = ?;
"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_reservation).collect()
    }

    async fn list_triggers(&self, username: &str) -> Result<Vec<Trigger>, AppError> {
        let rows = sqlx::query(
            r#"
SELECT tid, username, symbol, side, amount_hundredths, trigger_price_hundredths,
       CAST(executable AS INTEGER) AS executable, created_ms
FROM triggers WHERE username = ?;
"#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_trigger).collect()
    }
}

/// Inserts a holding row if absent, otherwise adds `delta_shares`. Shared by
/// the BUY commit/execute paths (credit shares) and SELL-trigger cancel
/// (refund shares).
async fn upsert_holding(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    username: &str,
    symbol: &str,
    delta_shares: i64,
) -> Result<(), AppError> {
    let existing = sqlx::query("SELECT shares FROM stocks WHERE username = ? AND symbol = ?")
        .bind(username)
        .bind(symbol)
        .fetch_optional(&mut **tx)
        .await?;

    if existing.is_some() {
        sqlx::query("UPDATE stocks SET shares = shares + ? WHERE username = ? AND symbol = ?")
            .bind(delta_shares)
            .bind(username)
            .bind(symbol)
            .execute(&mut **tx)
            .await?;
    } else {
        sqlx::query("INSERT INTO stocks(username, symbol, shares) VALUES (?, ?, ?)")
            .bind(username)
            .bind(symbol)
            .bind(delta_shares)
            .execute(&mut **tx)
            .await?;
    }

    Ok(())
}
