//! End-to-end exercises of the Data Store Gateway against a real (in-memory
//! SQLite) database, covering the core scenarios from spec.md §8: funding,
//! reserved buy/sell with commit, insufficient-resource rejection, and the
//! full trigger lifecycle.

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};
use uuid::Uuid;

use trading_engine::db::gateway::{SqlxStoreGateway, StoreGateway};
use trading_engine::db::schema;
use trading_engine::db::types::{Reservation, Side};
use trading_engine::error::AppError;
use trading_engine::time::now_ms;

/// Unique in-memory SQLite database per test, following the teacher's
/// shared-cache naming trick so parallel test runs never collide on schema.
async fn setup_db() -> AnyPool {
    sqlx::any::install_default_drivers();

    let db_name = Uuid::new_v4().to_string();
    let conn_str = format!("sqlite:file:{}?mode=memory&cache=shared", db_name);

    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(&conn_str)
        .await
        .unwrap();

    schema::migrate(&pool).await.unwrap();
    pool
}

fn reservation(username: &str, symbol: &str, side: Side, shares: i64, amount: i64) -> Reservation {
    Reservation {
        rid: Uuid::new_v4(),
        username: username.to_string(),
        symbol: symbol.to_string(),
        side,
        shares,
        amount_hundredths: amount,
        created_ms: now_ms(),
    }
}

#[tokio::test]
async fn add_funds_creates_user_and_accumulates() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    let user = gw.add_funds("alice", 10_000).await.unwrap();
    assert_eq!(user.money_hundredths, 10_000);

    let user = gw.add_funds("alice", 2_500).await.unwrap();
    assert_eq!(user.money_hundredths, 12_500);
}

#[tokio::test]
async fn reserved_buy_commit_moves_money_to_holding() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("bob", 100_00).await.unwrap();

    let r = reservation("bob", "ABC", Side::Buy, 5, 50_00);
    gw.insert_reservation(&r).await.unwrap();

    gw.commit_reservation(r.rid).await.unwrap();

    let user = gw.get_user("bob").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 50_00);

    let holding = gw.get_holding("bob", "ABC").await.unwrap();
    assert_eq!(holding.shares, 5);

    // Reservation is consumed.
    assert!(gw.find_last_reservation("bob", Side::Buy).await.unwrap().is_none());
}

#[tokio::test]
async fn commit_buy_rejects_when_funds_insufficient_at_commit_time() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool.clone());

    gw.add_funds("carol", 10_00).await.unwrap();

    // Reserve against funds that are spent before commit by a second reservation.
    let r1 = reservation("carol", "XYZ", Side::Buy, 5, 10_00);
    gw.insert_reservation(&r1).await.unwrap();

    // Drain the account out from under the reservation (simulating a second
    // concurrent commit that already consumed the balance).
    sqlx::query("UPDATE users SET money_hundredths = 0 WHERE username = ?")
        .bind("carol")
        .execute(&pool)
        .await
        .unwrap();

    let err = gw.commit_reservation(r1.rid).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds));
}

#[tokio::test]
async fn sell_without_holdings_is_rejected_at_commit() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("dave", 10_00).await.unwrap();

    let r = reservation("dave", "ABC", Side::Sell, 3, 30_00);
    gw.insert_reservation(&r).await.unwrap();

    let err = gw.commit_reservation(r.rid).await.unwrap_err();
    assert!(matches!(err, AppError::InsufficientShares));
}

#[tokio::test]
async fn delete_reservation_is_idempotent() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("erin", 10_00).await.unwrap();
    let r = reservation("erin", "ABC", Side::Buy, 1, 10_00);
    gw.insert_reservation(&r).await.unwrap();

    assert!(gw.delete_reservation(r.rid).await.unwrap());
    assert!(!gw.delete_reservation(r.rid).await.unwrap());
}

#[tokio::test]
async fn trigger_lifecycle_set_amount_arm_execute() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("frank", 100_00).await.unwrap();

    let trigger = gw
        .create_trigger("frank", "ABC", Side::Buy, 50_00)
        .await
        .unwrap();
    assert!(!trigger.executable);

    // Money is debited immediately on set-amount.
    let user = gw.get_user("frank").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 50_00);

    gw.arm_trigger("frank", "ABC", Side::Buy, 10_00).await.unwrap();

    let armed = gw
        .list_armed_triggers()
        .await
        .unwrap()
        .into_iter()
        .find(|t| t.tid == trigger.tid)
        .expect("trigger should be armed");
    assert_eq!(armed.trigger_price_hundredths, 10_00);

    gw.execute_trigger(trigger.tid, 10_00).await.unwrap();

    // 50.00 / 10.00 = 5 shares, no remainder.
    let holding = gw.get_holding("frank", "ABC").await.unwrap();
    assert_eq!(holding.shares, 5);

    assert!(
        gw.get_trigger("frank", "ABC", Side::Buy)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn execute_trigger_rejects_non_positive_observed_price() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("ignace", 100_00).await.unwrap();
    let trigger = gw
        .create_trigger("ignace", "ABC", Side::Buy, 50_00)
        .await
        .unwrap();
    gw.arm_trigger("ignace", "ABC", Side::Buy, 10_00).await.unwrap();

    let err = gw.execute_trigger(trigger.tid, 0).await.unwrap_err();
    assert!(matches!(err, AppError::QuoteUnavailable(_)));

    // Trigger and holding are untouched; nothing was dividing by zero.
    assert!(
        gw.get_trigger("ignace", "ABC", Side::Buy)
            .await
            .unwrap()
            .is_some()
    );
    let holding = gw.get_holding("ignace", "ABC").await.unwrap();
    assert_eq!(holding.shares, 0);
}

#[tokio::test]
async fn cancel_trigger_refunds_debited_money() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("grace", 100_00).await.unwrap();
    gw.create_trigger("grace", "ABC", Side::Buy, 40_00).await.unwrap();

    let user = gw.get_user("grace").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 60_00);

    gw.cancel_trigger("grace", "ABC", Side::Buy).await.unwrap();

    let user = gw.get_user("grace").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 100_00);

    assert!(
        gw.get_trigger("grace", "ABC", Side::Buy)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn duplicate_trigger_for_same_symbol_and_side_is_rejected() {
    let pool = setup_db().await;
    let gw = SqlxStoreGateway::new(pool);

    gw.add_funds("heidi", 100_00).await.unwrap();
    gw.create_trigger("heidi", "ABC", Side::Buy, 10_00).await.unwrap();

    let err = gw
        .create_trigger("heidi", "ABC", Side::Buy, 5_00)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateTrigger));
}
