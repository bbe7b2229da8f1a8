//! End-to-end reservation placement, commit, cancel, and expiry through
//! `ReservationEngine` against a real database and a fixed-price quote feed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use uuid::Uuid;

use trading_engine::audit::AuditPublisher;
use trading_engine::db::gateway::{SqlxStoreGateway, StoreGateway};
use trading_engine::db::schema;
use trading_engine::db::types::Side;
use trading_engine::error::AppError;
use trading_engine::quote::cache::QuoteCache;
use trading_engine::quote::feed::QuoteFeed;
use trading_engine::quote::oracle::QuoteOracle;
use trading_engine::quote::Quote;
use trading_engine::reservation::ReservationEngine;

struct FixedPriceFeed {
    price_hundredths: i64,
}

#[async_trait]
impl QuoteFeed for FixedPriceFeed {
    async fn fetch(&self, _symbol: &str, _username: &str) -> Result<Quote, AppError> {
        Ok(Quote {
            price_hundredths: self.price_hundredths,
            crypto_key: "k".into(),
            quote_ts: trading_engine::time::now_ms(),
        })
    }
}

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

fn oracle(price_hundredths: i64) -> Arc<QuoteOracle> {
    let (audit, _rx) = AuditPublisher::new(16);
    let feed: Arc<dyn QuoteFeed> = Arc::new(FixedPriceFeed { price_hundredths });
    Arc::new(QuoteOracle::new(
        QuoteCache::new(16, Duration::from_secs(60)),
        feed,
        audit,
        "node-1".into(),
        3,
        Duration::from_millis(1),
    ))
}

#[tokio::test]
async fn place_then_commit_buy_credits_holding() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));
    gateway.add_funds("kim", 100_00).await.unwrap();

    let engine = ReservationEngine::new(gateway.clone(), oracle(10_00), Duration::from_secs(60));

    let placed = engine
        .place("kim", "ABC", Side::Buy, 55_00, "t1")
        .await
        .unwrap();
    // 55.00 / 10.00 = 5 shares, remainder 5.00 not reserved.
    assert_eq!(placed.shares, 5);
    assert_eq!(placed.amount_hundredths, 50_00);

    engine.commit("kim", Side::Buy).await.unwrap();

    let holding = gateway.get_holding("kim", "ABC").await.unwrap();
    assert_eq!(holding.shares, 5);

    let user = gateway.get_user("kim").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 50_00);
}

#[tokio::test]
async fn place_then_cancel_leaves_balance_untouched() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));
    gateway.add_funds("liam", 100_00).await.unwrap();

    let engine = ReservationEngine::new(gateway.clone(), oracle(10_00), Duration::from_secs(60));

    engine.place("liam", "ABC", Side::Buy, 30_00, "t1").await.unwrap();
    engine.cancel("liam", Side::Buy).await.unwrap();

    let user = gateway.get_user("liam").await.unwrap().unwrap();
    assert_eq!(user.money_hundredths, 100_00, "cancel must not touch funds");

    let err = engine.commit("liam", Side::Buy).await.unwrap_err();
    assert!(matches!(err, AppError::NoReservation));
}

#[tokio::test]
async fn buy_reservation_rejected_when_funds_insufficient_at_placement() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));
    gateway.add_funds("mason", 10_00).await.unwrap();

    let engine = ReservationEngine::new(gateway.clone(), oracle(10_00), Duration::from_secs(60));

    let err = engine
        .place("mason", "ABC", Side::Buy, 50_00, "t1")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientFunds));
}

#[tokio::test]
async fn reservation_expires_after_lifetime_elapses() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));
    gateway.add_funds("nora", 100_00).await.unwrap();

    let engine = ReservationEngine::new(gateway.clone(), oracle(10_00), Duration::from_millis(20));

    engine.place("nora", "ABC", Side::Buy, 50_00, "t1").await.unwrap();

    // Give the spawned expiry task time to run past its lifetime.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let err = engine.commit("nora", Side::Buy).await.unwrap_err();
    assert!(matches!(err, AppError::NoReservation), "reservation should have expired");
}
