//! End-to-end: a set-amount + set-price trigger, firing once the scheduler
//! observes a qualifying quote, all the way through to the credited holding.

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
use trading_engine::scheduler::Scheduler;
use trading_engine::metrics::counters::Counters;
use trading_engine::trigger::TriggerEngine;

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

#[tokio::test]
async fn scheduler_fires_buy_trigger_once_price_drops_to_target() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));

    gateway.add_funds("ivan", 100_00).await.unwrap();
    gateway
        .create_trigger("ivan", "ABC", Side::Buy, 50_00)
        .await
        .unwrap();
    gateway
        .arm_trigger("ivan", "ABC", Side::Buy, 10_00)
        .await
        .unwrap();

    let (audit, _rx) = AuditPublisher::new(16);
    let feed: Arc<dyn QuoteFeed> = Arc::new(FixedPriceFeed {
        price_hundredths: 10_00,
    });
    let oracle = Arc::new(QuoteOracle::new(
        QuoteCache::new(16, Duration::from_secs(60)),
        feed,
        audit,
        "node-1".into(),
        3,
        Duration::from_millis(1),
    ));

    let engine = Arc::new(TriggerEngine::new(gateway.clone()));
    let scheduler = Arc::new(Scheduler::new(
        gateway.clone(),
        oracle,
        engine,
        Counters::default(),
    ));

    scheduler.on_tick().await;

    let holding = gateway.get_holding("ivan", "ABC").await.unwrap();
    assert_eq!(holding.shares, 5);

    assert!(
        gateway
            .get_trigger("ivan", "ABC", Side::Buy)
            .await
            .unwrap()
            .is_none(),
        "trigger should be consumed after execution"
    );
}

#[tokio::test]
async fn scheduler_leaves_trigger_armed_when_price_not_yet_qualifying() {
    let pool = setup_db().await;
    let gateway: Arc<dyn StoreGateway> = Arc::new(SqlxStoreGateway::new(pool));

    gateway.add_funds("judy", 100_00).await.unwrap();
    gateway
        .create_trigger("judy", "ABC", Side::Buy, 50_00)
        .await
        .unwrap();
    gateway
        .arm_trigger("judy", "ABC", Side::Buy, 10_00)
        .await
        .unwrap();

    let (audit, _rx) = AuditPublisher::new(16);
    // Price above the buy trigger's threshold: should not fire.
    let feed: Arc<dyn QuoteFeed> = Arc::new(FixedPriceFeed {
        price_hundredths: 20_00,
    });
    let oracle = Arc::new(QuoteOracle::new(
        QuoteCache::new(16, Duration::from_secs(60)),
        feed,
        audit,
        "node-1".into(),
        3,
        Duration::from_millis(1),
    ));

    let engine = Arc::new(TriggerEngine::new(gateway.clone()));
    let scheduler = Arc::new(Scheduler::new(
        gateway.clone(),
        oracle,
        engine,
        Counters::default(),
    ));

    scheduler.on_tick().await;

    assert!(
        gateway
            .get_trigger("judy", "ABC", Side::Buy)
            .await
            .unwrap()
            .is_some(),
        "trigger should remain armed when the price hasn't qualified"
    );
}
