use std::sync::Arc;

use axum::http::Method;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info};

use trading_engine::audit::sink::FileAuditSink;
use trading_engine::audit::{AuditPublisher, run_audit_sink};
use trading_engine::config::{AppConfig, QuoteFeedMode};
use trading_engine::db::Db;
use trading_engine::db::gateway::{SqlxStoreGateway, StoreGateway};
use trading_engine::dispatch::Dispatcher;
use trading_engine::http::{AppState, build_router};
use trading_engine::logger::init_tracing;
use trading_engine::metrics::counters::Counters;
use trading_engine::quote::cache::QuoteCache;
use trading_engine::quote::feed::{HttpQuoteFeed, QuoteFeed, TcpQuoteFeed};
use trading_engine::quote::oracle::QuoteOracle;
use trading_engine::reservation::ReservationEngine;
use trading_engine::scheduler::Scheduler;
use trading_engine::trigger::TriggerEngine;

/// Connects the store, runs migrations, and returns the typed Gateway.
async fn init_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn StoreGateway>> {
    let db = Db::connect(&cfg.database_url, cfg.db_max_connections).await?;
    db.migrate().await?;

    Ok(Arc::new(SqlxStoreGateway::new(db.pool.as_ref().clone())))
}

fn build_quote_feed(cfg: &AppConfig) -> Arc<dyn QuoteFeed> {
    match cfg.quote_feed_mode {
        QuoteFeedMode::Production => Arc::new(TcpQuoteFeed::new(
            cfg.quote_feed_host.clone(),
            cfg.quote_feed_port,
            cfg.quote_base_timeout,
        )),
        QuoteFeedMode::Development => Arc::new(HttpQuoteFeed::new(
            format!("http://{}:{}", cfg.quote_feed_host, cfg.quote_feed_port),
            cfg.quote_base_timeout,
        )),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Dev convenience; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let is_production = std::env::var("APP_ENV").unwrap_or_default() == "production";
    init_tracing(is_production);

    info!("starting trading engine");

    let cfg = AppConfig::from_env();

    let gateway = init_store(&cfg).await?;

    let (audit, audit_rx) = AuditPublisher::new(4_096);
    let audit_sink: Arc<dyn trading_engine::audit::AuditSink> =
        Arc::new(FileAuditSink::open(cfg.audit_log_path.as_str()).await?);
    tokio::spawn(run_audit_sink(audit_rx, audit_sink.clone()));

    let feed = build_quote_feed(&cfg);
    let cache = QuoteCache::new(cfg.quote_cache_capacity, cfg.quote_cache_ttl);
    let oracle = Arc::new(QuoteOracle::new(
        cache,
        feed,
        audit.clone(),
        cfg.server_id.clone(),
        cfg.quote_max_attempts,
        cfg.quote_base_timeout,
    ));

    let reservations = Arc::new(ReservationEngine::new(
        gateway.clone(),
        oracle.clone(),
        cfg.reservation_lifetime,
    ));
    let triggers = Arc::new(TriggerEngine::new(gateway.clone()));

    let scheduler = Arc::new(Scheduler::new(
        gateway.clone(),
        oracle.clone(),
        triggers.clone(),
        Counters::default(),
    ));
    tokio::spawn(scheduler.run(cfg.scheduler_tick_interval));

    let dispatcher = Arc::new(Dispatcher::new(
        gateway,
        oracle,
        reservations,
        triggers,
        audit,
        audit_sink,
        cfg.server_id.clone(),
    ));

    let state = Arc::new(AppState::new(dispatcher));

    let app = build_router(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET]),
        );

    let listener = tokio::net::TcpListener::bind(&cfg.listen_addr).await?;
    info!(addr = %cfg.listen_addr, "listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "http server crashed");
        }
    });

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    Ok(())
}
