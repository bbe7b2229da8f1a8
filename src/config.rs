use std::time::Duration;

/// Distinguishes the quote-feed transport, per spec §6: production talks a
/// length-delimited TCP protocol, development falls back to an HTTP GET.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuoteFeedMode {
    Production,
    Development,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Relational store connection string (sqlite for dev/tests, postgres in prod).
    pub database_url: String,

    /// Cap on concurrent store connections (spec §5 targets ~300).
    pub db_max_connections: u32,

    /// Address the HTTP command surface listens on.
    pub listen_addr: String,

    // =========================
    // Quote oracle configuration
    // =========================
    pub quote_feed_mode: QuoteFeedMode,
    pub quote_feed_host: String,
    pub quote_feed_port: u16,

    /// TTL applied to cached quotes; spec caps this at 60s.
    pub quote_cache_ttl: Duration,
    /// Max distinct symbols held in the quote cache.
    pub quote_cache_capacity: usize,

    /// Attempt cap and base per-attempt timeout for the linear-backoff retry
    /// policy in front of the quote feed (spec §4.2: typical 9 / ~300ms).
    pub quote_max_attempts: u32,
    pub quote_base_timeout: Duration,

    // =========================
    // Reservation / trigger configuration
    // =========================
    /// Wall-clock lifetime of a reservation before its expiry task fires.
    pub reservation_lifetime: Duration,

    /// Trigger scheduler tick interval.
    pub scheduler_tick_interval: Duration,

    // =========================
    // Audit log configuration
    // =========================
    /// Path the audit sink appends XML elements to; DUMPLOG reads from here.
    pub audit_log_path: String,

    /// Stable identifier stamped on every audit event's `server` field.
    pub server_id: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://trading_engine_dev.db".to_string());

        let is_production = std::env::var("APP_ENV")
            .map(|v| v == "production")
            .unwrap_or(false);

        Self {
            database_url,
            db_max_connections: env_u32("DB_MAX_CONNECTIONS", 300),

            listen_addr: std::env::var("LISTEN_ADDR")
                .unwrap_or_else(|_| "127.0.0.1:8080".to_string()),

            quote_feed_mode: if is_production {
                QuoteFeedMode::Production
            } else {
                QuoteFeedMode::Development
            },
            quote_feed_host: std::env::var("QUOTE_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            quote_feed_port: env_u16("QUOTE_SERVER_PORT", 4444),

            quote_cache_ttl: Duration::from_secs(env_u64("QUOTE_CACHE_TTL_SECS", 60)),
            quote_cache_capacity: env_usize("QUOTE_CACHE_CAPACITY", 4_096),

            quote_max_attempts: env_u32("QUOTE_MAX_ATTEMPTS", 9),
            quote_base_timeout: Duration::from_millis(env_u64("QUOTE_BASE_TIMEOUT_MS", 300)),

            reservation_lifetime: Duration::from_secs(env_u64("RESERVATION_LIFETIME_SECS", 60)),
            scheduler_tick_interval: Duration::from_millis(env_u64(
                "SCHEDULER_TICK_MS",
                200,
            )),

            audit_log_path: std::env::var("AUDIT_LOG_PATH")
                .unwrap_or_else(|_| "audit.xml.log".to_string()),
            server_id: std::env::var("SERVER_ID").unwrap_or_else(|_| "node-1".to_string()),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
