use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::audit::{AuditEvent, AuditPublisher};
use crate::error::AppError;
use crate::quote::cache::QuoteCache;
use crate::quote::feed::QuoteFeed;
use crate::quote::Quote;
use crate::time::now_ms;

/// Fetch-with-cache façade over the external quote feed; the single source
/// of "current price" for every other component (spec.md §2).
pub struct QuoteOracle {
    cache: QuoteCache,
    feed: Arc<dyn QuoteFeed>,
    audit: AuditPublisher,
    server_id: String,
    max_attempts: u32,
    base_timeout: Duration,
}

impl QuoteOracle {
    pub fn new(
        cache: QuoteCache,
        feed: Arc<dyn QuoteFeed>,
        audit: AuditPublisher,
        server_id: String,
        max_attempts: u32,
        base_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            feed,
            audit,
            server_id,
            max_attempts: max_attempts.max(1),
            base_timeout,
        }
    }

    /// `quote(username, symbol, txnId) -> priceHundredths` (spec.md §4.2).
    /// Emits a `quoteServer` audit event tagged with `txn_id` on success.
    #[instrument(skip(self), fields(symbol = %symbol, username = %username))]
    pub async fn quote(
        &self,
        username: &str,
        symbol: &str,
        txn_id: &str,
    ) -> Result<i64, AppError> {
        if let Some(cached) = self.cache.get(symbol) {
            debug!("quote cache hit");
            self.emit_audit(username, symbol, txn_id, &cached);
            return Ok(cached.price_hundredths);
        }

        let quote = self.fetch_with_retry(symbol, username).await?;
        self.cache.insert(symbol, quote.clone());
        self.emit_audit(username, symbol, txn_id, &quote);

        Ok(quote.price_hundredths)
    }

    /// Bypasses the cache entirely — used by the Trigger Scheduler when a
    /// fresher-than-TTL read is required (spec.md §9's cache-coherence note).
    pub async fn quote_fresh(
        &self,
        username: &str,
        symbol: &str,
        txn_id: &str,
    ) -> Result<i64, AppError> {
        let quote = self.fetch_with_retry(symbol, username).await?;
        self.cache.insert(symbol, quote.clone());
        self.emit_audit(username, symbol, txn_id, &quote);
        Ok(quote.price_hundredths)
    }

    /// Linear backoff retry: attempt `n` waits `n * base_timeout` before
    /// trying again, up to `max_attempts`. Exhaustion surfaces as
    /// `QuoteUnavailable` — no state is mutated on failure, and the cache is
    /// never poisoned with a failed lookup.
    async fn fetch_with_retry(&self, symbol: &str, username: &str) -> Result<Quote, AppError> {
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            match self.feed.fetch(symbol, username).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    warn!(attempt, error = %e, "quote feed attempt failed");
                    last_err = Some(e);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.base_timeout * attempt).await;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::QuoteUnavailable("no attempts made".into())))
    }

    fn emit_audit(&self, username: &str, symbol: &str, txn_id: &str, quote: &Quote) {
        self.audit.publish(AuditEvent::QuoteServer {
            timestamp: now_ms(),
            server: self.server_id.clone(),
            transaction_num: txn_id.to_string(),
            price: crate::audit::render_hundredths(quote.price_hundredths),
            stock_symbol: symbol.to_string(),
            username: username.to_string(),
            quote_server_time: quote.quote_ts,
            cryptokey: quote.crypto_key.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyFeed {
        fail_times: AtomicU32,
    }

    #[async_trait::async_trait]
    impl QuoteFeed for FlakyFeed {
        async fn fetch(&self, _symbol: &str, _username: &str) -> Result<Quote, AppError> {
            if self.fail_times.fetch_sub(1, Ordering::SeqCst) > 0 {
                return Err(AppError::QuoteUnavailable("simulated failure".into()));
            }

            Ok(Quote {
                price_hundredths: 1234,
                crypto_key: "k".into(),
                quote_ts: now_ms(),
            })
        }
    }

    #[tokio::test]
    async fn retries_until_success() {
        let (audit, _rx) = AuditPublisher::new(16);
        let feed = Arc::new(FlakyFeed {
            fail_times: AtomicU32::new(2),
        });
        let oracle = QuoteOracle::new(
            QuoteCache::new(16, Duration::from_secs(60)),
            feed,
            audit,
            "node-1".into(),
            5,
            Duration::from_millis(1),
        );

        let price = oracle.quote("alice", "ABC", "t1").await.unwrap();
        assert_eq!(price, 1234);
    }

    #[tokio::test]
    async fn exhausts_attempts_and_fails() {
        let (audit, _rx) = AuditPublisher::new(16);
        let feed = Arc::new(FlakyFeed {
            fail_times: AtomicU32::new(100),
        });
        let oracle = QuoteOracle::new(
            QuoteCache::new(16, Duration::from_secs(60)),
            feed,
            audit,
            "node-1".into(),
            3,
            Duration::from_millis(1),
        );

        let err = oracle.quote("alice", "ABC", "t1").await.unwrap_err();
        assert!(matches!(err, AppError::QuoteUnavailable(_)));
    }
}
