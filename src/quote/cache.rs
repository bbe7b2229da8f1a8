use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, instrument};

use crate::quote::Quote;
use crate::time::now_ms;

/// Bounded, TTL-aware cache of the most recent quote per symbol.
///
/// Guarantees:
/// - memory usage is bounded by `capacity` distinct symbols.
/// - entries older than `ttl` are treated as misses (writer-wins on refresh).
/// - on overflow, evicts the oldest symbol in the rotation ring.
pub struct QuoteCache {
    capacity: usize,
    ttl: Duration,

    map: Mutex<HashMap<String, (Quote, u64)>>,
    rr: Mutex<VecDeque<String>>,
}

impl QuoteCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            map: Mutex::new(HashMap::new()),
            rr: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns a cached quote if present and not older than `ttl`.
    pub fn get(&self, symbol: &str) -> Option<Quote> {
        let map = self.map.lock();
        let (quote, inserted_at) = map.get(symbol)?;

        if now_ms().saturating_sub(*inserted_at) > self.ttl.as_millis() as u64 {
            return None;
        }

        Some(quote.clone())
    }

    #[instrument(skip(self, quote), target = "quote_cache", fields(symbol = %symbol))]
    pub fn insert(&self, symbol: &str, quote: Quote) {
        let mut map = self.map.lock();
        let mut rr = self.rr.lock();

        let is_new = !map.contains_key(symbol);

        if is_new && map.len() >= self.capacity {
            if let Some(victim) = rr.pop_front() {
                map.remove(&victim);
                debug!(evicted = %victim, "quote cache capacity reached; evicted oldest symbol");
            }
        }

        map.insert(symbol.to_string(), (quote, now_ms()));

        if !rr.contains(&symbol.to_string()) {
            rr.push_back(symbol.to_string());
        }
    }

    pub fn clear(&self) {
        let count = self.map.lock().len();
        self.map.lock().clear();
        self.rr.lock().clear();
        info!(count, "quote cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_quote(price: i64) -> Quote {
        Quote {
            price_hundredths: price,
            crypto_key: "key".to_string(),
            quote_ts: now_ms(),
        }
    }

    #[test]
    fn hit_within_ttl() {
        let cache = QuoteCache::new(10, Duration::from_secs(60));
        cache.insert("ABC", mk_quote(200));
        assert_eq!(cache.get("ABC").unwrap().price_hundredths, 200);
    }

    #[test]
    fn miss_when_absent() {
        let cache = QuoteCache::new(10, Duration::from_secs(60));
        assert!(cache.get("ABC").is_none());
    }

    #[test]
    fn eviction_respects_capacity() {
        let cache = QuoteCache::new(2, Duration::from_secs(60));
        cache.insert("AAA", mk_quote(100));
        cache.insert("BBB", mk_quote(200));
        cache.insert("CCC", mk_quote(300));

        assert!(cache.get("AAA").is_none());
        assert!(cache.get("BBB").is_some());
        assert!(cache.get("CCC").is_some());
    }

    #[test]
    fn writer_wins_on_refresh() {
        let cache = QuoteCache::new(10, Duration::from_secs(60));
        cache.insert("ABC", mk_quote(200));
        cache.insert("ABC", mk_quote(250));
        assert_eq!(cache.get("ABC").unwrap().price_hundredths, 250);
    }
}
