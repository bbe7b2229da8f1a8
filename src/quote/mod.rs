pub mod cache;
pub mod feed;
pub mod oracle;

pub use oracle::QuoteOracle;

/// A priced quote as returned by the feed or cache.
#[derive(Clone, Debug)]
pub struct Quote {
    pub price_hundredths: i64,
    pub crypto_key: String,
    pub quote_ts: u64,
}
