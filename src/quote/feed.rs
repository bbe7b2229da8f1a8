use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::AppError;
use crate::quote::Quote;

/// Transport-agnostic contract for the external quote feed. Implementations
/// only consume the wire protocol (spec.md §6.2); they never serve it.
#[async_trait]
pub trait QuoteFeed: Send + Sync + 'static {
    /// Fetches a fresh quote for `symbol` on behalf of `username`. Returns
    /// `AppError::QuoteUnavailable` on any transport/parse failure — callers
    /// apply the retry/backoff policy, not this trait.
    async fn fetch(&self, symbol: &str, username: &str) -> Result<Quote, AppError>;
}

/// Production transport: a length-delimited request/response over a stream
/// socket. Sends `"<symbol>,<username>\n"`, reads a single line back.
pub struct TcpQuoteFeed {
    host: String,
    port: u16,
    read_timeout: Duration,
}

impl TcpQuoteFeed {
    pub fn new(host: String, port: u16, read_timeout: Duration) -> Self {
        Self {
            host,
            port,
            read_timeout,
        }
    }
}

#[async_trait]
impl QuoteFeed for TcpQuoteFeed {
    async fn fetch(&self, symbol: &str, username: &str) -> Result<Quote, AppError> {
        let addr = format!("{}:{}", self.host, self.port);

        let mut stream = timeout(self.read_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| AppError::QuoteUnavailable("connect timeout".into()))?
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        let request = format!("{},{}\n", symbol, username);
        stream
            .write_all(request.as_bytes())
            .await
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();

        timeout(self.read_timeout, reader.read_line(&mut line))
            .await
            .map_err(|_| AppError::QuoteUnavailable("read timeout".into()))?
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        parse_quote_line(&line)
    }
}

/// Non-production fallback: an HTTP GET of a fixed path returning the same
/// comma-separated body.
pub struct HttpQuoteFeed {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuoteFeed {
    pub fn new(base_url: String, read_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(read_timeout)
            .build()
            .expect("reqwest client builds with sane defaults");

        Self { client, base_url }
    }
}

#[async_trait]
impl QuoteFeed for HttpQuoteFeed {
    async fn fetch(&self, symbol: &str, username: &str) -> Result<Quote, AppError> {
        let url = format!("{}/quote/{}/{}", self.base_url, symbol, username);

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        let body = resp
            .text()
            .await
            .map_err(|e| AppError::QuoteUnavailable(e.to_string()))?;

        parse_quote_line(&body)
    }
}

/// Parses `"price,symbol,username,quoteTs,cryptoKey"`. Price is a decimal
/// with exactly two fractional digits; the radix point is removed to get
/// integer hundredths (policy per spec.md §4.2 — more than two fractional
/// digits is rejected rather than silently truncated).
fn parse_quote_line(line: &str) -> Result<Quote, AppError> {
    let line = line.trim();
    let parts: Vec<&str> = line.split(',').collect();

    if parts.len() != 5 {
        return Err(AppError::QuoteUnavailable(format!(
            "malformed quote response: {line}"
        )));
    }

    let price_hundredths = parse_price_hundredths(parts[0])?;
    let quote_ts: u64 = parts[3]
        .parse()
        .map_err(|_| AppError::QuoteUnavailable("bad quoteTs".into()))?;
    let crypto_key = parts[4].to_string();

    Ok(Quote {
        price_hundredths,
        crypto_key,
        quote_ts,
    })
}

fn parse_price_hundredths(s: &str) -> Result<i64, AppError> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };

    if frac.len() > 2 {
        return Err(AppError::QuoteUnavailable(format!(
            "price has more than two fractional digits: {s}"
        )));
    }

    let whole: i64 = whole
        .parse()
        .map_err(|_| AppError::QuoteUnavailable(format!("bad price: {s}")))?;
    let frac_padded = format!("{:0<2}", frac);
    let frac: i64 = frac_padded
        .parse()
        .map_err(|_| AppError::QuoteUnavailable(format!("bad price: {s}")))?;

    Ok(whole * 100 + frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_decimal_price() {
        assert_eq!(parse_price_hundredths("12.34").unwrap(), 1234);
    }

    #[test]
    fn parses_whole_price() {
        assert_eq!(parse_price_hundredths("12").unwrap(), 1200);
    }

    #[test]
    fn rejects_excess_precision() {
        assert!(parse_price_hundredths("12.345").is_err());
    }

    #[test]
    fn parses_full_response_line() {
        let q = parse_quote_line("12.34,ABC,alice,1000,k1\n").unwrap();
        assert_eq!(q.price_hundredths, 1234);
        assert_eq!(q.quote_ts, 1000);
        assert_eq!(q.crypto_key, "k1");
    }
}
