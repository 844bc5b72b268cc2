//! Live price plumbing
//!
//! - `proxy`: HTTP client for the quote proxy (current price + daily closes)
//! - `prediction`: advisory next-close prediction service
//! - `cache`: shared price cache with a request generation counter
//! - `poller`: fixed-interval refresh of the watched symbols
//!
//! Failed fetches never propagate into the ledger: a cycle that fails for a
//! symbol simply leaves its last known price in place.

pub mod cache;
pub mod poller;
pub mod prediction;
pub mod proxy;

pub use cache::{LivePrice, PriceCache, SharedPriceCache};
pub use poller::{
    poll_once, spawn_price_poller, watch_symbols, PollReport, PricePoller, DEFAULT_POLL_INTERVAL,
};
pub use prediction::PredictionClient;
pub use proxy::ProxyQuoteClient;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

static SYMBOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9^][A-Z0-9.\-=]{0,14}$").unwrap());

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} for {symbol}: {body}")]
    Status {
        symbol: String,
        status: u16,
        body: String,
    },
    #[error("unexpected response for {symbol}: {message}")]
    Malformed { symbol: String, message: String },
}

/// Current price block of a proxy response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentPrice {
    pub price: f64,
    #[serde(default)]
    pub diff: f64,
    #[serde(default)]
    pub percent_change: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One daily close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalClose {
    pub date: NaiveDate,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    pub current_price: CurrentPrice,
    #[serde(default)]
    pub historical_data: Vec<HistoricalClose>,
}

/// Anything that can produce quotes for a symbol
pub trait QuoteSource: Send + Sync {
    /// Current price, plus `days` of daily closes when requested
    fn fetch_quote(
        &self,
        symbol: &str,
        days: Option<u32>,
    ) -> impl Future<Output = Result<QuoteResponse, QuoteError>> + Send;
}

/// Trim and uppercase a ticker; `None` if it does not look like one
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let normalized = symbol.trim().to_uppercase();
    SYMBOL_RE.is_match(&normalized).then_some(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl "), Some("AAPL".to_string()));
        assert_eq!(normalize_symbol("brk.b"), Some("BRK.B".to_string()));
        assert_eq!(normalize_symbol("^gspc"), Some("^GSPC".to_string()));
        assert_eq!(normalize_symbol(""), None);
        assert_eq!(normalize_symbol("AAPL&range=max"), None);
        assert_eq!(normalize_symbol("../etc"), None);
    }

    #[test]
    fn test_parse_proxy_payload() {
        let json = r#"{
            "currentPrice": {"price": 187.44, "diff": -1.2, "percentChange": -0.64},
            "historicalData": [
                {"date": "2024-04-01", "close": 186.1},
                {"date": "2024-04-02", "close": 188.6}
            ]
        }"#;
        let response: QuoteResponse = serde_json::from_str(json).unwrap();

        assert_eq!(response.current_price.price, 187.44);
        assert_eq!(response.current_price.diff, -1.2);
        assert_eq!(response.historical_data.len(), 2);
        assert_eq!(response.historical_data[1].close, 188.6);
    }

    #[test]
    fn test_parse_minimal_payload() {
        let response: QuoteResponse =
            serde_json::from_str(r#"{"currentPrice": {"price": 10.0}}"#).unwrap();
        assert_eq!(response.current_price.diff, 0.0);
        assert!(response.historical_data.is_empty());
    }
}
