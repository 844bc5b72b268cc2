//! Quote proxy client
//!
//! The proxy wraps the upstream market data API:
//! `GET {base}/quote?symbol=AAPL&days=30` ->
//! `{"currentPrice": {...}, "historicalData": [{"date", "close"}]}`

use super::{normalize_symbol, QuoteError, QuoteResponse, QuoteSource};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::future::Future;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const API_KEY_HEADER: &str = "x-api-key";

/// Shared HTTP client setup for all outbound calls
pub(crate) fn create_client(api_key: Option<&str>) -> Result<reqwest::Client, QuoteError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static("stock-academy/0.1"));
    if let Some(key) = api_key.filter(|k| !k.is_empty()) {
        match HeaderValue::from_str(key) {
            Ok(mut value) => {
                value.set_sensitive(true);
                headers.insert(API_KEY_HEADER, value);
            }
            Err(_) => log::warn!("API key contains invalid header characters, sending without it"),
        }
    }

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

#[derive(Debug, Clone)]
pub struct ProxyQuoteClient {
    base_url: String,
    client: reqwest::Client,
}

impl ProxyQuoteClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, QuoteError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: create_client(api_key)?,
        })
    }

    /// Request URL for `symbol`; the symbol must already be normalized
    pub fn quote_url(&self, symbol: &str, days: Option<u32>) -> String {
        let mut url = format!("{}/quote?symbol={}", self.base_url, urlencoding::encode(symbol));
        if let Some(days) = days {
            url.push_str(&format!("&days={}", days));
        }
        url
    }

    pub async fn get_quote(&self, symbol: &str, days: Option<u32>) -> Result<QuoteResponse, QuoteError> {
        let symbol =
            normalize_symbol(symbol).ok_or_else(|| QuoteError::InvalidSymbol(symbol.to_string()))?;
        let url = self.quote_url(&symbol, days);
        log::debug!("Fetching quote for {} from {}", symbol, url);

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Quote proxy error for {}: {} - {}", symbol, status, body);
            return Err(QuoteError::Status {
                symbol,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        parse_quote_response(&symbol, &body)
    }
}

impl QuoteSource for ProxyQuoteClient {
    fn fetch_quote(
        &self,
        symbol: &str,
        days: Option<u32>,
    ) -> impl Future<Output = Result<QuoteResponse, QuoteError>> + Send {
        self.get_quote(symbol, days)
    }
}

/// Parse a proxy body, rejecting payloads without a usable price
pub fn parse_quote_response(symbol: &str, body: &str) -> Result<QuoteResponse, QuoteError> {
    let response: QuoteResponse = serde_json::from_str(body).map_err(|e| QuoteError::Malformed {
        symbol: symbol.to_string(),
        message: e.to_string(),
    })?;

    let price = response.current_price.price;
    if !price.is_finite() || price <= 0.0 {
        return Err(QuoteError::Malformed {
            symbol: symbol.to_string(),
            message: format!("unusable price {}", price),
        });
    }

    Ok(response)
}
