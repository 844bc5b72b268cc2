//! Next-close prediction service client
//!
//! Purely advisory: the result is shown next to a chart and never feeds
//! the ledger.

use super::proxy::create_client;
use super::{normalize_symbol, HistoricalClose, QuoteError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    pub symbol: String,
    pub days: u32,
    pub close_prices: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PredictionResponse {
    pub predicted_next_close: f64,
}

#[derive(Debug, Clone)]
pub struct PredictionClient {
    endpoint: String,
    client: reqwest::Client,
}

impl PredictionClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, QuoteError> {
        Ok(Self {
            endpoint: format!("{}/predict", base_url.trim_end_matches('/')),
            client: create_client(api_key)?,
        })
    }

    pub async fn predict_next_close(
        &self,
        symbol: &str,
        history: &[HistoricalClose],
    ) -> Result<f64, QuoteError> {
        let request = build_request(symbol, history)?;
        log::debug!(
            "Requesting prediction for {} from {} closes",
            request.symbol,
            request.close_prices.len()
        );

        let response = self.client.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Prediction service error for {}: {} - {}", request.symbol, status, body);
            return Err(QuoteError::Status {
                symbol: request.symbol,
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: PredictionResponse =
            serde_json::from_str(&body).map_err(|e| QuoteError::Malformed {
                symbol: request.symbol.clone(),
                message: e.to_string(),
            })?;

        Ok(parsed.predicted_next_close)
    }
}

/// Closes in chronological order, as the service expects
pub fn build_request(symbol: &str, history: &[HistoricalClose]) -> Result<PredictionRequest, QuoteError> {
    let symbol =
        normalize_symbol(symbol).ok_or_else(|| QuoteError::InvalidSymbol(symbol.to_string()))?;

    let mut sorted: Vec<&HistoricalClose> = history.iter().collect();
    sorted.sort_by_key(|c| c.date);
    let close_prices: Vec<f64> = sorted.iter().map(|c| c.close).collect();

    if close_prices.is_empty() {
        return Err(QuoteError::Malformed {
            symbol,
            message: "no closing prices to predict from".to_string(),
        });
    }

    Ok(PredictionRequest {
        symbol,
        days: close_prices.len() as u32,
        close_prices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn close(day: u32, value: f64) -> HistoricalClose {
        HistoricalClose {
            date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            close: value,
        }
    }

    #[test]
    fn test_request_shape_and_order() {
        let request = build_request("msft", &[close(3, 12.0), close(1, 10.0), close(2, 11.0)]).unwrap();

        assert_eq!(request.symbol, "MSFT");
        assert_eq!(request.days, 3);
        assert_eq!(request.close_prices, vec![10.0, 11.0, 12.0]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["closePrices"][0], 10.0);
    }

    #[test]
    fn test_empty_history_is_rejected() {
        assert!(matches!(build_request("MSFT", &[]), Err(QuoteError::Malformed { .. })));
    }

    #[test]
    fn test_response_uses_snake_case_field() {
        let parsed: PredictionResponse =
            serde_json::from_str(r#"{"predicted_next_close": 101.25}"#).unwrap();
        assert_eq!(parsed.predicted_next_close, 101.25);
    }
}
