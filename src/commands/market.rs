//! Market data commands for the stock detail view

use crate::quotes::{HistoricalClose, PredictionClient, QuoteSource};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHART_DAYS: u32 = 30;
const MAX_CHART_DAYS: u32 = 365;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChart {
    pub symbol: String,
    pub price: f64,
    pub diff: f64,
    pub percent_change: Option<f64>,
    /// Oldest first
    pub closes: Vec<HistoricalClose>,
}

/// Current price and up to `days` daily closes
pub async fn get_stock_chart<S: QuoteSource>(source: &S, symbol: &str, days: u32) -> Result<StockChart> {
    let days = days.clamp(1, MAX_CHART_DAYS);
    let response = source
        .fetch_quote(symbol, Some(days))
        .await
        .with_context(|| format!("Failed to load chart for {}", symbol))?;

    let mut closes = response.historical_data;
    closes.sort_by_key(|c| c.date);
    closes.dedup_by_key(|c| c.date);

    Ok(StockChart {
        symbol: symbol.trim().to_uppercase(),
        price: response.current_price.price,
        diff: response.current_price.diff,
        percent_change: response.current_price.percent_change,
        closes,
    })
}

/// Advisory next-close estimate from the prediction service
pub async fn predict_next_close<S: QuoteSource>(
    source: &S,
    predictor: &PredictionClient,
    symbol: &str,
    days: u32,
) -> Result<f64> {
    let chart = get_stock_chart(source, symbol, days).await?;
    let predicted = predictor
        .predict_next_close(&chart.symbol, &chart.closes)
        .await
        .with_context(|| format!("Prediction for {} failed", chart.symbol))?;

    log::debug!("Predicted next close for {}: {:.2}", chart.symbol, predicted);
    Ok(predicted)
}
