//! Operations exposed to the UI layer
//!
//! Each command works on an [`AcademyState`](crate::state::AcademyState),
//! persists what it changed and emits a data changed event.

pub mod market;
pub mod quiz;
pub mod trading;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::quotes::{CurrentPrice, HistoricalClose, QuoteError, QuoteResponse, QuoteSource};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use std::future::Future;

    /// Fixed quotes; unknown symbols fail like an upstream 404
    pub struct StaticQuotes(pub HashMap<String, f64>);

    impl StaticQuotes {
        pub fn new(prices: &[(&str, f64)]) -> Self {
            Self(prices.iter().map(|(s, p)| (s.to_string(), *p)).collect())
        }
    }

    impl QuoteSource for StaticQuotes {
        fn fetch_quote(
            &self,
            symbol: &str,
            days: Option<u32>,
        ) -> impl Future<Output = Result<QuoteResponse, QuoteError>> + Send {
            let result = match self.0.get(symbol) {
                Some(price) => Ok(QuoteResponse {
                    current_price: CurrentPrice {
                        price: *price,
                        diff: 0.0,
                        percent_change: None,
                        currency: Some("USD".to_string()),
                    },
                    historical_data: (1..=days.unwrap_or(0).min(28))
                        .map(|d| HistoricalClose {
                            date: NaiveDate::from_ymd_opt(2024, 2, d).unwrap(),
                            close: *price,
                        })
                        .collect(),
                }),
                None => Err(QuoteError::Status {
                    symbol: symbol.to_string(),
                    status: 404,
                    body: "not found".to_string(),
                }),
            };
            async move { result }
        }
    }
}
