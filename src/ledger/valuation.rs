//! Portfolio valuation
//!
//! Total value = cash + Σ quantity × market price. The market price of a
//! holding comes from the live quote cache if it has one, else from the
//! stock's reference price, else from the holding's own average cost.

use super::{BalanceAccount, Ledger};
use crate::models::{Holding, Stock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lookup of live prices by symbol
pub trait PriceResolver {
    fn live_price(&self, symbol: &str) -> Option<f64>;
}

impl PriceResolver for HashMap<String, f64> {
    fn live_price(&self, symbol: &str) -> Option<f64> {
        self.get(symbol).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceSource {
    Live,
    Reference,
    Cost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingValuation {
    pub stock_id: String,
    pub symbol: String,
    pub quantity: u32,
    pub price: f64,
    pub price_source: PriceSource,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub cost_basis: f64,
    pub unrealized_pnl: f64,
    pub holdings: Vec<HoldingValuation>,
}

fn usable(price: f64) -> Option<f64> {
    (price.is_finite() && price > 0.0).then_some(price)
}

/// Best known price for a stock: live quote, then reference price
pub fn latest_price<P: PriceResolver + ?Sized>(stock: &Stock, live: &P) -> Option<(f64, PriceSource)> {
    if let Some(price) = live.live_price(&stock.symbol).and_then(usable) {
        return Some((price, PriceSource::Live));
    }
    usable(stock.reference_price).map(|p| (p, PriceSource::Reference))
}

fn holding_price<P: PriceResolver + ?Sized>(
    holding: &Holding,
    live: &P,
    stocks: &[Stock],
) -> (f64, PriceSource) {
    if let Some(price) = live.live_price(&holding.symbol).and_then(usable) {
        return (price, PriceSource::Live);
    }
    if let Some(price) = stocks
        .iter()
        .find(|s| s.id == holding.stock_id)
        .and_then(|s| usable(s.reference_price))
    {
        return (price, PriceSource::Reference);
    }
    (holding.avg_buy_price, PriceSource::Cost)
}

pub fn value_portfolio<P: PriceResolver + ?Sized>(
    balance: &BalanceAccount,
    ledger: &Ledger,
    live: &P,
    stocks: &[Stock],
) -> ValuationSnapshot {
    let holdings: Vec<HoldingValuation> = ledger
        .holdings()
        .iter()
        .map(|h| {
            let (price, price_source) = holding_price(h, live, stocks);
            let market_value = h.quantity as f64 * price;
            HoldingValuation {
                stock_id: h.stock_id.clone(),
                symbol: h.symbol.clone(),
                quantity: h.quantity,
                price,
                price_source,
                market_value,
                unrealized_pnl: market_value - h.cost_basis(),
            }
        })
        .collect();

    let holdings_value: f64 = holdings.iter().map(|h| h.market_value).sum();
    let cost_basis = ledger.total_cost_basis();
    let cash = balance.balance();

    ValuationSnapshot {
        timestamp: Utc::now(),
        cash,
        holdings_value,
        total_value: cash + holdings_value,
        cost_basis,
        unrealized_pnl: holdings_value - cost_basis,
        holdings,
    }
}

/// Value the portfolio and append the total to the ledger history
pub fn record_snapshot<P: PriceResolver + ?Sized>(
    ledger: &mut Ledger,
    balance: &BalanceAccount,
    live: &P,
    stocks: &[Stock],
) -> ValuationSnapshot {
    let snapshot = value_portfolio(balance, ledger, live, stocks);
    ledger.add_history_point(snapshot.total_value, Some(snapshot.timestamp));
    log::debug!(
        "Portfolio snapshot: cash {:.2}, holdings {:.2}, total {:.2}",
        snapshot.cash,
        snapshot.holdings_value,
        snapshot.total_value
    );
    snapshot
}
