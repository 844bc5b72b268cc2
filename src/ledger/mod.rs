//! Virtual portfolio ledger
//!
//! Owns holdings, the trade log and the valuation history. Cash lives in
//! [`BalanceAccount`]; buy and sell move money only through its methods.
//!
//! - Holdings: one per stock, quantity always > 0, weighted-average cost
//! - Trades: most recent first, at most [`MAX_TRADES`]
//! - History: chronological, at most [`MAX_HISTORY_POINTS`]

pub mod balance;
pub mod valuation;

pub use balance::BalanceAccount;
use balance::to_cents;
pub use valuation::{
    latest_price, record_snapshot, value_portfolio, HoldingValuation, PriceResolver, PriceSource,
    ValuationSnapshot,
};

use crate::models::{HistoryPoint, Holding, Stock, Trade, TradeType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_TRADES: usize = 50;
pub const MAX_HISTORY_POINTS: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    #[serde(default)]
    holdings: Vec<Holding>,
    #[serde(default)]
    trades: Vec<Trade>,
    #[serde(default)]
    history: Vec<HistoryPoint>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buy `quantity` shares at `unit_price`. Returns false without touching
    /// anything if the quantity or price is invalid or cash does not cover it.
    pub fn buy(
        &mut self,
        balance: &mut BalanceAccount,
        stock: &Stock,
        quantity: u32,
        unit_price: f64,
    ) -> bool {
        if quantity == 0 || !unit_price.is_finite() || unit_price <= 0.0 {
            log::warn!(
                "Rejected buy of {} {} at {}",
                quantity,
                stock.symbol,
                unit_price
            );
            return false;
        }

        let existing = self.holdings.iter().position(|h| h.stock_id == stock.id);
        let new_qty = match existing {
            Some(idx) => match self.holdings[idx].quantity.checked_add(quantity) {
                Some(total) => total,
                None => {
                    log::warn!(
                        "Rejected buy of {} {}: position size would overflow",
                        quantity,
                        stock.symbol
                    );
                    return false;
                }
            },
            None => quantity,
        };

        let Some(cost) = to_cents(quantity as f64 * unit_price) else {
            log::warn!("Rejected buy of {} {} at {}: cost out of range", quantity, stock.symbol, unit_price);
            return false;
        };
        if !balance.deduct_cents(cost) {
            return false;
        }

        match existing {
            Some(idx) => {
                let holding = &mut self.holdings[idx];
                let old_qty = holding.quantity as f64;
                holding.avg_buy_price =
                    (holding.avg_buy_price * old_qty + unit_price * quantity as f64) / new_qty as f64;
                holding.quantity = new_qty;
            }
            None => self.holdings.push(Holding {
                stock_id: stock.id.clone(),
                symbol: stock.symbol.clone(),
                name: stock.name.clone(),
                quantity,
                avg_buy_price: unit_price,
            }),
        }

        self.push_trade(Trade::new(
            stock.id.clone(),
            stock.symbol.clone(),
            quantity,
            unit_price,
            TradeType::Buy,
        ));
        log::info!("Bought {} {} at {:.2}", quantity, stock.symbol, unit_price);

        true
    }

    /// Sell `quantity` shares of `stock_id` at `unit_price`. The holding must
    /// exist and cover the quantity; otherwise nothing changes.
    pub fn sell(
        &mut self,
        balance: &mut BalanceAccount,
        stock_id: &str,
        quantity: u32,
        unit_price: f64,
    ) -> bool {
        if quantity == 0 || !unit_price.is_finite() || unit_price <= 0.0 {
            log::warn!("Rejected sell of {} {} at {}", quantity, stock_id, unit_price);
            return false;
        }

        let Some(idx) = self.holdings.iter().position(|h| h.stock_id == stock_id) else {
            log::warn!("Rejected sell of {}: no holding", stock_id);
            return false;
        };
        if quantity > self.holdings[idx].quantity {
            log::warn!(
                "Rejected sell of {} {}: only {} held",
                quantity,
                stock_id,
                self.holdings[idx].quantity
            );
            return false;
        }

        balance.add_to_balance(quantity as f64 * unit_price);

        let holding = &mut self.holdings[idx];
        holding.quantity -= quantity;
        let symbol = holding.symbol.clone();
        if holding.quantity == 0 {
            self.holdings.remove(idx);
        }

        self.push_trade(Trade::new(
            stock_id.to_string(),
            symbol.clone(),
            quantity,
            unit_price,
            TradeType::Sell,
        ));
        log::info!("Sold {} {} at {:.2}", quantity, symbol, unit_price);

        true
    }

    /// Append a valuation point; the oldest points fall off past the cap
    pub fn add_history_point(&mut self, value: f64, timestamp: Option<DateTime<Utc>>) {
        self.history.push(HistoryPoint {
            timestamp: timestamp.unwrap_or_else(Utc::now),
            total_value: value,
        });
        if self.history.len() > MAX_HISTORY_POINTS {
            let excess = self.history.len() - MAX_HISTORY_POINTS;
            self.history.drain(..excess);
        }
    }

    pub fn get_holding(&self, stock_id: &str) -> Option<&Holding> {
        self.holdings.iter().find(|h| h.stock_id == stock_id)
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    /// Most recent first
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Oldest first
    pub fn history(&self) -> &[HistoryPoint] {
        &self.history
    }

    pub fn total_cost_basis(&self) -> f64 {
        self.holdings.iter().map(Holding::cost_basis).sum()
    }

    /// Symbols of all open positions
    pub fn symbols(&self) -> Vec<String> {
        self.holdings.iter().map(|h| h.symbol.clone()).collect()
    }

    /// Re-establish the invariants on state loaded from storage
    pub fn normalize(&mut self) {
        let before = self.holdings.len();
        self.holdings
            .retain(|h| h.quantity > 0 && h.avg_buy_price.is_finite() && h.avg_buy_price > 0.0);
        if self.holdings.len() != before {
            log::warn!("Dropped {} invalid holdings from stored ledger", before - self.holdings.len());
        }

        self.trades.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.trades.truncate(MAX_TRADES);

        self.history.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        if self.history.len() > MAX_HISTORY_POINTS {
            let excess = self.history.len() - MAX_HISTORY_POINTS;
            self.history.drain(..excess);
        }
    }

    fn push_trade(&mut self, trade: Trade) {
        self.trades.insert(0, trade);
        self.trades.truncate(MAX_TRADES);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn stock(id: &str) -> Stock {
        Stock {
            id: id.to_string(),
            symbol: id.to_uppercase(),
            name: format!("{} Inc.", id),
            reference_price: 100.0,
        }
    }

    #[test]
    fn test_buy_then_partial_sell() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(10_000.0);
        let acme = stock("acme");

        assert!(ledger.buy(&mut balance, &acme, 10, 100.0));
        assert_eq!(balance.balance(), 9_000.0);
        let holding = ledger.get_holding("acme").unwrap();
        assert_eq!(holding.quantity, 10);
        assert_eq!(holding.avg_buy_price, 100.0);

        assert!(ledger.sell(&mut balance, "acme", 4, 120.0));
        assert_eq!(balance.balance(), 9_480.0);
        let holding = ledger.get_holding("acme").unwrap();
        assert_eq!(holding.quantity, 6);
        assert_eq!(holding.avg_buy_price, 100.0);

        assert_eq!(ledger.trades()[0].trade_type, TradeType::Sell);
        assert_eq!(ledger.trades()[1].trade_type, TradeType::Buy);
    }

    #[test]
    fn test_average_cost_is_weighted() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(10_000.0);
        let acme = stock("acme");

        assert!(ledger.buy(&mut balance, &acme, 10, 100.0));
        assert!(ledger.buy(&mut balance, &acme, 30, 120.0));

        let holding = ledger.get_holding("acme").unwrap();
        assert_eq!(holding.quantity, 40);
        assert!((holding.avg_buy_price - 115.0).abs() < 1e-9);
        assert_eq!(ledger.holdings().len(), 1);
        assert_eq!(balance.balance(), 10_000.0 - 1_000.0 - 3_600.0);
    }

    #[test]
    fn test_insufficient_balance_changes_nothing() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(500.0);

        assert!(!ledger.buy(&mut balance, &stock("acme"), 6, 100.0));
        assert_eq!(balance.balance(), 500.0);
        assert!(ledger.holdings().is_empty());
        assert!(ledger.trades().is_empty());

        // Exactly affordable
        assert!(ledger.buy(&mut balance, &stock("acme"), 5, 100.0));
        assert_eq!(balance.balance(), 0.0);
    }

    #[test]
    fn test_exactly_affordable_buy_at_decimal_price() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(0.3);

        assert!(ledger.buy(&mut balance, &stock("acme"), 3, 0.1));
        assert_eq!(balance.balance_cents(), 0);
        assert_eq!(ledger.get_holding("acme").unwrap().quantity, 3);
    }

    #[test]
    fn test_position_overflow_is_rejected_before_debit() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(10_000.0);
        let acme = stock("acme");

        assert!(ledger.buy(&mut balance, &acme, 4_000_000_000, 0.000001));
        let cash = balance.balance_cents();

        assert!(!ledger.buy(&mut balance, &acme, 1_000_000_000, 0.000001));
        assert_eq!(balance.balance_cents(), cash);
        assert_eq!(ledger.get_holding("acme").unwrap().quantity, 4_000_000_000);
        assert_eq!(ledger.trades().len(), 1);
    }

    #[test]
    fn test_invalid_quantity_or_price() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(500.0);
        let acme = stock("acme");

        assert!(!ledger.buy(&mut balance, &acme, 0, 10.0));
        assert!(!ledger.buy(&mut balance, &acme, 1, 0.0));
        assert!(!ledger.buy(&mut balance, &acme, 1, f64::NAN));
        assert!(ledger.buy(&mut balance, &acme, 1, 10.0));
        assert!(!ledger.sell(&mut balance, "acme", 0, 10.0));
        assert!(!ledger.sell(&mut balance, "acme", 1, -3.0));
        assert_eq!(balance.balance(), 490.0);
    }

    #[test]
    fn test_full_sell_removes_holding() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(1_000.0);

        assert!(ledger.buy(&mut balance, &stock("acme"), 3, 50.0));
        assert!(ledger.sell(&mut balance, "acme", 3, 40.0));

        assert!(ledger.get_holding("acme").is_none());
        assert!(ledger.holdings().is_empty());
        assert_eq!(balance.balance(), 1_000.0 - 150.0 + 120.0);
    }

    #[test]
    fn test_oversell_and_unknown_stock_are_rejected() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(1_000.0);
        assert!(ledger.buy(&mut balance, &stock("acme"), 3, 50.0));

        assert!(!ledger.sell(&mut balance, "acme", 4, 50.0));
        assert!(!ledger.sell(&mut balance, "globex", 1, 50.0));

        assert_eq!(balance.balance(), 850.0);
        assert_eq!(ledger.get_holding("acme").unwrap().quantity, 3);
        assert_eq!(ledger.trades().len(), 1);
    }

    #[test]
    fn test_trade_log_is_bounded() {
        let mut ledger = Ledger::new();
        let mut balance = BalanceAccount::new(1_000_000.0);
        let acme = stock("acme");

        for i in 1..=60 {
            assert!(ledger.buy(&mut balance, &acme, i, 1.0));
        }

        let trades = ledger.trades();
        assert_eq!(trades.len(), MAX_TRADES);
        // Newest (quantity 60) first, oldest kept is quantity 11
        assert_eq!(trades[0].quantity, 60);
        assert_eq!(trades[MAX_TRADES - 1].quantity, 11);
    }

    #[test]
    fn test_history_is_bounded_and_chronological() {
        let mut ledger = Ledger::new();
        let start = Utc::now();

        for i in 0..250 {
            ledger.add_history_point(i as f64, Some(start + Duration::seconds(i)));
        }

        let history = ledger.history();
        assert_eq!(history.len(), MAX_HISTORY_POINTS);
        assert_eq!(history[0].total_value, 50.0);
        assert_eq!(history[MAX_HISTORY_POINTS - 1].total_value, 249.0);
        assert!(history.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_normalize_repairs_stored_state() {
        let json = r#"{
            "holdings": [
                {"stockId": "acme", "symbol": "ACME", "name": "Acme", "quantity": 0, "avgBuyPrice": 10.0},
                {"stockId": "globex", "symbol": "GBX", "name": "Globex", "quantity": 2, "avgBuyPrice": 10.0}
            ]
        }"#;
        let mut ledger: Ledger = serde_json::from_str(json).unwrap();
        ledger.normalize();

        assert_eq!(ledger.holdings().len(), 1);
        assert_eq!(ledger.symbols(), vec!["GBX".to_string()]);
        assert_eq!(ledger.total_cost_basis(), 20.0);
    }
}
