//! Trading commands
//!
//! A trade refreshes the stock's quote first. If the refresh fails the last
//! polled price is used, then the stock's reference price.

use crate::events::{emit_data_changed, DataChangedPayload};
use crate::ledger::{latest_price, PriceSource, ValuationSnapshot};
use crate::models::{Stock, Trade};
use crate::quotes::QuoteSource;
use crate::state::AcademyState;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::PoisonError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub trade: Trade,
    pub price_source: PriceSource,
    pub balance: f64,
    pub snapshot: ValuationSnapshot,
}

/// Refresh the quote for `stock` and return the price a trade should use
pub async fn refresh_price<S: QuoteSource>(
    state: &AcademyState,
    source: Option<&S>,
    stock: &Stock,
) -> Option<(f64, PriceSource)> {
    if let Some(source) = source {
        match source.fetch_quote(&stock.symbol, None).await {
            Ok(response) => {
                let mut cache = state.prices().write().unwrap_or_else(PoisonError::into_inner);
                if cache.update(&stock.symbol, &response.current_price) {
                    return Some((response.current_price.price, PriceSource::Live));
                }
            }
            Err(e) => log::warn!("Price refresh for {} failed, using last known price: {}", stock.symbol, e),
        }
    }

    let cache = state.prices().read().unwrap_or_else(PoisonError::into_inner);
    latest_price(stock, &*cache)
}

pub async fn buy_stock<S: QuoteSource>(
    state: &mut AcademyState,
    source: Option<&S>,
    stock_id: &str,
    quantity: u32,
) -> Result<TradeReceipt> {
    let stock = state
        .stock(stock_id)
        .cloned()
        .ok_or_else(|| anyhow!("Unknown stock: {}", stock_id))?;
    let (price, price_source) = refresh_price(state, source, &stock)
        .await
        .ok_or_else(|| anyhow!("No price available for {}", stock.symbol))?;

    let accepted = {
        let (ledger, balance) = state.ledger_mut();
        ledger.buy(balance, &stock, quantity, price)
    };
    if !accepted {
        bail!(
            "Cannot buy {} {} at {:.2}: invalid quantity or insufficient balance",
            quantity,
            stock.symbol,
            price
        );
    }

    commit(state, "bought", stock_id, price_source)
}

pub async fn sell_stock<S: QuoteSource>(
    state: &mut AcademyState,
    source: Option<&S>,
    stock_id: &str,
    quantity: u32,
) -> Result<TradeReceipt> {
    let holding = state
        .ledger()
        .get_holding(stock_id)
        .cloned()
        .ok_or_else(|| anyhow!("No holding for {}", stock_id))?;

    // Delisted stocks are still sellable; value them from the holding itself
    let stock = state.stock(stock_id).cloned().unwrap_or_else(|| Stock {
        id: holding.stock_id.clone(),
        symbol: holding.symbol.clone(),
        name: holding.name.clone(),
        reference_price: holding.avg_buy_price,
    });
    let (price, price_source) = refresh_price(state, source, &stock)
        .await
        .ok_or_else(|| anyhow!("No price available for {}", stock.symbol))?;

    let accepted = {
        let (ledger, balance) = state.ledger_mut();
        ledger.sell(balance, stock_id, quantity, price)
    };
    if !accepted {
        bail!(
            "Cannot sell {} {} at {:.2}: invalid quantity or price, {} held",
            quantity,
            holding.symbol,
            price,
            holding.quantity
        );
    }

    commit(state, "sold", stock_id, price_source)
}

/// Snapshot, persist and notify after an accepted trade
fn commit(state: &mut AcademyState, action: &str, stock_id: &str, price_source: PriceSource) -> Result<TradeReceipt> {
    let snapshot = state.record_snapshot();
    state.watch_market();
    state.save().context("Failed to save ledger after trade")?;

    let trade = state
        .ledger()
        .trades()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Trade log is empty after a trade"))?;

    emit_data_changed(state.events(), DataChangedPayload::trade(action, stock_id));
    emit_data_changed(state.events(), DataChangedPayload::balance(action));

    Ok(TradeReceipt {
        trade,
        price_source,
        balance: state.balance().balance(),
        snapshot,
    })
}
