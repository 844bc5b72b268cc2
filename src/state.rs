//! Per-user application state
//!
//! Bundles everything the command functions work on. Ledger and balance
//! are loaded from the store on startup and written back by [`AcademyState::save`].

use crate::db::{Store, StoreError, StoreKey, StoreResult};
use crate::events::EventBus;
use crate::ledger::{self, BalanceAccount, Ledger, ValuationSnapshot};
use crate::models::Stock;
use crate::quotes::{watch_symbols, PriceCache, SharedPriceCache};
use crate::rewards;
use std::collections::BTreeSet;
use std::sync::PoisonError;

pub struct AcademyState {
    store: Store,
    user_id: String,
    ledger: Ledger,
    balance: BalanceAccount,
    prices: SharedPriceCache,
    stocks: Vec<Stock>,
    events: EventBus,
}

impl AcademyState {
    /// Load the user's ledger and balance. A user without a stored balance
    /// starts with `starting_balance`.
    pub fn load(store: Store, user_id: &str, starting_balance: f64, stocks: Vec<Stock>) -> StoreResult<Self> {
        let ledger_key = StoreKey::Ledger {
            user_id: user_id.to_string(),
        };
        let mut ledger = match store.get::<Ledger>(&ledger_key) {
            Ok(Some(ledger)) => ledger,
            Ok(None) => Ledger::new(),
            Err(StoreError::Json(e)) => {
                log::warn!("Stored ledger for {} is unreadable, starting fresh: {}", user_id, e);
                Ledger::new()
            }
            Err(e) => return Err(e),
        };
        ledger.normalize();

        let balance_key = StoreKey::Balance {
            user_id: user_id.to_string(),
        };
        let balance = match store.get::<BalanceAccount>(&balance_key) {
            Ok(Some(stored)) => {
                // Re-validate through the setter
                let mut balance = BalanceAccount::default();
                balance.set_balance(stored.balance());
                balance
            }
            Ok(None) => BalanceAccount::new(starting_balance),
            Err(StoreError::Json(e)) => {
                log::warn!("Stored balance for {} is unreadable, using starting balance: {}", user_id, e);
                BalanceAccount::new(starting_balance)
            }
            Err(e) => return Err(e),
        };

        log::info!(
            "Loaded state for {}: balance {:.2}, {} holdings, {} trades",
            user_id,
            balance.balance(),
            ledger.holdings().len(),
            ledger.trades().len()
        );

        Ok(Self {
            store,
            user_id: user_id.to_string(),
            ledger,
            balance,
            prices: PriceCache::shared(),
            stocks,
            events: EventBus::new(),
        })
    }

    pub fn save(&self) -> StoreResult<()> {
        self.store.put(
            &StoreKey::Ledger {
                user_id: self.user_id.clone(),
            },
            &self.ledger,
        )?;
        self.store.put(
            &StoreKey::Balance {
                user_id: self.user_id.clone(),
            },
            &self.balance,
        )?;
        Ok(())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn balance(&self) -> &BalanceAccount {
        &self.balance
    }

    pub fn prices(&self) -> &SharedPriceCache {
        &self.prices
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn stock(&self, stock_id: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.id == stock_id)
    }

    pub(crate) fn ledger_mut(&mut self) -> (&mut Ledger, &mut BalanceAccount) {
        (&mut self.ledger, &mut self.balance)
    }

    pub(crate) fn store_and_balance_mut(&mut self) -> (&Store, &mut BalanceAccount) {
        (&self.store, &mut self.balance)
    }

    /// Watch every listed stock plus any held symbol no longer listed
    pub fn watch_market(&self) -> u64 {
        let mut symbols: BTreeSet<String> = self.stocks.iter().map(|s| s.symbol.clone()).collect();
        symbols.extend(self.ledger.symbols());
        watch_symbols(&self.prices, symbols.into_iter().collect())
    }

    /// Current valuation without touching the history
    pub fn valuation(&self) -> ValuationSnapshot {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        ledger::value_portfolio(&self.balance, &self.ledger, &*prices, &self.stocks)
    }

    /// Value the portfolio and append the total to the history
    pub fn record_snapshot(&mut self) -> ValuationSnapshot {
        let prices = self.prices.read().unwrap_or_else(PoisonError::into_inner);
        ledger::record_snapshot(&mut self.ledger, &self.balance, &*prices, &self.stocks)
    }

    /// Seed the balance from the remote profile; applied once per user
    pub fn apply_profile_balance(&mut self, remote_balance: f64) -> StoreResult<bool> {
        let applied =
            rewards::initialize_balance(&self.store, &mut self.balance, &self.user_id, remote_balance)?;
        if applied {
            self.save()?;
        }
        Ok(applied)
    }
}
