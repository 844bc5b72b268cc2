//! Virtual cash balance
//!
//! Only three operations mutate the balance: `deduct_from_balance`,
//! `add_to_balance` and `set_balance`. The field is private so nothing else can.
//!
//! Cash is kept as integer cents; amounts are rounded to cents on the way in.

use serde::{Deserialize, Serialize};

/// Cents per currency unit
pub const AMOUNT_SCALE: i64 = 100;

/// Round a currency amount to whole cents. `None` for NaN, infinities and
/// amounts outside the i64 cent range.
pub fn to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() {
        return None;
    }
    let cents = (amount * AMOUNT_SCALE as f64).round();
    (cents.abs() < i64::MAX as f64).then_some(cents as i64)
}

pub fn from_cents(cents: i64) -> f64 {
    cents as f64 / AMOUNT_SCALE as f64
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAccount {
    balance_cents: i64,
}

impl BalanceAccount {
    pub fn new(initial: f64) -> Self {
        let mut account = Self::default();
        account.set_balance(initial);
        account
    }

    pub fn balance(&self) -> f64 {
        from_cents(self.balance_cents)
    }

    pub fn balance_cents(&self) -> i64 {
        self.balance_cents
    }

    /// Debit `amount` if it is covered; nothing changes otherwise
    pub fn deduct_from_balance(&mut self, amount: f64) -> bool {
        match to_cents(amount) {
            Some(cents) if cents >= 0 => self.deduct_cents(cents),
            _ => {
                log::warn!("Rejected debit of invalid amount {}", amount);
                false
            }
        }
    }

    pub(crate) fn deduct_cents(&mut self, cents: i64) -> bool {
        if cents < 0 {
            return false;
        }
        if cents > self.balance_cents {
            log::debug!(
                "Insufficient balance: {} requested, {} available",
                from_cents(cents),
                self.balance()
            );
            return false;
        }
        self.balance_cents -= cents;
        true
    }

    pub fn add_to_balance(&mut self, amount: f64) {
        match to_cents(amount) {
            Some(cents) if cents >= 0 => self.balance_cents = self.balance_cents.saturating_add(cents),
            _ => log::warn!("Rejected credit of invalid amount {}", amount),
        }
    }

    /// Absolute override, used to seed the balance from the remote profile
    pub fn set_balance(&mut self, value: f64) {
        match to_cents(value) {
            Some(cents) if cents >= 0 => self.balance_cents = cents,
            _ => {
                log::warn!("Rejected balance override to {}, clamping to 0", value);
                self.balance_cents = 0;
            }
        }
    }
}
