//! Quiz rewards
//!
//! Local state is authoritative: points are credited to the balance right
//! away and a matching increment is queued in the outbox. `flush_outbox`
//! pushes queued increments to the remote points ledger on a best-effort
//! basis; failures stay queued and are never rolled back locally, so the
//! two sides may diverge for a while.
//!
//! Daily completion uses the device-local calendar day and is not a
//! security boundary.

pub mod outbox;

pub use outbox::{enqueue, flush_outbox, pending, FlushReport, OutboxEntry, PointsClient, PointsSink};

use crate::db::{Store, StoreKey, StoreResult};
use crate::ledger::BalanceAccount;
use crate::quiz::{DailyKey, QuizOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub outcome: QuizOutcome,
    pub completed_at: DateTime<Utc>,
}

pub fn is_completed(store: &Store, key: &DailyKey) -> StoreResult<bool> {
    store.contains(&key.completion_key())
}

pub fn completion(store: &Store, key: &DailyKey) -> StoreResult<Option<CompletionRecord>> {
    store.get(&key.completion_key())
}

/// Mark the quiz done for the day, credit the points and queue the remote
/// increment. The completion record, the outbox entry and the new balance
/// are written in one transaction; `balance` is only updated once it
/// commits. Returns false if the quiz was already completed today, in which
/// case nothing is awarded.
pub fn award_quiz(
    store: &Store,
    balance: &mut BalanceAccount,
    key: &DailyKey,
    outcome: &QuizOutcome,
) -> StoreResult<bool> {
    if is_completed(store, key)? {
        log::warn!(
            "Quiz {} already completed on {} by {}",
            key.quiz_id,
            key.day,
            key.user_id
        );
        return Ok(false);
    }

    let mut credited = balance.clone();
    credited.add_to_balance(outcome.points as f64);

    store.with_transaction(|tx| {
        tx.put(
            &key.completion_key(),
            &CompletionRecord {
                outcome: outcome.clone(),
                completed_at: Utc::now(),
            },
        )?;
        if outcome.points > 0 {
            outbox::enqueue(
                tx,
                &key.user_id,
                outcome.points as i64,
                &format!("quiz:{}:{}", key.quiz_id, key.day),
            )?;
            tx.put(
                &StoreKey::Balance {
                    user_id: key.user_id.clone(),
                },
                &credited,
            )?;
        }
        Ok(())
    })?;

    *balance = credited;

    log::info!(
        "Quiz {} completed by {}: {}/{} correct, {} points",
        key.quiz_id,
        key.user_id,
        outcome.correct,
        outcome.total_asked,
        outcome.points
    );

    Ok(true)
}

/// Seed the balance from the remote profile, once per user. Later profile
/// syncs must not overwrite local trading activity. Returns true if applied.
pub fn initialize_balance(
    store: &Store,
    balance: &mut BalanceAccount,
    user_id: &str,
    remote_balance: f64,
) -> StoreResult<bool> {
    let flag = StoreKey::BalanceInitialized {
        user_id: user_id.to_string(),
    };
    if store.contains(&flag)? {
        log::debug!("Balance for {} already initialized, ignoring profile value", user_id);
        return Ok(false);
    }

    balance.set_balance(remote_balance);
    store.put(&flag, &Utc::now())?;
    log::info!("Initialized balance for {} to {:.2}", user_id, balance.balance());

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn key() -> DailyKey {
        DailyKey::new("basics", NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(), "user-1")
    }

    #[test]
    fn test_award_credits_once_per_day() {
        let store = Store::open_in_memory().unwrap();
        let mut balance = BalanceAccount::new(100.0);
        let outcome = QuizOutcome::new("basics", 3, 5, 50);

        assert!(!is_completed(&store, &key()).unwrap());
        assert!(award_quiz(&store, &mut balance, &key(), &outcome).unwrap());
        assert_eq!(balance.balance(), 130.0);
        assert!(is_completed(&store, &key()).unwrap());
        assert_eq!(completion(&store, &key()).unwrap().unwrap().outcome, outcome);

        assert!(!award_quiz(&store, &mut balance, &key(), &outcome).unwrap());
        assert_eq!(balance.balance(), 130.0);

        let pending = outbox::pending(&store, "user-1").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, 30);
        assert_eq!(pending[0].reason, "quiz:basics:2024-07-01");
    }

    #[test]
    fn test_zero_points_queue_nothing() {
        let store = Store::open_in_memory().unwrap();
        let mut balance = BalanceAccount::new(100.0);

        let outcome = QuizOutcome::new("basics", 0, 5, 50);
        assert!(award_quiz(&store, &mut balance, &key(), &outcome).unwrap());
        assert_eq!(balance.balance(), 100.0);
        assert!(outbox::pending(&store, "user-1").unwrap().is_empty());
    }

    #[test]
    fn test_failed_queue_leaves_quiz_open() {
        let store = Store::open_in_memory().unwrap();
        let mut balance = BalanceAccount::new(100.0);
        let outcome = QuizOutcome::new("basics", 3, 5, 50);
        store.conn().execute_batch("DROP TABLE points_outbox").unwrap();

        assert!(award_quiz(&store, &mut balance, &key(), &outcome).is_err());
        assert!(!is_completed(&store, &key()).unwrap());
        assert_eq!(balance.balance(), 100.0);
        assert!(store
            .get::<BalanceAccount>(&StoreKey::Balance { user_id: "user-1".to_string() })
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_award_persists_credited_balance() {
        let store = Store::open_in_memory().unwrap();
        let mut balance = BalanceAccount::new(100.0);

        award_quiz(&store, &mut balance, &key(), &QuizOutcome::new("basics", 5, 5, 50)).unwrap();

        let stored: BalanceAccount = store
            .get(&StoreKey::Balance { user_id: "user-1".to_string() })
            .unwrap()
            .unwrap();
        assert_eq!(stored.balance(), 150.0);
    }

    #[test]
    fn test_balance_initialized_only_once() {
        let store = Store::open_in_memory().unwrap();
        let mut balance = BalanceAccount::default();

        assert!(initialize_balance(&store, &mut balance, "user-1", 10_000.0).unwrap());
        assert!(balance.deduct_from_balance(2_500.0));

        assert!(!initialize_balance(&store, &mut balance, "user-1", 10_000.0).unwrap());
        assert_eq!(balance.balance(), 7_500.0);

        let mut other = BalanceAccount::default();
        assert!(initialize_balance(&store, &mut other, "user-2", 50.0).unwrap());
        assert_eq!(other.balance(), 50.0);
    }
}
