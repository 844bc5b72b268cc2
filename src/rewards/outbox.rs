//! Pending point increments for the remote points ledger

use crate::db::{Store, StoreResult};
use crate::quotes::proxy::create_client;
use crate::quotes::QuoteError;
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Entries are dropped from a flush after this many failed attempts
pub const MAX_ATTEMPTS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxEntry {
    pub id: i64,
    pub user_id: String,
    pub amount: i64,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Remote side of the points ledger
pub trait PointsSink: Send + Sync {
    fn increment(&self, user_id: &str, amount: i64) -> impl Future<Output = Result<(), QuoteError>> + Send;
}

pub fn enqueue(store: &Store, user_id: &str, amount: i64, reason: &str) -> StoreResult<i64> {
    store.conn().execute(
        "INSERT INTO points_outbox (user_id, amount, reason, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, amount, reason, Utc::now().to_rfc3339()],
    )?;
    let id = store.conn().last_insert_rowid();
    log::debug!("Queued {} points for {} ({})", amount, user_id, reason);
    Ok(id)
}

/// Oldest first
pub fn pending(store: &Store, user_id: &str) -> StoreResult<Vec<OutboxEntry>> {
    let mut stmt = store.conn().prepare(
        "SELECT id, user_id, amount, reason, created_at, attempts, last_error
         FROM points_outbox WHERE user_id = ?1 ORDER BY id",
    )?;

    let entries = stmt
        .query_map(params![user_id], |row| {
            let created_at: String = row.get(4)?;
            Ok(OutboxEntry {
                id: row.get(0)?,
                user_id: row.get(1)?,
                amount: row.get(2)?,
                reason: row.get(3)?,
                created_at: DateTime::parse_from_rfc3339(&created_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now()),
                attempts: row.get(5)?,
                last_error: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(entries)
}

fn mark_sent(store: &Store, id: i64) -> StoreResult<()> {
    store.conn().execute("DELETE FROM points_outbox WHERE id = ?1", params![id])?;
    Ok(())
}

fn mark_failed(store: &Store, id: i64, error: &str) -> StoreResult<()> {
    store.conn().execute(
        "UPDATE points_outbox SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
        params![id, error],
    )?;
    Ok(())
}

/// Push a user's pending increments to `sink`. Failed entries stay queued
/// with their attempt count bumped; local balances are never rolled back.
pub async fn flush_outbox<S: PointsSink>(store: &Store, sink: &S, user_id: &str) -> StoreResult<FlushReport> {
    let mut report = FlushReport::default();

    for entry in pending(store, user_id)? {
        if entry.attempts >= MAX_ATTEMPTS {
            report.skipped += 1;
            continue;
        }

        match sink.increment(&entry.user_id, entry.amount).await {
            Ok(()) => {
                mark_sent(store, entry.id)?;
                report.sent += 1;
            }
            Err(e) => {
                log::warn!(
                    "Failed to sync {} points for {} (attempt {}): {}",
                    entry.amount,
                    entry.user_id,
                    entry.attempts + 1,
                    e
                );
                mark_failed(store, entry.id, &e.to_string())?;
                report.failed += 1;
            }
        }
    }

    if report.sent > 0 || report.failed > 0 {
        log::info!(
            "Points sync for {}: {} sent, {} failed, {} skipped",
            user_id,
            report.sent,
            report.failed,
            report.skipped
        );
    }

    Ok(report)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct IncrementRequest<'a> {
    user_id: &'a str,
    amount: i64,
}

/// `POST {base}/increment` with `{"userId", "amount"}`
#[derive(Debug, Clone)]
pub struct PointsClient {
    endpoint: String,
    client: reqwest::Client,
}

impl PointsClient {
    pub fn new(base_url: &str, api_key: Option<&str>) -> Result<Self, QuoteError> {
        Ok(Self {
            endpoint: format!("{}/increment", base_url.trim_end_matches('/')),
            client: create_client(api_key)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn send_increment(&self, user_id: &str, amount: i64) -> Result<(), QuoteError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&IncrementRequest { user_id, amount })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QuoteError::Status {
                symbol: format!("points:{}", user_id),
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

impl PointsSink for PointsClient {
    fn increment(&self, user_id: &str, amount: i64) -> impl Future<Output = Result<(), QuoteError>> + Send {
        self.send_increment(user_id, amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records calls and fails for amounts listed in `reject`
    struct RecordingSink {
        calls: Mutex<Vec<(String, i64)>>,
        reject: Vec<i64>,
    }

    impl RecordingSink {
        fn new(reject: &[i64]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                reject: reject.to_vec(),
            }
        }
    }

    impl PointsSink for RecordingSink {
        fn increment(&self, user_id: &str, amount: i64) -> impl Future<Output = Result<(), QuoteError>> + Send {
            self.calls.lock().unwrap().push((user_id.to_string(), amount));
            let result = if self.reject.contains(&amount) {
                Err(QuoteError::Status {
                    symbol: "points".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            };
            async move { result }
        }
    }

    #[test]
    fn test_enqueue_and_pending_order() {
        let store = Store::open_in_memory().unwrap();
        enqueue(&store, "u1", 30, "quiz:a").unwrap();
        enqueue(&store, "u2", 5, "quiz:a").unwrap();
        enqueue(&store, "u1", 10, "quiz:b").unwrap();

        let entries = pending(&store, "u1").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].amount, 30);
        assert_eq!(entries[1].reason, "quiz:b");
        assert_eq!(entries[0].attempts, 0);
        assert!(entries[0].last_error.is_none());
    }

    #[tokio::test]
    async fn test_flush_removes_sent_and_keeps_failed() {
        let store = Store::open_in_memory().unwrap();
        enqueue(&store, "u1", 30, "quiz:a").unwrap();
        enqueue(&store, "u1", 13, "quiz:b").unwrap();
        let sink = RecordingSink::new(&[13]);

        let report = flush_outbox(&store, &sink, "u1").await.unwrap();
        assert_eq!(report, FlushReport { sent: 1, failed: 1, skipped: 0 });

        let left = pending(&store, "u1").unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].amount, 13);
        assert_eq!(left[0].attempts, 1);
        assert!(left[0].last_error.as_deref().unwrap().contains("503"));

        assert_eq!(
            *sink.calls.lock().unwrap(),
            vec![("u1".to_string(), 30), ("u1".to_string(), 13)]
        );
    }

    #[tokio::test]
    async fn test_exhausted_entries_are_skipped() {
        let store = Store::open_in_memory().unwrap();
        enqueue(&store, "u1", 7, "quiz:a").unwrap();
        let sink = RecordingSink::new(&[7]);

        for _ in 0..MAX_ATTEMPTS {
            flush_outbox(&store, &sink, "u1").await.unwrap();
        }
        let report = flush_outbox(&store, &sink, "u1").await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(sink.calls.lock().unwrap().len(), MAX_ATTEMPTS as usize);
        assert_eq!(pending(&store, "u1").unwrap().len(), 1);
    }

    #[test]
    fn test_points_endpoint() {
        let client = PointsClient::new("https://points.example.test/", None).unwrap();
        assert_eq!(client.endpoint(), "https://points.example.test/increment");
    }
}
