//! Change notifications for the UI layer.
//!
//! When an operation modifies data (trades, balance, quiz completion),
//! emit these events so listeners can refresh their views.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Event name constant
pub const DATA_CHANGED_EVENT: &str = "data_changed";

const CHANNEL_CAPACITY: usize = 64;

/// Payload for data change events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChangedPayload {
    /// The entity type that changed (e.g., "trade", "balance", "quiz")
    pub entity: String,
    /// The action that occurred (e.g., "bought", "sold", "completed")
    pub action: String,
    /// Optional: affected stock IDs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock_ids: Option<Vec<String>>,
    /// Optional: affected quiz ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_id: Option<String>,
}

impl DataChangedPayload {
    /// Create a trade event
    pub fn trade(action: &str, stock_id: &str) -> Self {
        Self {
            entity: "trade".to_string(),
            action: action.to_string(),
            stock_ids: Some(vec![stock_id.to_string()]),
            quiz_id: None,
        }
    }

    pub fn balance(action: &str) -> Self {
        Self {
            entity: "balance".to_string(),
            action: action.to_string(),
            stock_ids: None,
            quiz_id: None,
        }
    }

    /// Create a quiz completion event
    pub fn quiz_completed(quiz_id: &str) -> Self {
        Self {
            entity: "quiz".to_string(),
            action: "completed".to_string(),
            stock_ids: None,
            quiz_id: Some(quiz_id.to_string()),
        }
    }
}

/// Fan-out channel for [`DataChangedPayload`]
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DataChangedPayload>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DataChangedPayload> {
        self.sender.subscribe()
    }
}

/// Emit a data changed event to all listeners
pub fn emit_data_changed(bus: &EventBus, payload: DataChangedPayload) {
    if bus.sender.receiver_count() == 0 {
        log::trace!("No listeners for {} event", DATA_CHANGED_EVENT);
        return;
    }
    if let Err(e) = bus.sender.send(payload) {
        log::warn!("Failed to emit {} event: {}", DATA_CHANGED_EVENT, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_serialization() {
        let json = serde_json::to_value(DataChangedPayload::trade("bought", "aapl")).unwrap();
        assert_eq!(json["entity"], "trade");
        assert_eq!(json["stockIds"][0], "aapl");
        assert!(json.get("quizId").is_none());
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        emit_data_changed(&bus, DataChangedPayload::quiz_completed("basics"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.quiz_id.as_deref(), Some("basics"));
    }

    #[test]
    fn test_emit_without_listeners_is_quiet() {
        let bus = EventBus::default();
        emit_data_changed(&bus, DataChangedPayload::balance("updated"));
    }
}
