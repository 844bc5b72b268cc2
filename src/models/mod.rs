use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty tier of a quiz question
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Difficult,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Difficult => "Difficult",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: String,
    pub difficulty: Difficulty,
}

/// A quiz topic: its question pool and how many points a perfect run pays
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizDefinition {
    pub id: String,
    pub title: String,
    pub description: String,
    pub max_points: u32,
    pub questions_per_day: usize,
    pub questions: Vec<QuizQuestion>,
}

/// Tradable instrument with a reference price used when no live quote is known
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub reference_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub stock_id: String,
    pub symbol: String,
    pub name: String,
    pub quantity: u32,
    pub avg_buy_price: f64,
}

impl Holding {
    /// Cost basis of the open position
    pub fn cost_basis(&self) -> f64 {
        self.quantity as f64 * self.avg_buy_price
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeType {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub stock_id: String,
    pub symbol: String,
    pub quantity: u32,
    pub price: f64,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn new(
        stock_id: String,
        symbol: String,
        quantity: u32,
        price: f64,
        trade_type: TradeType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stock_id,
            symbol,
            quantity,
            price,
            trade_type,
            timestamp: Utc::now(),
        }
    }

    pub fn total(&self) -> f64 {
        self.quantity as f64 * self.price
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub total_value: f64,
}
