//! Built-in quiz topics and tradable stocks

use crate::models::{QuizDefinition, Stock};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::from_json(include_str!("catalog.json")).unwrap_or_else(|e| {
        log::error!("Embedded catalog is invalid: {}", e);
        Catalog::default()
    })
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub quizzes: Vec<QuizDefinition>,
    pub stocks: Vec<Stock>,
}

impl Catalog {
    /// Parse and check a catalog document
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    fn validate(&self) -> anyhow::Result<()> {
        let mut quiz_ids = HashSet::new();
        for quiz in &self.quizzes {
            if !quiz_ids.insert(quiz.id.as_str()) {
                anyhow::bail!("duplicate quiz id {}", quiz.id);
            }
            let mut question_ids = HashSet::new();
            for q in &quiz.questions {
                if !question_ids.insert(q.id) {
                    anyhow::bail!("duplicate question id {} in quiz {}", q.id, quiz.id);
                }
                if q.correct_option >= q.options.len() {
                    anyhow::bail!("question {} in quiz {} has no option {}", q.id, quiz.id, q.correct_option);
                }
            }
        }

        let mut stock_ids = HashSet::new();
        for stock in &self.stocks {
            if !stock_ids.insert(stock.id.as_str()) {
                anyhow::bail!("duplicate stock id {}", stock.id);
            }
            if !(stock.reference_price.is_finite() && stock.reference_price > 0.0) {
                anyhow::bail!("stock {} has an unusable reference price", stock.id);
            }
        }

        Ok(())
    }
}

pub fn catalog() -> &'static Catalog {
    &CATALOG
}

pub fn quizzes() -> &'static [QuizDefinition] {
    &CATALOG.quizzes
}

pub fn quiz(id: &str) -> Option<&'static QuizDefinition> {
    CATALOG.quizzes.iter().find(|q| q.id == id)
}

pub fn stocks() -> &'static [Stock] {
    &CATALOG.stocks
}

pub fn stock(id: &str) -> Option<&'static Stock> {
    CATALOG.stocks.iter().find(|s| s.id == id)
}
