//! Daily question selection
//!
//! Every user gets a fixed subset of a quiz pool per calendar day. The first
//! access draws it (one question per difficulty tier when possible, the rest
//! at random) and stores it; later accesses on the same day get the stored
//! set back unchanged.

use crate::db::{Store, StoreError, StoreKey, StoreResult};
use crate::models::{Difficulty, QuizQuestion};
use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

/// Identifies one user's attempt window at one quiz
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DailyKey {
    pub quiz_id: String,
    pub day: NaiveDate,
    pub user_id: String,
}

impl DailyKey {
    pub fn new(quiz_id: &str, day: NaiveDate, user_id: &str) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            day,
            user_id: user_id.to_string(),
        }
    }

    pub fn selection_key(&self) -> StoreKey {
        StoreKey::DailySelection {
            quiz_id: self.quiz_id.clone(),
            day: self.day,
            user_id: self.user_id.clone(),
        }
    }

    pub fn completion_key(&self) -> StoreKey {
        StoreKey::DailyCompletion {
            quiz_id: self.quiz_id.clone(),
            day: self.day,
            user_id: self.user_id.clone(),
        }
    }
}

/// Return the day's questions for `key`, drawing and storing them on first access
pub fn select_daily<R: Rng>(
    store: &Store,
    pool: &[QuizQuestion],
    key: &DailyKey,
    count: usize,
    rng: &mut R,
) -> StoreResult<Vec<QuizQuestion>> {
    let selection_key = key.selection_key();

    match store.get::<Vec<QuizQuestion>>(&selection_key) {
        Ok(Some(cached)) if !cached.is_empty() => {
            log::debug!(
                "Using cached selection of {} questions for quiz {} on {}",
                cached.len(),
                key.quiz_id,
                key.day
            );
            return Ok(cached);
        }
        Ok(_) => {}
        Err(StoreError::Json(e)) => {
            log::warn!("Discarding unreadable selection for quiz {}: {}", key.quiz_id, e);
        }
        Err(e) => return Err(e),
    }

    let selection = pick_daily(pool, count, rng);
    if selection.is_empty() {
        log::warn!("Quiz {} has no questions to select from", key.quiz_id);
        return Ok(selection);
    }

    store.put(&selection_key, &selection)?;
    log::info!(
        "Selected {} questions for quiz {} on {}",
        selection.len(),
        key.quiz_id,
        key.day
    );

    // Selections of earlier days are never read again
    if let Err(e) = store.purge_before(selection_key.namespace(), &key.user_id, key.day) {
        log::warn!("Failed to purge old selections for {}: {}", key.user_id, e);
    }

    Ok(selection)
}

/// Draw up to `count` distinct questions from `pool`
pub fn pick_daily<R: Rng>(pool: &[QuizQuestion], count: usize, rng: &mut R) -> Vec<QuizQuestion> {
    let mut selected: Vec<QuizQuestion> = Vec::with_capacity(count.min(pool.len()));
    if count == 0 || pool.is_empty() {
        return selected;
    }

    let mut groups: Vec<Vec<&QuizQuestion>> = Difficulty::ALL
        .iter()
        .map(|d| pool.iter().filter(|q| q.difficulty == *d).collect())
        .collect();

    // One of each tier first so every difficulty shows up
    if count >= 3 {
        for group in groups.iter_mut() {
            if group.is_empty() {
                continue;
            }
            let idx = rng.gen_range(0..group.len());
            push_unique(&mut selected, group.remove(idx));
        }
    }

    let mut rest: Vec<&QuizQuestion> = groups.into_iter().flatten().collect();
    rest.shuffle(rng);
    for question in rest {
        if selected.len() >= count {
            break;
        }
        push_unique(&mut selected, question);
    }

    // Only reachable when the pool repeats ids
    if selected.len() < count {
        let mut all: Vec<&QuizQuestion> = pool.iter().collect();
        all.shuffle(rng);
        for question in all {
            if selected.len() >= count {
                break;
            }
            push_unique(&mut selected, question);
        }
    }

    selected
}

fn push_unique(selected: &mut Vec<QuizQuestion>, question: &QuizQuestion) -> bool {
    if selected.iter().any(|q| q.id == question.id) {
        return false;
    }
    selected.push(question.clone());
    true
}
