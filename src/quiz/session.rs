//! Adaptive quiz session
//!
//! State machine: `AwaitingAnswer` -> `Answered` -> (`AwaitingAnswer` | `Completed`).
//! The difficulty of the next question follows the previous answer (see
//! [`next_difficulty`]). Calls made in the wrong state are ignored.

use super::{next_difficulty, search_order, QuizOutcome};
use crate::models::{Difficulty, QuizQuestion};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SessionState {
    AwaitingAnswer,
    #[serde(rename_all = "camelCase")]
    Answered { is_correct: bool },
    #[serde(rename_all = "camelCase")]
    Completed { final_score: u32 },
}

/// One answered question, kept for the review screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question_id: u32,
    pub difficulty: Difficulty,
    pub selected_option: usize,
    pub correct_option: usize,
    pub is_correct: bool,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz_id: String,
    max_points: u32,
    pool: Vec<QuizQuestion>,
    total_to_ask: usize,
    asked_ids: Vec<u32>,
    current: Option<QuizQuestion>,
    current_difficulty: Difficulty,
    selected: Option<usize>,
    score: u32,
    state: SessionState,
    answers: Vec<AnswerRecord>,
}

impl QuizSession {
    /// Start a session over `pool` asking at most `total_to_ask` questions.
    /// An empty pool yields a session that is already completed.
    pub fn start<R: Rng>(
        quiz_id: &str,
        pool: Vec<QuizQuestion>,
        total_to_ask: usize,
        max_points: u32,
        initial: Difficulty,
        rng: &mut R,
    ) -> Self {
        let total_to_ask = total_to_ask.min(pool.len());
        let first = if total_to_ask > 0 {
            pick_next(&pool, &[], None, initial, rng)
        } else {
            None
        };

        let (state, current_difficulty) = match &first {
            Some(q) => (SessionState::AwaitingAnswer, q.difficulty),
            None => (SessionState::Completed { final_score: 0 }, initial),
        };

        log::debug!(
            "Quiz {} started: {} of {} questions, first at {}",
            quiz_id,
            total_to_ask,
            pool.len(),
            current_difficulty.as_str()
        );

        Self {
            quiz_id: quiz_id.to_string(),
            max_points,
            pool,
            total_to_ask,
            asked_ids: Vec::new(),
            current: first,
            current_difficulty,
            selected: None,
            score: 0,
            state,
            answers: Vec::new(),
        }
    }

    /// Record the chosen option. Returns false if the choice was ignored.
    pub fn select_option(&mut self, index: usize) -> bool {
        if self.state != SessionState::AwaitingAnswer {
            return false;
        }
        match &self.current {
            Some(q) if index < q.options.len() => {
                self.selected = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Grade the selected option. `None` if there is nothing to grade.
    pub fn check_answer(&mut self) -> Option<bool> {
        if self.state != SessionState::AwaitingAnswer {
            return None;
        }
        let question = self.current.as_ref()?;
        let selected = self.selected?;

        let is_correct = selected == question.correct_option;
        self.answers.push(AnswerRecord {
            question_id: question.id,
            difficulty: question.difficulty,
            selected_option: selected,
            correct_option: question.correct_option,
            is_correct,
        });
        self.state = SessionState::Answered { is_correct };

        Some(is_correct)
    }

    /// Move past an answered question: serve the next one or complete
    pub fn next_question<R: Rng>(&mut self, rng: &mut R) -> SessionState {
        let is_correct = match self.state {
            SessionState::Answered { is_correct } => is_correct,
            other => return other,
        };
        let Some(answered) = self.current.take() else {
            return self.state;
        };

        if is_correct {
            self.score += 1;
        }
        self.asked_ids.push(answered.id);
        self.selected = None;

        let target = next_difficulty(self.current_difficulty, is_correct);
        let next = if self.asked_ids.len() >= self.total_to_ask {
            None
        } else {
            pick_next(&self.pool, &self.asked_ids, Some(answered.id), target, rng)
        };

        match next {
            Some(question) => {
                log::debug!(
                    "Quiz {}: {} -> {} (wanted {})",
                    self.quiz_id,
                    self.current_difficulty.as_str(),
                    question.difficulty.as_str(),
                    target.as_str()
                );
                self.current_difficulty = question.difficulty;
                self.current = Some(question);
                self.state = SessionState::AwaitingAnswer;
            }
            None => {
                log::info!(
                    "Quiz {} completed with {}/{}",
                    self.quiz_id,
                    self.score,
                    self.asked_ids.len()
                );
                self.state = SessionState::Completed {
                    final_score: self.score,
                };
            }
        }

        self.state
    }

    pub fn quiz_id(&self) -> &str {
        &self.quiz_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_completed(&self) -> bool {
        matches!(self.state, SessionState::Completed { .. })
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.current.as_ref()
    }

    pub fn current_difficulty(&self) -> Difficulty {
        self.current_difficulty
    }

    pub fn selected_option(&self) -> Option<usize> {
        self.selected
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn asked_ids(&self) -> &[u32] {
        &self.asked_ids
    }

    pub fn total_to_ask(&self) -> usize {
        self.total_to_ask
    }

    /// 1-based number of the question on screen
    pub fn question_number(&self) -> usize {
        self.asked_ids.len() + 1
    }

    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Score and points, available once the session is completed
    pub fn outcome(&self) -> Option<QuizOutcome> {
        match self.state {
            SessionState::Completed { final_score } => Some(QuizOutcome::new(
                &self.quiz_id,
                final_score,
                self.asked_ids.len() as u32,
                self.max_points,
            )),
            _ => None,
        }
    }
}

/// Random question from the first non-empty tier in the search order of `target`
fn pick_next<R: Rng>(
    pool: &[QuizQuestion],
    asked: &[u32],
    exclude: Option<u32>,
    target: Difficulty,
    rng: &mut R,
) -> Option<QuizQuestion> {
    for tier in search_order(target) {
        let candidates: Vec<&QuizQuestion> = pool
            .iter()
            .filter(|q| q.difficulty == tier)
            .filter(|q| !asked.contains(&q.id) && Some(q.id) != exclude)
            .collect();

        if let Some(question) = candidates.choose(rng) {
            return Some((*question).clone());
        }
    }
    None
}
