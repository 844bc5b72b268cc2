//! Adaptive quiz engine
//!
//! - `selector`: picks the day's question set for a user and caches it
//! - `session`: serves questions one at a time and adapts difficulty
//!
//! Scoring lives here because both the session and the reward flow use it.

pub mod selector;
pub mod session;

pub use selector::{pick_daily, select_daily, DailyKey};
pub use session::{AnswerRecord, QuizSession, SessionState};

use crate::models::Difficulty;
use serde::{Deserialize, Serialize};

/// Target difficulty for the next question after answering at `current`
pub fn next_difficulty(current: Difficulty, correct: bool) -> Difficulty {
    match (current, correct) {
        (Difficulty::Easy, true) => Difficulty::Medium,
        (Difficulty::Easy, false) => Difficulty::Easy,
        (Difficulty::Medium, true) => Difficulty::Difficult,
        (Difficulty::Medium, false) => Difficulty::Easy,
        (Difficulty::Difficult, true) => Difficulty::Difficult,
        (Difficulty::Difficult, false) => Difficulty::Medium,
    }
}

/// Tiers searched, in order, when looking for a question of `target`
pub fn search_order(target: Difficulty) -> [Difficulty; 3] {
    match target {
        Difficulty::Easy => [Difficulty::Easy, Difficulty::Medium, Difficulty::Difficult],
        Difficulty::Medium => [Difficulty::Medium, Difficulty::Easy, Difficulty::Difficult],
        Difficulty::Difficult => [Difficulty::Difficult, Difficulty::Medium, Difficulty::Easy],
    }
}

/// Final result of one quiz attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub quiz_id: String,
    pub correct: u32,
    pub total_asked: u32,
    pub percentage: u32,
    pub points: u32,
}

impl QuizOutcome {
    pub fn new(quiz_id: &str, correct: u32, total_asked: u32, max_points: u32) -> Self {
        Self {
            quiz_id: quiz_id.to_string(),
            correct,
            total_asked,
            percentage: percentage(correct, total_asked),
            points: points_for(correct, total_asked, max_points),
        }
    }
}

/// round(correct / total * max_points), 0 when nothing was asked
pub fn points_for(correct: u32, total_asked: u32, max_points: u32) -> u32 {
    if total_asked == 0 {
        return 0;
    }
    ((correct as f64 / total_asked as f64) * max_points as f64).round() as u32
}

pub fn percentage(correct: u32, total_asked: u32) -> u32 {
    points_for(correct, total_asked, 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        let expected = [
            (Difficulty::Easy, true, Difficulty::Medium),
            (Difficulty::Easy, false, Difficulty::Easy),
            (Difficulty::Medium, true, Difficulty::Difficult),
            (Difficulty::Medium, false, Difficulty::Easy),
            (Difficulty::Difficult, true, Difficulty::Difficult),
            (Difficulty::Difficult, false, Difficulty::Medium),
        ];

        for (from, correct, to) in expected {
            assert_eq!(next_difficulty(from, correct), to, "{:?} / {}", from, correct);
        }
    }

    #[test]
    fn test_search_order_starts_with_target() {
        for d in Difficulty::ALL {
            let order = search_order(d);
            assert_eq!(order[0], d);
            assert!(Difficulty::ALL.iter().all(|x| order.contains(x)));
        }
    }

    #[test]
    fn test_outcome_three_of_five() {
        let outcome = QuizOutcome::new("basics", 3, 5, 50);
        assert_eq!(outcome.percentage, 60);
        assert_eq!(outcome.points, 30);

        // round(0.6 * 25) = 15, round(2/3 * 10) = 7
        assert_eq!(points_for(3, 5, 25), 15);
        assert_eq!(points_for(2, 3, 10), 7);
    }

    #[test]
    fn test_outcome_nothing_asked() {
        let outcome = QuizOutcome::new("basics", 0, 0, 50);
        assert_eq!(outcome.points, 0);
        assert_eq!(outcome.percentage, 0);
    }
}
