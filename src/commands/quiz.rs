//! Quiz commands
//!
//! start -> (answer, next)* -> finish. Answering happens on the
//! [`QuizSession`] itself; these commands cover the parts that touch
//! persistent state.

use crate::events::{emit_data_changed, DataChangedPayload};
use crate::models::{Difficulty, QuizDefinition};
use crate::quiz::{select_daily, DailyKey, QuizOutcome, QuizSession};
use crate::rewards::{self, FlushReport, PointsSink};
use crate::state::AcademyState;
use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStatus {
    pub quiz_id: String,
    pub title: String,
    pub max_points: u32,
    pub completed_today: bool,
}

// ============================================================================
// Commands
// ============================================================================

/// Completion status of each quiz for `today`
pub fn get_quiz_statuses(
    state: &AcademyState,
    quizzes: &[QuizDefinition],
    today: NaiveDate,
) -> Result<Vec<QuizStatus>> {
    quizzes
        .iter()
        .map(|quiz| -> Result<QuizStatus> {
            let key = DailyKey::new(&quiz.id, today, state.user_id());
            Ok(QuizStatus {
                quiz_id: quiz.id.clone(),
                title: quiz.title.clone(),
                max_points: quiz.max_points,
                completed_today: rewards::is_completed(state.store(), &key)?,
            })
        })
        .collect()
}

/// Start today's attempt at `quiz`. Fails if it was already completed today
/// or there are no questions to ask.
pub fn start_daily_quiz<R: Rng>(
    state: &AcademyState,
    quiz: &QuizDefinition,
    today: NaiveDate,
    rng: &mut R,
) -> Result<QuizSession> {
    let key = DailyKey::new(&quiz.id, today, state.user_id());

    if rewards::is_completed(state.store(), &key)? {
        bail!("Quiz '{}' was already completed today", quiz.title);
    }

    let questions = select_daily(state.store(), &quiz.questions, &key, quiz.questions_per_day, rng)
        .with_context(|| format!("Failed to select questions for quiz {}", quiz.id))?;
    if questions.is_empty() {
        bail!("Quiz '{}' has no questions", quiz.title);
    }

    let total = questions.len();
    let session = QuizSession::start(
        &quiz.id,
        questions,
        total,
        quiz.max_points,
        Difficulty::default(),
        rng,
    );
    log::info!("Started quiz {} for {} with {} questions", quiz.id, state.user_id(), total);

    Ok(session)
}

/// Award a completed session: credit points, mark the day done, queue the
/// remote increment and persist.
pub fn finish_quiz(state: &mut AcademyState, session: &QuizSession, today: NaiveDate) -> Result<QuizOutcome> {
    let Some(outcome) = session.outcome() else {
        bail!("Quiz {} is not completed yet", session.quiz_id());
    };

    let key = DailyKey::new(session.quiz_id(), today, state.user_id());
    let awarded = {
        let (store, balance) = state.store_and_balance_mut();
        rewards::award_quiz(store, balance, &key, &outcome)?
    };
    if !awarded {
        bail!("Quiz {} was already completed today", session.quiz_id());
    }

    state.save().context("Failed to save balance after quiz")?;

    emit_data_changed(state.events(), DataChangedPayload::quiz_completed(session.quiz_id()));
    if outcome.points > 0 {
        emit_data_changed(state.events(), DataChangedPayload::balance("credited"));
    }

    Ok(outcome)
}

/// Push queued point increments to the remote points ledger
pub async fn sync_points<S: PointsSink>(state: &AcademyState, sink: &S) -> Result<FlushReport> {
    let report = rewards::flush_outbox(state.store(), sink, state.user_id())
        .await
        .context("Failed to read the points outbox")?;
    Ok(report)
}
