use serde::Serialize;

use quiz_core::model::{Question, QuestionId};

/// Outcome of one question leaving the delivery queue. Never changes once logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnsweredRecord {
    /// Index into the session's question list.
    pub question_index: usize,
    pub question_id: QuestionId,
    /// `None` when the question was forfeited by a second skip.
    pub selected_option: Option<usize>,
    pub is_correct: bool,
}

impl AnsweredRecord {
    #[must_use]
    pub fn is_forfeit(&self) -> bool {
        self.selected_option.is_none()
    }
}

/// Display label for one question in the results breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    Correct,
    Incorrect,
    /// Skipped twice. Scores the same as `Incorrect`.
    Forfeited,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    pub question_index: usize,
    pub question_id: QuestionId,
    pub selected_option: Option<usize>,
    pub correct_option: usize,
    pub status: AnswerStatus,
}

/// Final results payload for a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResults {
    pub score: usize,
    pub total: usize,
    pub percentage: u32,
    /// One entry per question, in question-list order.
    pub breakdown: Vec<BreakdownEntry>,
}

impl SessionResults {
    /// Build results from the session's question list and answered log.
    ///
    /// Questions without a record (none, once a session has finished) are
    /// left out of the breakdown.
    #[must_use]
    pub fn aggregate(score: usize, questions: &[Question], records: &[AnsweredRecord]) -> Self {
        let total = questions.len();
        let mut ordered: Vec<&AnsweredRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.question_index);

        let breakdown = ordered
            .into_iter()
            .filter_map(|record| {
                let question = questions.get(record.question_index)?;
                let status = match (record.selected_option, record.is_correct) {
                    (None, _) => AnswerStatus::Forfeited,
                    (Some(_), true) => AnswerStatus::Correct,
                    (Some(_), false) => AnswerStatus::Incorrect,
                };
                Some(BreakdownEntry {
                    question_index: record.question_index,
                    question_id: record.question_id,
                    selected_option: record.selected_option,
                    correct_option: question.correct_answer(),
                    status,
                })
            })
            .collect();

        Self {
            score,
            total,
            percentage: percentage(score, total),
            breakdown,
        }
    }

    #[must_use]
    pub fn count(&self, status: AnswerStatus) -> usize {
        self.breakdown.iter().filter(|e| e.status == status).count()
    }
}

/// `round(100 * score / total)` with halves rounded up; 0 for an empty session.
#[must_use]
pub fn percentage(score: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let rounded = (200 * score + total) / (2 * total);
    u32::try_from(rounded).unwrap_or(u32::MAX)
}
