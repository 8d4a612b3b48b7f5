use quiz_core::model::Question;

use super::exit::ExitModalCopy;
use super::machine::{SessionPhase, TestSession};
use super::progress::SessionProgress;

/// Wording of the skip control.
///
/// This is intentionally **not** tied to what the next skip does: a lone
/// unmarked question still reads "Skip question" but is deferred first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipLabel {
    ComeBackLater,
    SkipQuestion,
}

impl SkipLabel {
    #[must_use]
    pub fn for_queue(queue_len: usize, head_marked: bool) -> Self {
        if queue_len > 1 && !head_marked {
            Self::ComeBackLater
        } else {
            Self::SkipQuestion
        }
    }

    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            Self::ComeBackLater => "Come back later",
            Self::SkipQuestion => "Skip question",
        }
    }
}

/// Presentation-agnostic snapshot of a session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView<'a> {
    pub phase: SessionPhase,
    /// Queue head; `None` once the queue is empty.
    pub question: Option<&'a Question>,
    /// 1-based position of the head among all questions, counting those
    /// already answered or forfeited.
    pub position: usize,
    pub total: usize,
    pub progress: SessionProgress,
    pub skip_label: SkipLabel,
    pub selected_option: Option<usize>,
    /// Present while the exit confirmation is up.
    pub exit_modal: Option<ExitModalCopy>,
    pub score: usize,
}

impl TestSession {
    #[must_use]
    pub fn view(&self) -> SessionView<'_> {
        let progress = self.progress();
        SessionView {
            phase: self.phase(),
            question: self.current_question(),
            position: (progress.answered + 1).min(progress.total),
            total: progress.total,
            progress,
            skip_label: SkipLabel::for_queue(self.queue_len(), self.head_is_skip_marked()),
            selected_option: self.selected_option(),
            exit_modal: self.pending_exit_method().map(ExitModalCopy::for_method),
            score: self.score(),
        }
    }
}
