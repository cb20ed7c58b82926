use std::fmt;

use crate::config::QuizConfig;
use crate::error::EngineError;
use crate::quiz::Question;

use super::score::{self, ResultClass};

/// Per-session record of locked answers: one entry per question, appended in
/// question order, `None` for a question that timed out. Entries are never
/// rewritten once locked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerRecord {
    entries: Vec<Option<usize>>,
}

impl AnswerRecord {
    pub fn selected(&self, index: usize) -> Option<usize> {
        self.entries.get(index).copied().flatten()
    }

    pub fn is_locked(&self, index: usize) -> bool {
        index < self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Option<usize>)> + '_ {
        self.entries.iter().copied().enumerate()
    }

    pub(crate) fn lock(&mut self, index: usize, selected: Option<usize>) {
        debug_assert_eq!(index, self.entries.len(), "answers lock in question order");
        self.entries.push(selected);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Classification of a just-locked answer, consumed by the presentation
/// layer (visual mark, audio cue). The engine only classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feedback {
    Correct,
    Incorrect,
    Timeout,
}

impl Feedback {
    pub fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    InProgress {
        current: usize,
        remaining: u32,
        locked: bool,
        selected: Option<usize>,
    },
    Finished {
        score: u32,
        class: ResultClass,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not-started",
            Self::InProgress { .. } => "in-progress",
            Self::Finished { .. } => "finished",
        }
    }
}

/// Outcome of `start()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    FirstQuestion { remaining: u32 },
    /// Empty question set: the session finishes immediately with score 0.
    Finished { score: u32, class: ResultClass },
}

/// Outcome of `advance()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next { index: usize, remaining: u32 },
    Finished { score: u32, class: ResultClass },
}

type CompletionFn = Box<dyn FnMut(u32, &AnswerRecord) + Send>;

/// One quiz-taking session: owns its question set, its state and its answer
/// record. Every transition is a synchronous method returning `Result`, so a
/// host that serializes calls (one event queue, or a mutex around the
/// session) gets race-free semantics; the loser of an answer/timeout race is
/// rejected by the lock guard, never recorded.
pub struct QuizSession {
    questions: Vec<Question>,
    config: QuizConfig,
    state: SessionState,
    answers: AnswerRecord,
    on_complete: Option<CompletionFn>,
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("questions", &self.questions.len())
            .field("state", &self.state)
            .field("answers", &self.answers)
            .finish()
    }
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, config: QuizConfig) -> Self {
        Self {
            questions,
            config,
            state: SessionState::NotStarted,
            answers: AnswerRecord::default(),
            on_complete: None,
        }
    }

    /// Registers the host completion callback, invoked exactly once per
    /// completed run with the final score and the full answer record.
    pub fn with_on_complete(
        mut self,
        on_complete: impl FnMut(u32, &AnswerRecord) + Send + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &QuizConfig {
        &self.config
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn current_question(&self) -> Option<(usize, &Question)> {
        match &self.state {
            SessionState::InProgress { current, .. } => {
                Some((*current, &self.questions[*current]))
            }
            _ => None,
        }
    }

    pub fn remaining_seconds(&self) -> Option<u32> {
        match &self.state {
            SessionState::InProgress { remaining, .. } => Some(*remaining),
            _ => None,
        }
    }

    /// The option chosen for the current question, once locked.
    pub fn selected_option(&self) -> Option<usize> {
        match &self.state {
            SessionState::InProgress { selected, .. } => *selected,
            _ => None,
        }
    }

    /// True while the timer should keep running: in progress and unlocked.
    pub fn awaiting_answer(&self) -> bool {
        matches!(
            self.state,
            SessionState::InProgress { locked: false, .. }
        )
    }

    /// Begins the run. Only valid from `NotStarted` (a finished session must
    /// go through `retry()` first). An empty question set finishes on the
    /// spot with score 0 and still fires the completion callback.
    pub fn start(&mut self) -> Result<Start, EngineError> {
        if !matches!(self.state, SessionState::NotStarted) {
            return Err(EngineError::invalid_op("start", self.state.name()));
        }

        self.answers.clear();
        if self.questions.is_empty() {
            let (score, class) = self.finish();
            return Ok(Start::Finished { score, class });
        }

        self.state = SessionState::InProgress {
            current: 0,
            remaining: self.config.countdown_seconds,
            locked: false,
            selected: None,
        };
        Ok(Start::FirstQuestion {
            remaining: self.config.countdown_seconds,
        })
    }

    /// Locks the current question on a user choice. Returns `Ok(None)` when
    /// the question is already locked (repeated tap, or the user lost the
    /// race against the timer): the recorded answer is never overwritten.
    pub fn select_answer(&mut self, option: usize) -> Result<Option<Feedback>, EngineError> {
        let (current, locked) = self.in_progress("select_answer")?;
        if locked {
            return Ok(None);
        }

        let question = &self.questions[current];
        if option >= question.options().len() {
            return Err(EngineError::InvalidOption {
                index: option,
                arity: question.options().len(),
            });
        }

        let feedback = if option == question.correct_option() {
            Feedback::Correct
        } else {
            Feedback::Incorrect
        };
        self.lock_current(current, Some(option));
        Ok(Some(feedback))
    }

    /// Locks the current question without a choice when the countdown runs
    /// out. Mirrors `select_answer`, including the `Ok(None)` no-op when the
    /// timer loses the race against a user answer.
    pub fn expire_timer(&mut self) -> Result<Option<Feedback>, EngineError> {
        let (current, locked) = self.in_progress("expire_timer")?;
        if locked {
            return Ok(None);
        }

        self.lock_current(current, None);
        Ok(Some(Feedback::Timeout))
    }

    /// One countdown decrement. `Ok(None)` when the question is locked (the
    /// timer observed a stale tick); otherwise the new remaining value,
    /// which never goes below zero.
    pub fn tick(&mut self) -> Result<Option<u32>, EngineError> {
        match &mut self.state {
            SessionState::InProgress {
                locked, remaining, ..
            } => {
                if *locked {
                    return Ok(None);
                }
                *remaining = remaining.saturating_sub(1);
                Ok(Some(*remaining))
            }
            other => Err(EngineError::invalid_op("tick", other.name())),
        }
    }

    /// Moves past a locked question: either on to the next one with a fresh
    /// countdown, or into `Finished` with the final score.
    pub fn advance(&mut self) -> Result<Advance, EngineError> {
        let (current, locked) = self.in_progress("advance")?;
        if !locked {
            return Err(EngineError::invalid_op("advance", "in-progress/unlocked"));
        }

        if current + 1 == self.questions.len() {
            let (score, class) = self.finish();
            return Ok(Advance::Finished { score, class });
        }

        self.state = SessionState::InProgress {
            current: current + 1,
            remaining: self.config.countdown_seconds,
            locked: false,
            selected: None,
        };
        Ok(Advance::Next {
            index: current + 1,
            remaining: self.config.countdown_seconds,
        })
    }

    /// Discards a finished run so the session can be started again.
    pub fn retry(&mut self) -> Result<(), EngineError> {
        if !matches!(self.state, SessionState::Finished { .. }) {
            return Err(EngineError::invalid_op("retry", self.state.name()));
        }
        self.state = SessionState::NotStarted;
        self.answers.clear();
        Ok(())
    }

    fn in_progress(&self, operation: &'static str) -> Result<(usize, bool), EngineError> {
        match &self.state {
            SessionState::InProgress {
                current, locked, ..
            } => Ok((*current, *locked)),
            other => Err(EngineError::invalid_op(operation, other.name())),
        }
    }

    fn lock_current(&mut self, current: usize, selected: Option<usize>) {
        if let SessionState::InProgress {
            locked,
            selected: state_selected,
            ..
        } = &mut self.state
        {
            *locked = true;
            *state_selected = selected;
        }
        self.answers.lock(current, selected);
    }

    fn finish(&mut self) -> (u32, ResultClass) {
        let score = score::score(&self.questions, &self.answers);
        let class = ResultClass::classify(score, self.questions.len() as u32, &self.config.result);
        self.state = SessionState::Finished { score, class };
        if let Some(on_complete) = self.on_complete.as_mut() {
            on_complete(score, &self.answers);
        }
        (score, class)
    }
}
