use std::sync::{Arc, Mutex, MutexGuard};

use crate::engine::{QuizSession, TimerHandle};
use crate::quiz::Quiz;

/// Dialogue state for one chat. A session in flight lives behind a
/// `SessionCtx` so the answer handlers and the countdown task share it.
#[derive(Debug, Clone, Default)]
pub enum QuizState {
    #[default]
    Start,
    Selection,
    ReadyToRun {
        quiz: Quiz,
    },
    Taking {
        ctx: SessionCtx,
    },
    Finished {
        ctx: SessionCtx,
    },
}

/// Shared per-chat session context: the engine instance, the quiz it was
/// built from, and the handle of the currently running countdown. Clones are
/// cheap and refer to the same session.
#[derive(Debug, Clone)]
pub struct SessionCtx {
    quiz: Arc<Quiz>,
    session: Arc<Mutex<QuizSession>>,
    timer: Arc<Mutex<Option<TimerHandle>>>,
}

impl SessionCtx {
    pub fn new(quiz: Quiz, session: QuizSession) -> Self {
        Self {
            quiz: Arc::new(quiz),
            session: Arc::new(Mutex::new(session)),
            timer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn session(&self) -> Arc<Mutex<QuizSession>> {
        Arc::clone(&self.session)
    }

    /// All transitions go through this one lock, which serializes user
    /// callbacks against timer ticks.
    pub fn lock_session(&self) -> MutexGuard<'_, QuizSession> {
        self.session.lock().expect("session mutex poisoned")
    }

    /// Installs the countdown for a fresh question, stopping any previous
    /// one first.
    pub fn set_timer(&self, handle: TimerHandle) {
        let mut slot = self.timer.lock().expect("timer mutex poisoned");
        if let Some(mut old) = slot.take() {
            old.stop();
        }
        *slot = Some(handle);
    }

    /// Cancels the running countdown, if any. Safe to call repeatedly.
    pub fn stop_timer(&self) {
        let mut slot = self.timer.lock().expect("timer mutex poisoned");
        if let Some(mut handle) = slot.take() {
            handle.stop();
        }
    }
}
