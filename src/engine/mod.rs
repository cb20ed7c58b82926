//! The quiz-taking engine: session state machine, per-question countdown
//! and scoring. Host-independent; the bot layer in `runner` drives it.

pub mod score;
pub mod session;
pub mod timer;

pub use score::{result_bar, ResultClass};
pub use session::{Advance, AnswerRecord, Feedback, QuizSession, SessionState, Start};
pub use timer::{spawn_countdown, TimerEvent, TimerHandle, Urgency};
