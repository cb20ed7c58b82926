//! End-to-end engine scenarios: full runs through the session state machine
//! with and without the live countdown task.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use quiz_runner::config::{QuizConfig, ResultThresholds};
use quiz_runner::engine::{
    spawn_countdown, Advance, Feedback, QuizSession, ResultClass, SessionState, Start, TimerEvent,
};
use quiz_runner::quiz::Question;

fn questions(correct: &[usize]) -> Vec<Question> {
    correct
        .iter()
        .map(|&c| {
            Question::new(
                format!("question with answer {c}"),
                vec!["a".into(), "b".into(), "c".into(), "d".into()],
                c,
            )
            .unwrap()
        })
        .collect()
}

#[test]
fn three_question_run_lands_just_below_the_good_threshold() {
    // Q1 answered correctly, Q2 timed out, Q3 answered correctly: 2/3 is
    // below the default 0.7 cut, so the closing message is the strict one.
    let mut session = QuizSession::new(questions(&[1, 2, 0]), QuizConfig::default());

    assert!(matches!(
        session.start().unwrap(),
        Start::FirstQuestion { remaining: 30 }
    ));

    assert_eq!(session.select_answer(1).unwrap(), Some(Feedback::Correct));
    assert!(matches!(
        session.advance().unwrap(),
        Advance::Next { index: 1, .. }
    ));

    assert_eq!(session.expire_timer().unwrap(), Some(Feedback::Timeout));
    assert!(matches!(
        session.advance().unwrap(),
        Advance::Next { index: 2, .. }
    ));

    assert_eq!(session.select_answer(0).unwrap(), Some(Feedback::Correct));
    assert_eq!(
        session.advance().unwrap(),
        Advance::Finished {
            score: 2,
            class: ResultClass::KeepPracticing
        }
    );

    let answers = session.answers();
    assert_eq!(answers.len(), 3);
    assert_eq!(answers.selected(0), Some(1));
    assert_eq!(answers.selected(1), None);
    assert!(answers.is_locked(1));
    assert_eq!(answers.selected(2), Some(0));
}

#[test]
fn the_same_run_is_good_under_a_lenient_threshold() {
    let config = QuizConfig {
        result: ResultThresholds {
            perfect: 1.0,
            good: 0.6,
        },
        ..QuizConfig::default()
    };
    let mut session = QuizSession::new(questions(&[1, 2, 0]), config);

    session.start().unwrap();
    session.select_answer(1).unwrap();
    session.advance().unwrap();
    session.expire_timer().unwrap();
    session.advance().unwrap();
    session.select_answer(0).unwrap();

    assert_eq!(
        session.advance().unwrap(),
        Advance::Finished {
            score: 2,
            class: ResultClass::Good
        }
    );
}

#[test]
fn empty_quiz_finishes_on_start_with_an_empty_record() {
    let completions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&completions);

    let mut session = QuizSession::new(vec![], QuizConfig::default()).with_on_complete(
        move |score, answers| {
            sink.lock().unwrap().push((score, answers.len()));
        },
    );

    assert!(matches!(
        session.start().unwrap(),
        Start::Finished { score: 0, .. }
    ));
    assert!(matches!(
        session.state(),
        SessionState::Finished { score: 0, .. }
    ));
    assert_eq!(completions.lock().unwrap().as_slice(), &[(0, 0)]);
}

#[test]
fn first_lock_wins_the_answer_timeout_race() {
    let mut session = QuizSession::new(questions(&[0]), QuizConfig::default());
    session.start().unwrap();

    // Both events dispatched in the same tick: the first one locks, the
    // second is a silent no-op and the record keeps the first outcome.
    assert_eq!(session.select_answer(1).unwrap(), Some(Feedback::Incorrect));
    assert_eq!(session.expire_timer().unwrap(), None);
    assert_eq!(session.answers().selected(0), Some(1));

    session.advance().unwrap();
    assert!(matches!(
        session.state(),
        SessionState::Finished { score: 0, .. }
    ));
}

#[test]
fn retry_then_start_gives_a_clean_slate() {
    let mut session = QuizSession::new(questions(&[0, 1]), QuizConfig::default());
    session.start().unwrap();
    session.select_answer(0).unwrap();
    session.advance().unwrap();
    session.expire_timer().unwrap();
    session.advance().unwrap();

    session.retry().unwrap();
    assert!(matches!(session.state(), SessionState::NotStarted));

    session.start().unwrap();
    assert_eq!(session.current_question().unwrap().0, 0);
    assert!(session.answers().is_empty());
    assert_eq!(session.remaining_seconds(), Some(30));
}

#[tokio::test(start_paused = true)]
async fn countdown_times_a_question_out_and_the_run_still_completes() {
    let config = QuizConfig {
        countdown_seconds: 2,
        ..QuizConfig::default()
    };
    let mut session = QuizSession::new(questions(&[3]), config);
    session.start().unwrap();
    let session = Arc::new(Mutex::new(session));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = spawn_countdown(Arc::clone(&session), tx);

    assert!(matches!(
        rx.recv().await,
        Some(TimerEvent::Tick { remaining: 1, .. })
    ));
    assert_eq!(
        rx.recv().await,
        Some(TimerEvent::Expired {
            feedback: Feedback::Timeout
        })
    );
    assert_eq!(rx.recv().await, None);

    let mut session = session.lock().unwrap();
    assert_eq!(
        session.advance().unwrap(),
        Advance::Finished {
            score: 0,
            class: ResultClass::KeepPracticing
        }
    );
    assert_eq!(session.answers().selected(0), None);
    assert!(session.answers().is_locked(0));
}

#[tokio::test(start_paused = true)]
async fn user_answer_beats_the_countdown() {
    let mut session = QuizSession::new(questions(&[2]), QuizConfig::default());
    session.start().unwrap();
    let session = Arc::new(Mutex::new(session));

    let (tx, mut rx) = mpsc::unbounded_channel();
    let _handle = spawn_countdown(Arc::clone(&session), tx);

    assert!(matches!(rx.recv().await, Some(TimerEvent::Tick { .. })));

    assert_eq!(
        session.lock().unwrap().select_answer(2).unwrap(),
        Some(Feedback::Correct)
    );

    // The countdown notices the lock and exits without expiring anything.
    assert_eq!(rx.recv().await, None);
    assert_eq!(session.lock().unwrap().answers().selected(0), Some(2));
}
