use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::config::UrgencyThresholds;

use super::session::{Feedback, QuizSession};

/// Display band for the remaining time, derived purely from the countdown
/// value. Independent of scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Calm,
    Warning,
    Critical,
}

impl Urgency {
    pub fn for_remaining(remaining: u32, thresholds: &UrgencyThresholds) -> Self {
        if remaining <= thresholds.critical_at {
            Self::Critical
        } else if remaining <= thresholds.warning_at {
            Self::Warning
        } else {
            Self::Calm
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Self::Calm => "🟢",
            Self::Warning => "🟡",
            Self::Critical => "🔴",
        }
    }
}

/// What the countdown task reports to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { remaining: u32, urgency: Urgency },
    Expired { feedback: Feedback },
}

/// Handle to a running countdown task. `stop()` is idempotent, and dropping
/// the handle cancels the task, so a disposed session can never be expired
/// by a stray timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: Option<JoinHandle<()>>,
}

impl TimerHandle {
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_stopped(&self) -> bool {
        match &self.task {
            Some(task) => task.is_finished(),
            None => true,
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawns the per-question countdown: one decrement per second while the
/// session is in progress and unlocked. At zero it locks the question via
/// `expire_timer` (once, the lock guard makes a second firing impossible)
/// and reports `Expired`; once the question locks for any reason the task
/// exits on its own.
pub fn spawn_countdown(
    session: Arc<Mutex<QuizSession>>,
    events: UnboundedSender<TimerEvent>,
) -> TimerHandle {
    let task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;

            let event = {
                let Ok(mut session) = session.lock() else {
                    break;
                };
                if !session.awaiting_answer() {
                    break;
                }
                match session.tick() {
                    Ok(Some(remaining)) if remaining > 0 => {
                        let urgency =
                            Urgency::for_remaining(remaining, &session.config().urgency);
                        TimerEvent::Tick { remaining, urgency }
                    }
                    Ok(Some(_)) => match session.expire_timer() {
                        Ok(Some(feedback)) => TimerEvent::Expired { feedback },
                        _ => break,
                    },
                    // Locked between the guard and the tick, or torn down.
                    _ => break,
                }
            };

            let expired = matches!(event, TimerEvent::Expired { .. });
            if events.send(event).is_err() || expired {
                break;
            }
        }
    });

    TimerHandle { task: Some(task) }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::config::QuizConfig;
    use crate::quiz::Question;

    fn session_with_countdown(secs: u32) -> Arc<Mutex<QuizSession>> {
        let questions = vec![Question::new(
            "q".into(),
            vec!["a".into(), "b".into()],
            0,
        )
        .unwrap()];
        let config = QuizConfig {
            countdown_seconds: secs,
            ..QuizConfig::default()
        };
        let mut session = QuizSession::new(questions, config);
        session.start().unwrap();
        Arc::new(Mutex::new(session))
    }

    #[test]
    fn urgency_bands_follow_the_thresholds() {
        let t = UrgencyThresholds::default();
        assert_eq!(Urgency::for_remaining(30, &t), Urgency::Calm);
        assert_eq!(Urgency::for_remaining(16, &t), Urgency::Calm);
        assert_eq!(Urgency::for_remaining(15, &t), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(6, &t), Urgency::Warning);
        assert_eq!(Urgency::for_remaining(5, &t), Urgency::Critical);
        assert_eq!(Urgency::for_remaining(0, &t), Urgency::Critical);
    }

    #[tokio::test(start_paused = true)]
    async fn counts_down_and_expires_exactly_once() {
        let session = session_with_countdown(3);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_countdown(Arc::clone(&session), tx);

        assert_eq!(
            rx.recv().await,
            Some(TimerEvent::Tick {
                remaining: 2,
                urgency: Urgency::Critical
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(TimerEvent::Tick {
                remaining: 1,
                urgency: Urgency::Critical
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(TimerEvent::Expired {
                feedback: Feedback::Timeout
            })
        );
        // Task exits after expiry; the channel closes.
        assert_eq!(rx.recv().await, None);

        let session = session.lock().unwrap();
        assert!(session.answers().is_locked(0));
        assert_eq!(session.answers().selected(0), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_silently_once_the_question_locks() {
        let session = session_with_countdown(30);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = spawn_countdown(Arc::clone(&session), tx);

        assert!(matches!(rx.recv().await, Some(TimerEvent::Tick { .. })));

        session.lock().unwrap().select_answer(1).unwrap();

        // No tick and no expiry after the lock: the task just exits.
        assert_eq!(rx.recv().await, None);
        assert_eq!(session.lock().unwrap().answers().selected(0), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_cancels_the_task() {
        let session = session_with_countdown(30);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handle = spawn_countdown(Arc::clone(&session), tx);

        assert!(matches!(rx.recv().await, Some(TimerEvent::Tick { .. })));

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());

        // Cancelled task never expires the session.
        assert_eq!(rx.recv().await, None);
        assert!(session.lock().unwrap().awaiting_answer());
    }
}
