use std::sync::Arc;

use teloxide::{
    dispatching::dialogue::GetChatId,
    payloads::{EditMessageTextSetters, SendMessageSetters},
    prelude::Requester,
    types::{CallbackQuery, ChatId, Message, ReplyMarkup},
    Bot,
};
use tokio::sync::mpsc;
use tracing::instrument;

use crate::{
    config::QuizConfig,
    database::connection::{RecordAttempt, RetrieveQuiz},
    engine::{
        result_bar, spawn_countdown, Advance, AnswerRecord, Feedback, QuizSession, ResultClass,
        Start, TimerEvent, Urgency,
    },
    keyboard::{
        action_keyboard, next_keyboard, options_keyboard, quizzes_keyboard, retry_keyboard,
        yes_no_keyboard,
    },
    quiz::Quiz,
    state::{QuizState, SessionCtx},
    HandlerResult, UserDialogue,
};

#[instrument(level = "info", skip(bot, dialogue, connection))]
pub async fn choose_what_to_do<R: RetrieveQuiz>(
    bot: Bot,
    msg: Message,
    dialogue: UserDialogue,
    connection: Arc<R>,
) -> HandlerResult {
    match msg.text() {
        Some("Take a quiz📝") => {
            let quizzes = connection.retrieve_all_quiz_names().await?;
            if quizzes.is_empty() {
                bot.send_message(msg.chat.id, "No available quizzes.").await?;
            } else {
                tracing::info!(
                    "{} chooses to take a quiz",
                    msg.chat.username().unwrap_or_default()
                );
                bot.send_message(msg.chat.id, "Please, choose an available quiz:")
                    .reply_markup(quizzes_keyboard(&quizzes))
                    .await?;
                dialogue.update(QuizState::Selection).await?;
            }
        }
        other => {
            tracing::warn!(
                "invalid message {:?} from {}",
                other,
                msg.chat.username().unwrap_or_default()
            );
            bot.send_message(msg.chat.id, "Invalid input. Please try again.")
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, connection))]
pub async fn selection<R: RetrieveQuiz>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    connection: Arc<R>,
) -> HandlerResult {
    match msg.text() {
        Some(quiz_title) => match connection.retrieve_quiz(quiz_title).await? {
            Some(quiz) => {
                tracing::info!(
                    "{} selected '{}'",
                    msg.chat.username().unwrap_or_default(),
                    quiz.title()
                );

                bot.send_message(
                    msg.chat.id,
                    format!("{quiz}\nAre you ready to begin? (Yes/No)"),
                )
                .reply_markup(yes_no_keyboard())
                .parse_mode(teloxide::types::ParseMode::Html)
                .await?;
                dialogue.update(QuizState::ReadyToRun { quiz }).await?;
            }
            None => {
                bot.send_message(
                    msg.chat.id,
                    format!("Quiz with title '{quiz_title}' not found."),
                )
                .await?;
            }
        },
        None => {
            bot.send_message(msg.chat.id, "Failed to retrieve quiz: no input provided")
                .await?;
        }
    };
    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, connection, config, quiz))]
pub async fn running_ready<R: RecordAttempt + Send + Sync + 'static>(
    bot: Bot,
    dialogue: UserDialogue,
    msg: Message,
    quiz: Quiz,
    connection: Arc<R>,
    config: Arc<QuizConfig>,
) -> HandlerResult {
    match msg.text() {
        Some("Yes") | Some("Yes✔️") => {
            let username = msg.chat.username().unwrap_or_default().to_owned();
            let ctx = build_session(quiz, *config, connection, username);

            let outcome = ctx.lock_session().start()?;
            match outcome {
                Start::Finished { score, class } => {
                    // Empty quiz: finished before the first question.
                    bot.send_message(msg.chat.id, result_text(score, 0, class))
                        .reply_markup(ReplyMarkup::kb_remove())
                        .await?;
                    bot.send_message(msg.chat.id, "Play again?")
                        .reply_markup(retry_keyboard())
                        .await?;
                    dialogue.update(QuizState::Finished { ctx }).await?;
                }
                Start::FirstQuestion { .. } => {
                    bot.send_message(msg.chat.id, "Let's begin!")
                        .reply_markup(ReplyMarkup::kb_remove())
                        .await?;
                    dialogue
                        .update(QuizState::Taking { ctx: ctx.clone() })
                        .await?;
                    ask_question(bot, msg.chat.id, ctx).await?;
                }
            }
        }
        Some("No") | Some("No❌") => {
            tracing::info!(
                "{} quits quiz '{}'",
                msg.chat.username().unwrap_or_default(),
                quiz.title()
            );
            bot.send_message(msg.chat.id, "OK. Quitting quiz...").await?;
            dialogue.update(QuizState::Start).await?;
            bot.send_message(msg.chat.id, "What do you want to do now?")
                .reply_markup(action_keyboard())
                .await?;
        }
        _ => {
            bot.send_message(msg.chat.id, "Please, answer Yes or No.")
                .reply_markup(yes_no_keyboard())
                .await?;
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, ctx))]
pub async fn take_answer(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    ctx: SessionCtx,
) -> HandlerResult {
    let Some(data) = q.data.clone() else {
        return Ok(());
    };
    bot.answer_callback_query(&q.id).await?;
    let Some(chat_id) = q.chat_id() else {
        return Ok(());
    };

    if let Some(option) = data.strip_prefix("opt:") {
        let Ok(option) = option.parse::<usize>() else {
            return Ok(());
        };

        let outcome = ctx.lock_session().select_answer(option);
        match outcome {
            Ok(Some(feedback)) => {
                ctx.stop_timer();
                tracing::info!(
                    "{} answers option {} on quiz '{}': {:?}",
                    q.from.username.clone().unwrap_or_default(),
                    option,
                    ctx.quiz().title(),
                    feedback
                );
                reveal_answer(&bot, chat_id, &q, &ctx, feedback).await?;
            }
            // Lost the race against the timer (or tapped twice); the first
            // lock already owns this question.
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "rejected answer callback");
            }
        }
    } else if data == "next" {
        let outcome = ctx.lock_session().advance();
        match outcome {
            Ok(Advance::Next { .. }) => {
                ask_question(bot, chat_id, ctx).await?;
            }
            Ok(Advance::Finished { score, class }) => {
                let total = ctx.quiz().questions().len() as u32;
                tracing::info!(
                    "{} completed quiz '{}' with score {}/{}",
                    q.from.username.clone().unwrap_or_default(),
                    ctx.quiz().title(),
                    score,
                    total
                );
                bot.send_message(chat_id, result_text(score, total, class))
                    .reply_markup(retry_keyboard())
                    .await?;
                dialogue.update(QuizState::Finished { ctx }).await?;
            }
            // Double-tapped "Next" while the fresh question is unlocked.
            Err(e) => {
                tracing::debug!(error = %e, "ignoring stale advance");
            }
        }
    }

    Ok(())
}

#[instrument(level = "info", skip(bot, dialogue, ctx))]
pub async fn retry_quiz(
    bot: Bot,
    dialogue: UserDialogue,
    q: CallbackQuery,
    ctx: SessionCtx,
) -> HandlerResult {
    if q.data.as_deref() != Some("retry") {
        return Ok(());
    }
    bot.answer_callback_query(&q.id).await?;
    let Some(chat_id) = q.chat_id() else {
        return Ok(());
    };

    tracing::info!(
        "{} retries quiz '{}'",
        q.from.username.clone().unwrap_or_default(),
        ctx.quiz().title()
    );

    let outcome = {
        let mut session = ctx.lock_session();
        session.retry()?;
        session.start()?
    };
    match outcome {
        Start::Finished { score, class } => {
            bot.send_message(chat_id, result_text(score, 0, class))
                .reply_markup(retry_keyboard())
                .await?;
        }
        Start::FirstQuestion { .. } => {
            dialogue
                .update(QuizState::Taking { ctx: ctx.clone() })
                .await?;
            ask_question(bot, chat_id, ctx).await?;
        }
    }

    Ok(())
}

#[instrument(level = "info")]
pub async fn invalid_state(bot: Bot, msg: Message) -> HandlerResult {
    tracing::info!(
        "{}: invalid input '{:?}'",
        msg.chat.username().unwrap_or_default(),
        msg.text()
    );
    bot.send_message(
        msg.chat.id,
        "Unable to handle the message. Enter /help to see usages.",
    )
    .await?;
    Ok(())
}

/// Builds the engine instance for one run and wires its completion callback
/// to a persistence task: every completed attempt (including retries) is
/// handed over as a full answer record and written to storage off the
/// handler path.
fn build_session<R: RecordAttempt + Send + Sync + 'static>(
    quiz: Quiz,
    config: QuizConfig,
    connection: Arc<R>,
    username: String,
) -> SessionCtx {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<(u32, AnswerRecord)>();

    let session = QuizSession::new(quiz.questions().to_vec(), config).with_on_complete(
        move |score, answers| {
            let _ = done_tx.send((score, answers.clone()));
        },
    );
    let ctx = SessionCtx::new(quiz, session);

    let quiz_id = *ctx.quiz().uuid();
    tokio::spawn(async move {
        while let Some((score, answers)) = done_rx.recv().await {
            if let Err(e) = connection
                .record_attempt(quiz_id, username.clone(), score, answers)
                .await
            {
                tracing::error!(error = %e, "failed to record attempt");
            }
        }
    });

    ctx
}

/// Sends the current question with its options keyboard and starts the
/// countdown: a timer task decrements the session once per second, and a
/// display task mirrors the ticks into the message header until the
/// question locks or time runs out.
async fn ask_question(bot: Bot, chat_id: ChatId, ctx: SessionCtx) -> HandlerResult {
    let (index, remaining, urgency, options) = {
        let session = ctx.lock_session();
        let (index, question) = session
            .current_question()
            .ok_or("no current question to ask")?;
        let remaining = session.remaining_seconds().unwrap_or_default();
        let urgency = Urgency::for_remaining(remaining, &session.config().urgency);
        (index, remaining, urgency, question.options().to_vec())
    };

    tracing::info!("asking question #{} of '{}'", index + 1, ctx.quiz().title());

    let sent = bot
        .send_message(chat_id, question_text(ctx.quiz(), index, remaining, urgency))
        .reply_markup(options_keyboard(&options))
        .await?;
    let message_id = sent.id;

    let (tick_tx, mut tick_rx) = mpsc::unbounded_channel();
    ctx.set_timer(spawn_countdown(ctx.session(), tick_tx));

    let display_ctx = ctx.clone();
    tokio::spawn(async move {
        while let Some(event) = tick_rx.recv().await {
            match event {
                TimerEvent::Tick { remaining, urgency } => {
                    let text = question_text(display_ctx.quiz(), index, remaining, urgency);
                    if bot
                        .edit_message_text(chat_id, message_id, text)
                        .reply_markup(options_keyboard(&options))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                TimerEvent::Expired { feedback } => {
                    display_ctx.stop_timer();
                    let (text, is_last) = {
                        let session = display_ctx.lock_session();
                        (
                            reveal_text(display_ctx.quiz(), index, feedback, None),
                            index + 1 == session.questions().len(),
                        )
                    };
                    if let Err(e) = bot
                        .edit_message_text(chat_id, message_id, text)
                        .reply_markup(next_keyboard(is_last))
                        .await
                    {
                        tracing::warn!(error = %e, "failed to render timeout");
                    }
                    break;
                }
            }
        }
    });

    Ok(())
}

/// Replaces the question message with the locked view: answer marks on the
/// options and a Next/Submit button.
async fn reveal_answer(
    bot: &Bot,
    chat_id: ChatId,
    q: &CallbackQuery,
    ctx: &SessionCtx,
    feedback: Feedback,
) -> HandlerResult {
    let (index, selected, is_last) = {
        let session = ctx.lock_session();
        let (index, _) = session
            .current_question()
            .ok_or("no current question to reveal")?;
        (
            index,
            session.selected_option(),
            index + 1 == session.questions().len(),
        )
    };

    if let Some(message) = &q.message {
        bot.edit_message_text(
            chat_id,
            message.id(),
            reveal_text(ctx.quiz(), index, feedback, selected),
        )
        .reply_markup(next_keyboard(is_last))
        .await?;
    }

    Ok(())
}

fn question_text(quiz: &Quiz, index: usize, remaining: u32, urgency: Urgency) -> String {
    let question = &quiz.questions()[index];
    format!(
        "Question #{}/{}\n⏱ {}s {}\n\n{}",
        index + 1,
        quiz.questions().len(),
        remaining,
        urgency.marker(),
        question.prompt()
    )
}

fn reveal_text(quiz: &Quiz, index: usize, feedback: Feedback, selected: Option<usize>) -> String {
    let question = &quiz.questions()[index];

    let mut text = format!(
        "Question #{}/{}\n\n{}\n",
        index + 1,
        quiz.questions().len(),
        question.prompt()
    );
    for (i, option) in question.options().iter().enumerate() {
        let mark = if i == question.correct_option() {
            "✅"
        } else if selected == Some(i) {
            "❌"
        } else {
            "▫️"
        };
        text.push_str(&format!("{mark} {option}\n"));
    }

    let footer = match feedback {
        Feedback::Correct => "Correct!✅",
        Feedback::Incorrect => "Incorrect.❌",
        Feedback::Timeout => "⏰ Time's up!",
    };
    text.push('\n');
    text.push_str(footer);
    text
}

fn result_text(score: u32, total: u32, class: ResultClass) -> String {
    format!(
        "🏁 Quiz complete!\n{} {score}/{total}\n\nYou scored {score} out of {total}! {}",
        result_bar(score, total, 10),
        class.message()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Question;

    fn quiz() -> Quiz {
        Quiz::new(
            "Capitals".into(),
            "Geography warm-up".into(),
            "tester".into(),
            vec![Question::new(
                "Capital of France?".into(),
                vec!["Lyon".into(), "Paris".into()],
                1,
            )
            .unwrap()],
        )
    }

    #[test]
    fn question_text_shows_progress_and_countdown() {
        let text = question_text(&quiz(), 0, 12, Urgency::Warning);
        assert!(text.starts_with("Question #1/1"));
        assert!(text.contains("12s"));
        assert!(text.contains("🟡"));
        assert!(text.contains("Capital of France?"));
    }

    #[test]
    fn reveal_marks_correct_and_wrong_picks() {
        let text = reveal_text(&quiz(), 0, Feedback::Incorrect, Some(0));
        assert!(text.contains("❌ Lyon"));
        assert!(text.contains("✅ Paris"));
        assert!(text.contains("Incorrect.❌"));

        let text = reveal_text(&quiz(), 0, Feedback::Timeout, None);
        assert!(text.contains("✅ Paris"));
        assert!(text.contains("▫️ Lyon"));
        assert!(text.contains("Time's up!"));
    }

    #[test]
    fn result_text_carries_the_classification_message() {
        let text = result_text(2, 3, ResultClass::KeepPracticing);
        assert!(text.contains("2/3"));
        assert!(text.contains("You scored 2 out of 3!"));
        assert!(text.contains("Keep practicing!"));
    }
}
