use std::borrow::Cow;
use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use teloxide::dispatching::dialogue::{self, InMemStorage};
use teloxide::dispatching::UpdateHandler;
use teloxide::error_handlers::IgnoringErrorHandlerSafe;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks::{self, Options};
use tracing::level_filters;
use tracing_subscriber::fmt::format::FmtSpan;
use url::Url;

use quiz_runner::commands::{cancel, help, start, Command};
use quiz_runner::config::QuizConfig;
use quiz_runner::database::connection::Connection;
use quiz_runner::runner;
use quiz_runner::state::QuizState;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let rust_log = std::env::var("LOG_LEVEL").unwrap_or("info".into());
    tracing_subscriber::fmt()
        .with_max_level(level_filters::LevelFilter::from_level(
            rust_log.parse().unwrap_or(tracing::Level::INFO),
        ))
        .json()
        .with_span_events(FmtSpan::ENTER)
        .log_internal_errors(true)
        .with_ansi(true)
        .with_line_number(true)
        .with_target(false)
        .init();

    let connection_string = std::env::var("DATABASE_URL").expect("DATABASE_URL should be set.");
    let connection = Arc::new(
        Connection::connect(Cow::Owned(connection_string))
            .await
            .expect("Failed to connect to database"),
    );
    connection
        .ensure_schema()
        .await
        .expect("Schema bootstrap failed.");

    let config = Arc::new(QuizConfig::from_env());

    let teloxide_token = std::env::var("TELOXIDE_TOKEN").expect("TELOXIDE_TOKEN should be set.");
    let bot = Bot::new(teloxide_token);
    tracing::info!("Starting bot...");

    let ngrok_url = std::env::var("NGROK_URL")
        .map(|d| d.parse::<Url>().expect("NGROK_URL can't be parsed."))
        .ok();
    let ngrok_addr = std::env::var("NGROK_ADDR")
        .map(|d| d.parse::<SocketAddr>().expect("NGROK_ADDR can't be parsed."))
        .ok();

    let mut dispatcher = Dispatcher::builder(bot.clone(), schema())
        .dependencies(dptree::deps![
            InMemStorage::<QuizState>::new(),
            connection,
            config
        ])
        .enable_ctrlc_handler()
        .build();

    if let (Some(ngrok_url), Some(ngrok_addr)) = (ngrok_url, ngrok_addr) {
        let listener = webhooks::axum(bot, Options::new(ngrok_addr, ngrok_url))
            .await
            .expect("Failed to build a listener.");
        dispatcher
            .dispatch_with_listener(listener, Arc::new(IgnoringErrorHandlerSafe))
            .await
    } else {
        dispatcher.dispatch().await
    }
}

fn schema() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    use dptree::case;

    let command_handler = teloxide::filter_command::<Command, _>()
        .branch(case![Command::Help].endpoint(help))
        .branch(case![Command::Start].endpoint(start))
        .branch(case![Command::Cancel].endpoint(cancel));

    let message_handler = Update::filter_message()
        .branch(command_handler)
        .branch(case![QuizState::Start].endpoint(runner::choose_what_to_do::<Connection>))
        .branch(case![QuizState::Selection].endpoint(runner::selection::<Connection>))
        .branch(case![QuizState::ReadyToRun { quiz }].endpoint(runner::running_ready::<Connection>))
        .endpoint(runner::invalid_state);

    let callback_handler = Update::filter_callback_query()
        .branch(case![QuizState::Taking { ctx }].endpoint(runner::take_answer))
        .branch(case![QuizState::Finished { ctx }].endpoint(runner::retry_quiz));

    dialogue::enter::<Update, InMemStorage<QuizState>, QuizState, _>()
        .branch(message_handler)
        .branch(callback_handler)
}
