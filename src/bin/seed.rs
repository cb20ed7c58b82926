//! Seeds a couple of sample quizzes so a fresh deployment has content to
//! serve. Safe to run repeatedly: existing titles are skipped.

use std::borrow::Cow;

use dotenvy::dotenv;

use quiz_runner::database::connection::{Connection, CreateQuiz, RetrieveQuiz};
use quiz_runner::quiz::{Question, Quiz};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt().init();

    let connection_string = std::env::var("DATABASE_URL").expect("DATABASE_URL should be set.");
    let connection = Connection::connect(Cow::Owned(connection_string))
        .await
        .expect("Failed to connect to database");
    connection
        .ensure_schema()
        .await
        .expect("Schema bootstrap failed.");

    for quiz in sample_quizzes() {
        match connection.retrieve_quiz(quiz.title()).await {
            Ok(Some(_)) => {
                tracing::info!("quiz '{}' already present, skipping", quiz.title());
            }
            Ok(None) => {
                let title = connection
                    .create_quiz(&quiz)
                    .await
                    .expect("Failed to seed quiz");
                tracing::info!("seeded quiz '{title}'");
            }
            Err(e) => panic!("Failed to check for existing quiz: {e}"),
        }
    }
}

fn sample_quizzes() -> Vec<Quiz> {
    let question = |prompt: &str, options: [&str; 4], correct: usize| {
        Question::new(
            prompt.to_owned(),
            options.map(str::to_owned).to_vec(),
            correct,
        )
        .expect("valid sample question")
    };

    vec![
        Quiz::new(
            "World Capitals".to_owned(),
            "A quick tour of capital cities.".to_owned(),
            "seed".to_owned(),
            vec![
                question(
                    "What is the capital of Australia?",
                    ["Sydney", "Canberra", "Melbourne", "Perth"],
                    1,
                ),
                question(
                    "What is the capital of Canada?",
                    ["Toronto", "Vancouver", "Ottawa", "Montreal"],
                    2,
                ),
                question(
                    "What is the capital of Switzerland?",
                    ["Bern", "Zurich", "Geneva", "Basel"],
                    0,
                ),
            ],
        ),
        Quiz::new(
            "Rust Basics".to_owned(),
            "Ownership, borrowing and friends.".to_owned(),
            "seed".to_owned(),
            vec![
                question(
                    "Which keyword declares an immutable binding?",
                    ["var", "mut", "let", "const fn"],
                    2,
                ),
                question(
                    "What does the ? operator do?",
                    [
                        "Panics on error",
                        "Propagates an error to the caller",
                        "Converts Option to Result",
                        "Retries the expression",
                    ],
                    1,
                ),
                question(
                    "How many mutable references to a value may exist at once?",
                    ["One", "Two", "Unlimited", "Zero"],
                    0,
                ),
                question(
                    "Which trait enables the for loop?",
                    ["Iterator", "IntoIterator", "Loop", "Index"],
                    1,
                ),
            ],
        ),
    ]
}
