use std::{borrow::Cow, error::Error, future::Future};

use sqlx::postgres::PgPool;
use sqlx::Row;
use uuid::Uuid;

use crate::engine::AnswerRecord;
use crate::error::EngineError;
use crate::quiz::{Question, Quiz};

pub struct Connection {
    pool: PgPool,
}

type DbResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

impl Connection {
    pub async fn connect(connection_string: Cow<'_, str>) -> Result<Self, sqlx::Error> {
        let pool = PgPool::connect(&connection_string).await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS quizzes (
                uuid UUID PRIMARY KEY,
                title TEXT NOT NULL UNIQUE,
                description TEXT NOT NULL,
                author TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS questions (
                uuid UUID PRIMARY KEY,
                quiz_id UUID NOT NULL REFERENCES quizzes(uuid) ON DELETE CASCADE,
                position INT NOT NULL,
                prompt TEXT NOT NULL,
                UNIQUE (quiz_id, position)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS options (
                uuid UUID PRIMARY KEY,
                question_id UUID NOT NULL REFERENCES questions(uuid) ON DELETE CASCADE,
                position INT NOT NULL,
                text TEXT NOT NULL,
                is_correct BOOL NOT NULL DEFAULT FALSE,
                UNIQUE (question_id, position)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS attempts (
                uuid UUID PRIMARY KEY,
                quiz_id UUID NOT NULL REFERENCES quizzes(uuid) ON DELETE CASCADE,
                username TEXT NOT NULL,
                score INT NOT NULL,
                total INT NOT NULL,
                taken_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        // selected_option NULL means the question timed out unanswered.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS attempt_answers (
                attempt_id UUID NOT NULL REFERENCES attempts(uuid) ON DELETE CASCADE,
                question_position INT NOT NULL,
                selected_option INT,
                PRIMARY KEY (attempt_id, question_position)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Read side of the host boundary: quiz content for the engine.
pub trait RetrieveQuiz {
    fn retrieve_quiz(&self, title: &str) -> impl Future<Output = DbResult<Option<Quiz>>> + Send;

    fn retrieve_all_quiz_names(&self) -> impl Future<Output = DbResult<Vec<String>>> + Send;
}

/// Write side of the host boundary: a completed answer record.
pub trait RecordAttempt {
    fn record_attempt(
        &self,
        quiz_id: Uuid,
        username: String,
        score: u32,
        answers: AnswerRecord,
    ) -> impl Future<Output = DbResult<Uuid>> + Send;
}

/// Content seeding, used by the `seed` binary.
pub trait CreateQuiz {
    fn create_quiz(&self, quiz: &Quiz) -> impl Future<Output = DbResult<String>> + Send;
}

impl RetrieveQuiz for Connection {
    fn retrieve_quiz(&self, title: &str) -> impl Future<Output = DbResult<Option<Quiz>>> + Send {
        async move {
            let mut tx = self.pool.begin().await?;

            let quiz_row = sqlx::query(
                "SELECT uuid, title, description, author FROM quizzes WHERE title = $1",
            )
            .bind(title)
            .fetch_optional(&mut *tx)
            .await?;

            let Some(quiz_row) = quiz_row else {
                return Ok(None);
            };
            let quiz_uuid: Uuid = quiz_row.try_get("uuid")?;

            let question_rows = sqlx::query(
                "SELECT uuid, prompt FROM questions WHERE quiz_id = $1 ORDER BY position",
            )
            .bind(quiz_uuid)
            .fetch_all(&mut *tx)
            .await?;

            let mut questions = Vec::with_capacity(question_rows.len());
            for question_row in question_rows {
                let question_uuid: Uuid = question_row.try_get("uuid")?;
                let prompt: String = question_row.try_get("prompt")?;

                let option_rows = sqlx::query(
                    "SELECT text, is_correct FROM options WHERE question_id = $1 ORDER BY position",
                )
                .bind(question_uuid)
                .fetch_all(&mut *tx)
                .await?;

                // Fold the per-row correctness flag into the one canonical
                // answer-key index the engine works with.
                let mut options = Vec::with_capacity(option_rows.len());
                let mut correct_option = None;
                for (position, option_row) in option_rows.into_iter().enumerate() {
                    let is_correct: bool = option_row.try_get("is_correct")?;
                    if is_correct && correct_option.is_none() {
                        correct_option = Some(position);
                    }
                    options.push(option_row.try_get::<String, _>("text")?);
                }

                let correct_option = correct_option.ok_or_else(|| {
                    EngineError::QuizShape(format!("question '{prompt}' has no correct option"))
                })?;
                questions.push(Question::new(prompt, options, correct_option)?);
            }

            tx.commit().await?;

            Ok(Some(Quiz::retrieve(
                quiz_uuid,
                quiz_row.try_get("title")?,
                quiz_row.try_get("description")?,
                quiz_row.try_get("author")?,
                questions,
            )))
        }
    }

    fn retrieve_all_quiz_names(&self) -> impl Future<Output = DbResult<Vec<String>>> + Send {
        async move {
            let rows = sqlx::query("SELECT title FROM quizzes ORDER BY title")
                .fetch_all(&self.pool)
                .await?;

            let titles = rows
                .into_iter()
                .map(|row| row.try_get("title"))
                .collect::<Result<Vec<String>, _>>()?;

            Ok(titles)
        }
    }
}

impl RecordAttempt for Connection {
    fn record_attempt(
        &self,
        quiz_id: Uuid,
        username: String,
        score: u32,
        answers: AnswerRecord,
    ) -> impl Future<Output = DbResult<Uuid>> + Send {
        async move {
            let mut tx = self.pool.begin().await?;

            let attempt_id = Uuid::new_v4();
            sqlx::query(
                "INSERT INTO attempts (uuid, quiz_id, username, score, total)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(attempt_id)
            .bind(quiz_id)
            .bind(&username)
            .bind(score as i32)
            .bind(answers.len() as i32)
            .execute(&mut *tx)
            .await?;

            for (position, selected) in answers.iter() {
                sqlx::query(
                    "INSERT INTO attempt_answers (attempt_id, question_position, selected_option)
                     VALUES ($1, $2, $3)",
                )
                .bind(attempt_id)
                .bind(position as i32)
                .bind(selected.map(|option| option as i32))
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;

            tracing::debug!(%attempt_id, %quiz_id, score, "recorded attempt");
            Ok(attempt_id)
        }
    }
}

impl CreateQuiz for Connection {
    fn create_quiz(&self, quiz: &Quiz) -> impl Future<Output = DbResult<String>> + Send {
        async move {
            let mut tx = self.pool.begin().await?;

            sqlx::query("INSERT INTO quizzes VALUES ($1, $2, $3, $4)")
                .bind(quiz.uuid())
                .bind(quiz.title())
                .bind(quiz.description())
                .bind(quiz.author())
                .execute(&mut *tx)
                .await?;

            for (position, question) in quiz.questions().iter().enumerate() {
                let question_uuid = Uuid::new_v4();
                sqlx::query("INSERT INTO questions VALUES ($1, $2, $3, $4)")
                    .bind(question_uuid)
                    .bind(quiz.uuid())
                    .bind(position as i32)
                    .bind(question.prompt())
                    .execute(&mut *tx)
                    .await?;

                for (option_position, option) in question.options().iter().enumerate() {
                    sqlx::query("INSERT INTO options VALUES ($1, $2, $3, $4, $5)")
                        .bind(Uuid::new_v4())
                        .bind(question_uuid)
                        .bind(option_position as i32)
                        .bind(option)
                        .bind(option_position == question.correct_option())
                        .execute(&mut *tx)
                        .await?;
                }
            }

            tx.commit().await?;

            Ok(quiz.title().to_owned())
        }
    }
}
