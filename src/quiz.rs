use std::fmt;

use uuid::Uuid;

use crate::error::EngineError;

/// One quiz as presented to a user: an immutable ordered question set plus
/// the catalog metadata shown before starting.
#[derive(Debug, Clone)]
pub struct Quiz {
    uuid: Uuid,
    title: String,
    description: String,
    author: String,
    questions: Vec<Question>,
}

/// A single multiple-choice question. `correct_option` is the one canonical
/// answer key, always a valid index into `options`.
#[derive(Debug, Clone)]
pub struct Question {
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
}

impl fmt::Display for Quiz {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<b>{}</b>\n<i>{}</i>\n\nBy {}.\nQuestions: {}",
            self.title(),
            self.description(),
            self.author(),
            self.questions().len()
        )
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.prompt())?;
        for (i, option) in self.options().iter().enumerate() {
            writeln!(f, "{}) {}", i + 1, option)?;
        }
        Ok(())
    }
}

impl Quiz {
    pub fn new(
        title: String,
        description: String,
        author: String,
        questions: Vec<Question>,
    ) -> Self {
        Self::retrieve(Uuid::new_v4(), title, description, author, questions)
    }

    /// Rebuilds a quiz fetched from storage under its persisted identity.
    pub fn retrieve(
        uuid: Uuid,
        title: String,
        description: String,
        author: String,
        questions: Vec<Question>,
    ) -> Self {
        Self {
            uuid,
            title,
            description,
            author,
            questions,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }
}

impl Question {
    /// Validates the shape invariant at the boundary: options must be
    /// non-empty and the answer key must point into them. Content that fails
    /// here never reaches a session.
    pub fn new(
        prompt: String,
        options: Vec<String>,
        correct_option: usize,
    ) -> Result<Self, EngineError> {
        if options.is_empty() {
            return Err(EngineError::QuizShape(format!(
                "question '{prompt}' has no options"
            )));
        }
        if correct_option >= options.len() {
            return Err(EngineError::QuizShape(format!(
                "question '{prompt}' marks option {correct_option} correct but has only {} options",
                options.len()
            )));
        }
        Ok(Self {
            prompt,
            options,
            correct_option,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_option(&self) -> usize {
        self.correct_option
    }
}
