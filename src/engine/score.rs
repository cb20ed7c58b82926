use crate::config::ResultThresholds;
use crate::quiz::Question;

use super::session::AnswerRecord;

/// Counts correct answers. Pure over the question set and the record: an
/// entry scores iff it is present and equals the question's answer key, so
/// unanswered (timed-out) questions never score.
pub fn score(questions: &[Question], answers: &AnswerRecord) -> u32 {
    questions
        .iter()
        .enumerate()
        .filter(|(i, question)| answers.selected(*i) == Some(question.correct_option()))
        .count() as u32
}

/// User-facing result bucket. Scoring itself never consults this; it only
/// drives the closing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultClass {
    Perfect,
    Good,
    KeepPracticing,
}

impl ResultClass {
    pub fn classify(score: u32, total: u32, thresholds: &ResultThresholds) -> Self {
        let ratio = if total == 0 {
            1.0
        } else {
            f64::from(score) / f64::from(total)
        };

        if ratio >= thresholds.perfect {
            Self::Perfect
        } else if ratio >= thresholds.good {
            Self::Good
        } else {
            Self::KeepPracticing
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Self::Perfect => "Perfect score! Excellent work!",
            Self::Good => "Great job!",
            Self::KeepPracticing => "Keep practicing!",
        }
    }
}

/// Renders the score as a fixed-width text bar for the result message.
pub fn result_bar(score: u32, total: u32, width: usize) -> String {
    let filled = if total == 0 {
        width
    } else {
        (score as usize * width) / total as usize
    };
    let mut bar = String::with_capacity(width);
    bar.extend(std::iter::repeat('█').take(filled));
    bar.extend(std::iter::repeat('░').take(width - filled));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::Question;

    fn question(correct: usize) -> Question {
        Question::new(
            "q".into(),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
        )
        .unwrap()
    }

    #[test]
    fn counts_only_matching_entries() {
        let questions = vec![question(1), question(2), question(0)];
        let mut answers = AnswerRecord::default();
        answers.lock(0, Some(1));
        answers.lock(1, None);
        answers.lock(2, Some(0));

        assert_eq!(score(&questions, &answers), 2);
    }

    #[test]
    fn unanswered_never_scores() {
        let questions = vec![question(0)];
        let mut answers = AnswerRecord::default();
        answers.lock(0, None);

        assert_eq!(score(&questions, &answers), 0);
    }

    #[test]
    fn classification_boundary_sits_below_two_thirds() {
        let thresholds = ResultThresholds::default();
        // 2/3 ≈ 0.67 is below the 0.7 cut.
        assert_eq!(
            ResultClass::classify(2, 3, &thresholds),
            ResultClass::KeepPracticing
        );
        assert_eq!(ResultClass::classify(7, 10, &thresholds), ResultClass::Good);
        assert_eq!(
            ResultClass::classify(3, 3, &thresholds),
            ResultClass::Perfect
        );
    }

    #[test]
    fn empty_total_counts_as_perfect() {
        let thresholds = ResultThresholds::default();
        assert_eq!(
            ResultClass::classify(0, 0, &thresholds),
            ResultClass::Perfect
        );
    }

    #[test]
    fn thresholds_are_policy_not_constants() {
        let lenient = ResultThresholds {
            perfect: 1.0,
            good: 0.5,
        };
        assert_eq!(ResultClass::classify(2, 3, &lenient), ResultClass::Good);
    }

    #[test]
    fn bar_is_proportional() {
        assert_eq!(result_bar(2, 4, 10), "█████░░░░░");
        assert_eq!(result_bar(0, 4, 4), "░░░░");
        assert_eq!(result_bar(4, 4, 4), "████");
    }
}
