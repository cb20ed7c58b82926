use dotenvy::dotenv;

/// Thresholds for the user-facing result classification, as fractions of the
/// total question count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultThresholds {
    pub perfect: f64,
    pub good: f64,
}

impl Default for ResultThresholds {
    fn default() -> Self {
        Self {
            perfect: 1.0,
            good: 0.7,
        }
    }
}

/// Remaining-seconds bands for the countdown display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UrgencyThresholds {
    pub warning_at: u32,
    pub critical_at: u32,
}

impl Default for UrgencyThresholds {
    fn default() -> Self {
        Self {
            warning_at: 15,
            critical_at: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuizConfig {
    pub countdown_seconds: u32,
    pub result: ResultThresholds,
    pub urgency: UrgencyThresholds,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            countdown_seconds: 30,
            result: ResultThresholds::default(),
            urgency: UrgencyThresholds::default(),
        }
    }
}

impl QuizConfig {
    /// Defaults with the per-question countdown optionally overridden by
    /// `QUIZ_COUNTDOWN_SECS`. An unparsable value falls back to the default.
    pub fn from_env() -> Self {
        dotenv().ok();

        let mut config = Self::default();
        if let Ok(secs) = std::env::var("QUIZ_COUNTDOWN_SECS") {
            match secs.parse::<u32>() {
                Ok(secs) if secs > 0 => config.countdown_seconds = secs,
                _ => tracing::warn!("ignoring invalid QUIZ_COUNTDOWN_SECS='{secs}'"),
            }
        }
        config
    }
}
