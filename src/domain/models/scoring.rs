//! Discrete risk scale shared by every judgment.

use serde::{Deserialize, Serialize};

/// Bounded scale a judgment may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Verified, logical behavior, stable employment
    Good,
    /// Neutral, standard behavior
    Normal,
    /// Slight concerns, illogical or suspicious writing
    MinorIssue,
    /// Red flags: gambling, instability, major inconsistencies
    Warning,
}

impl RiskLevel {
    pub const ALL: [Self; 4] = [Self::Good, Self::Normal, Self::MinorIssue, Self::Warning];

    pub const fn score(self) -> i32 {
        match self {
            Self::Good => 2,
            Self::Normal => 0,
            Self::MinorIssue => -5,
            Self::Warning => -10,
        }
    }

    /// Snaps an arbitrary judge score onto the scale (ties resolve toward the
    /// more favourable level).
    pub fn nearest(raw: i64) -> Self {
        Self::ALL
            .into_iter()
            .min_by_key(|level| raw.abs_diff(i64::from(level.score())))
            .unwrap_or(Self::Normal)
    }

    /// Maps a predicted probability of default onto the scale. A non-finite
    /// probability carries no signal and maps to `Normal`.
    pub fn from_default_probability(probability: f64) -> Self {
        if !probability.is_finite() {
            Self::Normal
        } else if probability < 0.2 {
            Self::Good
        } else if probability < 0.5 {
            Self::Normal
        } else if probability < 0.75 {
            Self::MinorIssue
        } else {
            Self::Warning
        }
    }
}

/// Output of the statistical scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// `default` or `non_default`
    pub label: String,
    /// Probability of default in [0, 1]
    pub probability: f64,
}
