//! Letter grades.
//!
//! The grading score is the mean of routing accuracy and END_CALL adherence.
//! It maps to a letter through four descending thresholds:
//!
//! | Grade | Condition |
//! |-------|-----------|
//! | **A** | score >= a |
//! | **B** | score >= b |
//! | **C** | score >= c |
//! | **D** | score >= d |
//! | **F** | below d |
//!
//! When either input is undefined the grade is undefined too.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::report::Score;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
    #[serde(rename = "undefined")]
    Undefined,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Undefined => "undefined",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minimum grading score, in percent, for each letter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            a: 90.0,
            b: 80.0,
            c: 65.0,
            d: 50.0,
        }
    }
}

impl GradeThresholds {
    /// Thresholds must lie within [0, 100] and strictly descend from A to D.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ordered = [("a", self.a), ("b", self.b), ("c", self.c), ("d", self.d)];

        for (name, value) in ordered {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidThresholds(format!(
                    "{} = {} is outside [0, 100]",
                    name, value
                )));
            }
        }

        for pair in ordered.windows(2) {
            let (upper, upper_value) = pair[0];
            let (lower, lower_value) = pair[1];
            if upper_value <= lower_value {
                return Err(ConfigError::InvalidThresholds(format!(
                    "{} ({}) must be greater than {} ({})",
                    upper, upper_value, lower, lower_value
                )));
            }
        }

        Ok(())
    }

    pub fn letter(&self, score: Score) -> Grade {
        match score {
            Score::Undefined => Grade::Undefined,
            Score::Value(v) if v >= self.a => Grade::A,
            Score::Value(v) if v >= self.b => Grade::B,
            Score::Value(v) if v >= self.c => Grade::C,
            Score::Value(v) if v >= self.d => Grade::D,
            Score::Value(_) => Grade::F,
        }
    }
}

/// Mean of the two grading inputs; undefined if either is.
pub fn grading_score(routing_accuracy: Score, end_call_adherence: Score) -> Score {
    match (routing_accuracy, end_call_adherence) {
        (Score::Value(routing), Score::Value(end_call)) => Score::Value((routing + end_call) / 2.0),
        _ => Score::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_letters() {
        let thresholds = GradeThresholds::default();
        assert_eq!(thresholds.letter(Score::Value(95.0)), Grade::A);
        assert_eq!(thresholds.letter(Score::Value(90.0)), Grade::A);
        assert_eq!(thresholds.letter(Score::Value(89.9)), Grade::B);
        assert_eq!(thresholds.letter(Score::Value(65.0)), Grade::C);
        assert_eq!(thresholds.letter(Score::Value(50.0)), Grade::D);
        assert_eq!(thresholds.letter(Score::Value(49.9)), Grade::F);
        assert_eq!(thresholds.letter(Score::Undefined), Grade::Undefined);
    }

    #[test]
    fn test_grading_score() {
        assert_eq!(
            grading_score(Score::Value(80.0), Score::Value(100.0)),
            Score::Value(90.0)
        );
        assert_eq!(grading_score(Score::Value(80.0), Score::Undefined), Score::Undefined);
    }

    #[test]
    fn test_thresholds_validate() {
        assert!(GradeThresholds::default().validate().is_ok());

        let equal = GradeThresholds {
            b: 90.0,
            ..GradeThresholds::default()
        };
        assert!(matches!(equal.validate(), Err(ConfigError::InvalidThresholds(_))));

        let negative = GradeThresholds {
            d: -1.0,
            ..GradeThresholds::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_grade_serializes_as_letter() {
        assert_eq!(serde_json::to_string(&Grade::B).unwrap(), "\"B\"");
        assert_eq!(serde_json::to_string(&Grade::Undefined).unwrap(), "\"undefined\"");
    }
}
