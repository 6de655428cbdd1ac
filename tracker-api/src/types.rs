//! Identifier newtypes and small shared value types for the tracker data
//! model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ApiError;

macro_rules! string_ids {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name {
                id: String,
            }

            impl $name {
                pub fn new(id: impl Into<String>) -> Self {
                    Self { id: id.into() }
                }

                pub fn as_str(&self) -> &str {
                    &self.id
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                    self.id.fmt(f)
                }
            }
        )+
    };
}

string_ids! {
    StudentId,
    ExamId,
    ResultId,
    /// Scoring-configuration reference carried by an exam definition.
    ScoringConfigId,
    BookId,
    OutcomeId,
    WorkbookId,
    /// Identity of a workbook assigned to a particular student.
    AssignmentId,
}

/// The fixed set of exam subjects.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SubjectCode {
    #[serde(rename = "TR")]
    Turkish,
    #[serde(rename = "MAT")]
    Math,
    #[serde(rename = "FEN")]
    Science,
    #[serde(rename = "SOS")]
    SocialStudies,
    #[serde(rename = "ING")]
    English,
    #[serde(rename = "DIN")]
    Religion,
}

impl SubjectCode {
    pub const ALL: [SubjectCode; 6] = [
        Self::Turkish,
        Self::Math,
        Self::Science,
        Self::SocialStudies,
        Self::English,
        Self::Religion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Turkish => "TR",
            Self::Math => "MAT",
            Self::Science => "FEN",
            Self::SocialStudies => "SOS",
            Self::English => "ING",
            Self::Religion => "DIN",
        }
    }

    /// Display label as shown in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Turkish => "Türkçe",
            Self::Math => "Matematik",
            Self::Science => "Fen Bilimleri",
            Self::SocialStudies => "Sosyal Bilgiler",
            Self::English => "İngilizce",
            Self::Religion => "Din Kültürü",
        }
    }
}

impl fmt::Display for SubjectCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weight applied to wrong answers when computing a net score.
///
/// Different scoring configurations use different factors (1/4 and 1/3 both
/// occur in practice), so the factor is always an explicit input rather than
/// a constant baked into the arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PenaltyFactor {
    factor: f64,
}

impl PenaltyFactor {
    /// One wrong answer cancels a quarter of a correct one.
    pub fn quarter() -> Self {
        Self { factor: 0.25 }
    }

    /// One wrong answer cancels a third of a correct one.
    pub fn third() -> Self {
        Self { factor: 1.0 / 3.0 }
    }

    pub fn new(factor: f64) -> Result<Self, ApiError> {
        if factor.is_finite() && factor > 0.0 && factor <= 1.0 {
            Ok(Self { factor })
        } else {
            Err(ApiError::Validation(format!(
                "penalty factor must be within (0, 1], got {factor}"
            )))
        }
    }

    pub fn as_f64(self) -> f64 {
        self.factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_codes_round_trip_through_wire_names() {
        for code in SubjectCode::ALL {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
            let back: SubjectCode = serde_json::from_str(&json).unwrap();
            assert_eq!(back, code);
        }
    }

    #[test]
    fn penalty_factor_rejects_out_of_range_values() {
        assert!(PenaltyFactor::new(0.25).is_ok());
        assert!(PenaltyFactor::new(0.0).is_err());
        assert!(PenaltyFactor::new(-0.25).is_err());
        assert!(PenaltyFactor::new(1.5).is_err());
        assert!(PenaltyFactor::new(f64::NAN).is_err());
    }
}
