use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};

use crate::error::ApiError;
use crate::types::{ExamId, PenaltyFactor, ResultId, ScoringConfigId, StudentId, SubjectCode};

/// A scheduled trial exam, created by an administrator. Once finalized the
/// backend rejects new result submissions against it; the client only
/// surfaces that rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    id: ExamId,
    name: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    grade_scope: Vec<u8>,
    #[serde(rename = "subjects_config_id", default)]
    scoring_config_id: Option<ScoringConfigId>,
    #[serde(default)]
    is_finalized: bool,
}

impl ExamDefinition {
    pub fn id(&self) -> &ExamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn grade_scope(&self) -> &[u8] {
        &self.grade_scope
    }

    pub fn scoring_config_id(&self) -> Option<&ScoringConfigId> {
        self.scoring_config_id.as_ref()
    }

    pub fn is_finalized(&self) -> bool {
        self.is_finalized
    }
}

/// Payload for creating an exam definition.
#[derive(Debug, Clone, Serialize)]
pub struct NewExam {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    date: NaiveDate,
    grade_scope: Vec<u8>,
    #[serde(rename = "subjects_config_id")]
    scoring_config_id: ScoringConfigId,
}

impl NewExam {
    pub fn new(
        name: impl Into<String>,
        source: Option<String>,
        date: NaiveDate,
        grade_scope: Vec<u8>,
        scoring_config_id: ScoringConfigId,
    ) -> Result<Self, ApiError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApiError::Validation("exam name must not be empty".into()));
        }
        Ok(Self {
            name,
            source,
            date,
            grade_scope,
            scoring_config_id,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Parses a `YYYY-MM-DD` date from form input, failing before any network
/// call is attempted.
pub fn parse_exam_date(input: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation(format!("malformed exam date: {input:?}")))
}

/// Per-subject breakdown of a result. Counts are non-negative by type; the
/// net is present only on server echoes, never on submissions.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectScore {
    subject_code: SubjectCode,
    correct: u32,
    wrong: u32,
    blank: u32,
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    net: Option<f64>,
}

impl SubjectScore {
    pub fn new(subject_code: SubjectCode, correct: u32, wrong: u32, blank: u32) -> Self {
        Self {
            subject_code,
            correct,
            wrong,
            blank,
            net: None,
        }
    }

    pub fn subject_code(&self) -> SubjectCode {
        self.subject_code
    }

    pub fn correct(&self) -> u32 {
        self.correct
    }

    pub fn wrong(&self) -> u32 {
        self.wrong
    }

    pub fn blank(&self) -> u32 {
        self.blank
    }

    /// Server-computed net, when present. Takes display precedence over any
    /// client-side computation.
    pub fn server_net(&self) -> Option<f64> {
        self.net
    }
}

/// A submitted exam result as stored by the backend. The totals are the
/// server-authoritative values; invariantly they equal the sums over
/// `subjects` when the breakdown is present.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    id: ResultId,
    student_id: StudentId,
    #[serde(rename = "trial_exam_id")]
    exam_id: ExamId,
    correct_total: u32,
    wrong_total: u32,
    blank_total: u32,
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    net_total: f64,
    #[serde(default)]
    entered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    subjects: Option<Vec<SubjectScore>>,
}

impl ExamResult {
    pub fn id(&self) -> &ResultId {
        &self.id
    }

    pub fn student_id(&self) -> &StudentId {
        &self.student_id
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    pub fn correct_total(&self) -> u32 {
        self.correct_total
    }

    pub fn wrong_total(&self) -> u32 {
        self.wrong_total
    }

    pub fn blank_total(&self) -> u32 {
        self.blank_total
    }

    /// Server-authoritative net. A heavily negative value is valid and must
    /// display as such.
    pub fn net_total(&self) -> f64 {
        self.net_total
    }

    pub fn entered_at(&self) -> Option<DateTime<Utc>> {
        self.entered_at
    }

    pub fn subjects(&self) -> &[SubjectScore] {
        self.subjects.as_deref().unwrap_or_default()
    }
}

/// Payload for submitting a result against an existing exam definition.
#[derive(Debug, Clone, Serialize)]
pub struct NewResult {
    student_id: StudentId,
    #[serde(rename = "trial_exam_id")]
    exam_id: ExamId,
    subjects: Vec<SubjectScore>,
}

impl NewResult {
    pub fn new(
        student_id: StudentId,
        exam_id: ExamId,
        subjects: Vec<SubjectScore>,
    ) -> Result<Self, ApiError> {
        if subjects.is_empty() {
            return Err(ApiError::Validation(
                "a result needs at least one subject score".into(),
            ));
        }
        Ok(Self {
            student_id,
            exam_id,
            subjects,
        })
    }

    pub fn exam_id(&self) -> &ExamId {
        &self.exam_id
    }

    pub fn subjects(&self) -> &[SubjectScore] {
        &self.subjects
    }

    /// Provisional totals shown before the backend confirms the submission.
    /// The server recomputes these with its configured penalty; its values
    /// replace this hint once the echo arrives.
    pub fn provisional_net(&self, penalty: PenaltyFactor) -> f64 {
        self.subjects
            .iter()
            .map(|s| f64::from(s.correct()) - f64::from(s.wrong()) * penalty.as_f64())
            .sum()
    }
}
