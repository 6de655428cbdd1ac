use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::types::{BookId, OutcomeId, SubjectCode};

/// A resource book owned by a single student. Its completion percentage is
/// always derived from the checked state of its outcomes; the client never
/// writes it directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBook {
    id: BookId,
    title: String,
    subject_code: SubjectCode,
    #[serde(default)]
    completion_percent: u8,
}

impl ResourceBook {
    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subject_code(&self) -> SubjectCode {
        self.subject_code
    }

    pub fn completion_percent(&self) -> u8 {
        self.completion_percent
    }

    /// Folds in the completion percentage the server derived from the
    /// outcome set. The client never chooses this value itself.
    pub fn apply_server_completion(&mut self, percent: u8) {
        self.completion_percent = percent.min(100);
    }

    /// Provisional row shown while creation is in flight; replaced by the
    /// server row on commit, removed on rollback.
    pub fn provisional(id: BookId, title: impl Into<String>, subject_code: SubjectCode) -> Self {
        Self {
            id,
            title: title.into(),
            subject_code,
            completion_percent: 0,
        }
    }
}

/// Payload for creating a resource book.
#[derive(Debug, Clone, Serialize)]
pub struct NewResourceBook {
    title: String,
    subject_code: SubjectCode,
}

impl NewResourceBook {
    pub fn new(title: impl Into<String>, subject_code: SubjectCode) -> Result<Self, ApiError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ApiError::Validation("book title must not be empty".into()));
        }
        Ok(Self {
            title,
            subject_code,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subject_code(&self) -> SubjectCode {
        self.subject_code
    }
}

/// A single checkable curriculum objective belonging to a resource book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    id: OutcomeId,
    #[serde(default)]
    sequence_code: String,
    #[serde(default)]
    description: String,
    checked: bool,
}

impl Outcome {
    pub fn id(&self) -> &OutcomeId {
        &self.id
    }

    pub fn sequence_code(&self) -> &str {
        &self.sequence_code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }
}

/// Server response to an outcome toggle: the recomputed completion
/// percentage for the owning book, which is authoritative over the client's
/// local computation.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeToggle {
    completion_percent: u8,
}

impl OutcomeToggle {
    pub fn completion_percent(&self) -> u8 {
        self.completion_percent
    }
}

/// Toggle payload.
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeUpdate {
    checked: bool,
}

impl OutcomeUpdate {
    pub fn new(checked: bool) -> Self {
        Self { checked }
    }
}
