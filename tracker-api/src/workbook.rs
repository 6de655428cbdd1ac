use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AssignmentId, SubjectCode, WorkbookId};

/// A catalog workbook (question bank), not yet tied to a student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workbook {
    id: WorkbookId,
    title: String,
    subject_code: SubjectCode,
    grade: u8,
    #[serde(default)]
    publisher: Option<String>,
    #[serde(default)]
    total_units: Option<u32>,
    #[serde(default)]
    total_pages: Option<u32>,
}

impl Workbook {
    pub fn id(&self) -> &WorkbookId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subject_code(&self) -> SubjectCode {
        self.subject_code
    }

    pub fn grade(&self) -> u8 {
        self.grade
    }

    pub fn publisher(&self) -> Option<&str> {
        self.publisher.as_deref()
    }
}

/// A workbook assigned to a student. Unlike a resource book there is no
/// sub-checklist: the progress percentage is set directly, by delta or
/// absolute value, and only through the bounded progress updater.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkbookAssignment {
    id: AssignmentId,
    workbook: Workbook,
    #[serde(default)]
    progress_percent: Option<u8>,
    #[serde(default)]
    assigned_at: Option<DateTime<Utc>>,
}

impl WorkbookAssignment {
    pub fn id(&self) -> &AssignmentId {
        &self.id
    }

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Current progress, treating an absent value as zero.
    pub fn progress_percent(&self) -> u8 {
        self.progress_percent.unwrap_or(0)
    }

    pub fn set_progress_percent(&mut self, percent: u8) {
        self.progress_percent = Some(percent);
    }

    pub fn assigned_at(&self) -> Option<DateTime<Utc>> {
        self.assigned_at
    }
}

/// Payload for assigning a catalog workbook to a student.
#[derive(Debug, Clone, Serialize)]
pub struct NewAssignment {
    workbook_id: WorkbookId,
}

impl NewAssignment {
    pub fn new(workbook_id: WorkbookId) -> Self {
        Self { workbook_id }
    }
}

/// Progress update payload. The value is clamped into `0..=100` before this
/// is ever constructed, so the wire never carries an out-of-range value.
#[derive(Debug, Clone, Serialize)]
pub struct ProgressUpdate {
    progress_percent: u8,
}

impl ProgressUpdate {
    pub fn new(progress_percent: u8) -> Self {
        debug_assert!(progress_percent <= 100);
        Self { progress_percent }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn assignment_treats_null_progress_as_zero() {
        let assignment: WorkbookAssignment = serde_json::from_value(json!({
            "id": "a1",
            "workbook": {
                "id": "w1",
                "title": "Soru Bankası",
                "subject_code": "MAT",
                "grade": 8,
                "publisher": null
            },
            "progress_percent": null
        }))
        .unwrap();
        assert_eq!(assignment.progress_percent(), 0);
        assert!(assignment.assigned_at().is_none());
    }
}
