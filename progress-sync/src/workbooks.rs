//! Workbook assignments and their directly-set progress percentages.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use tracker_api::client::Api;
use tracker_api::error::ApiError;
use tracker_api::types::{AssignmentId, StudentId, WorkbookId};
use tracker_api::workbook::{NewAssignment, ProgressUpdate, Workbook, WorkbookAssignment};

use crate::optimistic::{Keyed, MutationController, MutationOutcome};
use crate::progress::{next_percent, ProgressChange};
use crate::view::Liveness;

impl Keyed for WorkbookAssignment {
    type Key = AssignmentId;

    fn key(&self) -> AssignmentId {
        self.id().clone()
    }
}

/// Catalog workbooks plus the ones assigned to this student. The panel is
/// the sole writer of an assignment's progress percentage; there is no
/// checklist to derive it from.
pub struct WorkbookPanel {
    api: Arc<Api>,
    student: StudentId,
    catalog: Mutex<Vec<Workbook>>,
    assignments: MutationController<WorkbookAssignment>,
}

impl WorkbookPanel {
    pub fn new(api: Arc<Api>, student: StudentId) -> Self {
        Self {
            api,
            student,
            catalog: Mutex::new(Vec::new()),
            assignments: MutationController::new(),
        }
    }

    pub async fn refresh(&self, live: &Liveness, grade: Option<u8>) {
        let (catalog, assignments) = futures::join!(
            self.api.workbook_catalog(grade),
            self.api.assignments_for_student(&self.student),
        );

        if !live.is_live() {
            debug!(student = %self.student, "view retired, discarding fetched workbooks");
            return;
        }

        *self.catalog.lock().await = catalog;
        self.assignments.replace_rows(assignments).await;
    }

    pub async fn catalog(&self) -> Vec<Workbook> {
        self.catalog.lock().await.clone()
    }

    pub async fn assignments(&self) -> Vec<WorkbookAssignment> {
        self.assignments.rows().await
    }

    /// Assigns a catalog workbook. Not optimistic: the new row is prepended
    /// once the backend confirms it; a failure is surfaced with nothing to
    /// roll back.
    pub async fn assign(&self, workbook: WorkbookId) -> Result<WorkbookAssignment, ApiError> {
        let assigned = self
            .api
            .assign_workbook(&self.student, &NewAssignment::new(workbook))
            .await?;
        self.assignments
            .update_rows(|rows| rows.insert(0, assigned.clone()))
            .await;
        Ok(assigned)
    }

    /// Applies a relative or absolute progress change, clamped into
    /// `0..=100` before the remote call is issued, optimistically reflected
    /// locally, and rolled back (with a visible error) on remote failure.
    /// The server echo is authoritative if it disagrees with the clamped
    /// guess.
    ///
    /// The target percentage is derived from the row's state under the
    /// per-assignment gate: a second change queued behind an unresolved one
    /// steps from the first change's resolved value, not a stale base. An
    /// unknown assignment resolves as a rollback without touching the
    /// network.
    pub async fn update_progress(
        &self,
        assignment: &AssignmentId,
        change: ProgressChange,
    ) -> MutationOutcome<WorkbookAssignment> {
        let api = Arc::clone(&self.api);
        let student = self.student.clone();
        let remote_id = assignment.clone();
        self.assignments
            .apply_with(
                assignment.clone(),
                |rows| {
                    let row = rows.iter_mut().find(|row| row.id() == assignment)?;
                    let target = next_percent(row.progress_percent(), change);
                    row.set_progress_percent(target);
                    Some(target)
                },
                move |target| async move {
                    match target {
                        Some(target) => {
                            api.update_workbook_progress(
                                &student,
                                &remote_id,
                                &ProgressUpdate::new(target),
                            )
                            .await
                        }
                        None => Err(ApiError::Validation(format!(
                            "unknown assignment {remote_id}"
                        ))),
                    }
                },
                |rows, echoed: &WorkbookAssignment| {
                    if let Some(row) = rows.iter_mut().find(|row| row.id() == echoed.id()) {
                        *row = echoed.clone();
                    }
                },
            )
            .await
    }
}
