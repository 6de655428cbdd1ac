//! Exam history panel: fetch, derive, and optimistically delete.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;
use tracker_api::client::Api;
use tracker_api::error::ApiError;
use tracker_api::exam::{ExamDefinition, ExamResult, NewResult};
use tracker_api::types::{ExamId, ResultId, StudentId};

use crate::history::{merge_and_order, HistoryRow, SortOrder};
use crate::optimistic::{Keyed, MutationController, MutationOutcome};
use crate::view::Liveness;

impl Keyed for ExamResult {
    type Key = ResultId;

    fn key(&self) -> ResultId {
        self.id().clone()
    }
}

/// One student's exam history. Rows and the exam lookup map are raw fetched
/// state; every display view is recomputed from them on demand.
pub struct ExamHistory {
    api: Arc<Api>,
    student: StudentId,
    results: MutationController<ExamResult>,
    exams: Mutex<HashMap<ExamId, ExamDefinition>>,
}

impl ExamHistory {
    pub fn new(api: Arc<Api>, student: StudentId) -> Self {
        Self {
            api,
            student,
            results: MutationController::new(),
            exams: Mutex::new(HashMap::new()),
        }
    }

    /// Refetches results and exam definitions. Either fetch degrading to
    /// empty is fine: rows render from their fallback labels, and a result
    /// set that really is empty shows as "no records yet". A retired view
    /// discards the fetched data instead of applying it.
    pub async fn refresh(&self, live: &Liveness, grade: Option<u8>) {
        let (results, exams) = futures::join!(
            self.api.results_for_student(&self.student),
            self.api.exams_for_grade(grade),
        );

        if !live.is_live() {
            debug!(student = %self.student, "view retired, discarding fetched history");
            return;
        }

        self.results.replace_rows(results).await;
        *self.exams.lock().await = exams
            .into_iter()
            .map(|exam| (exam.id().clone(), exam))
            .collect();
    }

    async fn rows(&self, order: SortOrder) -> Vec<HistoryRow> {
        let results = self.results.rows().await;
        let exams = self.exams.lock().await;
        merge_and_order(&results, &exams, order)
    }

    /// Chart series, oldest first.
    pub async fn trend_points(&self) -> Vec<HistoryRow> {
        self.rows(SortOrder::Ascending).await
    }

    /// List rows, most recent first.
    pub async fn list_rows(&self) -> Vec<HistoryRow> {
        self.rows(SortOrder::Descending).await
    }

    pub async fn result(&self, id: &ResultId) -> Option<ExamResult> {
        self.results.get(id).await
    }

    /// Submits a new result. Not optimistic: the row appears once the
    /// backend echoes the stored result, with its authoritative totals.
    /// A finalized-exam rejection arrives here as
    /// [`ApiError::ExamFinalized`].
    pub async fn submit(&self, result: &NewResult) -> Result<ExamResult, ApiError> {
        let created = self.api.submit_result(result).await?;
        self.results
            .update_rows(|rows| rows.insert(0, created.clone()))
            .await;
        Ok(created)
    }

    /// Removes the row immediately; a remote rejection restores it in its
    /// original position with its original values and surfaces the error.
    pub async fn delete(&self, id: &ResultId) -> MutationOutcome<()> {
        let api = Arc::clone(&self.api);
        let remote_id = id.clone();
        self.results
            .apply(
                id.clone(),
                |rows| rows.retain(|row| row.id() != id),
                async move { api.delete_result(&remote_id).await },
                |_, _| {},
            )
            .await
    }

    pub async fn is_deleting(&self, id: &ResultId) -> bool {
        self.results.is_pending(id).await
    }
}
