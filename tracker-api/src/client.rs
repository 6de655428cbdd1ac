use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Client as HttpClient, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::book::{NewResourceBook, Outcome, OutcomeToggle, OutcomeUpdate, ResourceBook};
use crate::config::{Config, CredentialsMode};
use crate::error::{ApiError, FINALIZED_DETAIL};
use crate::exam::{ExamDefinition, ExamResult, NewExam, NewResult, SubjectScore};
use crate::fetch::{first_ok, Listing};
use crate::types::{AssignmentId, BookId, OutcomeId, ResultId, StudentId};
use crate::workbook::{NewAssignment, ProgressUpdate, Workbook, WorkbookAssignment};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed client for the tracker backend.
///
/// Reads never error: a failed fetch degrades to an empty result set, with
/// at most a single built-in fallback attempt. Writes always surface an
/// [`ApiError`] the caller must branch on.
#[derive(Debug)]
pub struct Api {
    http: HttpClient,
    config: Config,
    // Anti-forgery token derived from client-held session state, attached to
    // every non-read verb. Rotated by the transport layer, hence the lock.
    csrf_token: RwLock<Option<String>>,
}

impl Api {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let http = HttpClient::builder()
            .cookie_store(config.credentials_mode() == CredentialsMode::Include)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            config,
            csrf_token: RwLock::new(None),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_csrf_token(&self, token: impl Into<String>) {
        *self.csrf_token.write().unwrap() = Some(token.into());
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.config.endpoint(path)?)
    }

    fn write_request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self.http.request(method, url);
        match self.csrf_token.read().unwrap().as_deref() {
            Some(token) => request.header("X-CSRF-Token", token),
            None => request,
        }
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    async fn get_listing<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ApiError> {
        let url = self.endpoint(path)?;
        debug!(%url, "fetching listing");
        let listing: Listing<T> = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(listing.into_items())
    }

    /// Attempts `primary`; on any failure attempts `secondary`; if both fail
    /// the caller sees an empty vec, never an error. The two attempts are
    /// strictly sequential and a successful primary short-circuits.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_with_fallback<T: DeserializeOwned>(
        &self,
        primary: &str,
        secondary: Option<&str>,
    ) -> Vec<T> {
        first_ok(
            (primary, self.get_listing(primary)),
            secondary.map(|path| (path, self.get_listing(path))),
        )
        .await
    }

    pub async fn exams_for_grade(&self, grade: Option<u8>) -> Vec<ExamDefinition> {
        let path = match grade {
            Some(grade) => format!("/trials?grade={grade}"),
            None => "/trials".to_owned(),
        };
        self.fetch_with_fallback(&path, None).await
    }

    /// Exam results for a student: nested route first, flat query-filtered
    /// route as the fallback.
    pub async fn results_for_student(&self, student: &StudentId) -> Vec<ExamResult> {
        self.fetch_with_fallback(
            &format!("/students/{student}/trials"),
            Some(&format!("/trial-results?student_id={student}")),
        )
        .await
    }

    pub async fn books_for_student(&self, student: &StudentId) -> Vec<ResourceBook> {
        self.fetch_with_fallback(
            &format!("/students/{student}/books"),
            Some(&format!("/books?student_id={student}")),
        )
        .await
    }

    pub async fn outcomes_for_book(&self, book: &BookId) -> Vec<Outcome> {
        self.fetch_with_fallback(&format!("/books/{book}/outcomes"), None)
            .await
    }

    pub async fn workbook_catalog(&self, grade: Option<u8>) -> Vec<Workbook> {
        let path = match grade {
            Some(grade) => format!("/workbooks?grade={grade}"),
            None => "/workbooks".to_owned(),
        };
        self.fetch_with_fallback(&path, None).await
    }

    pub async fn assignments_for_student(&self, student: &StudentId) -> Vec<WorkbookAssignment> {
        self.fetch_with_fallback(&format!("/students/{student}/workbooks"), None)
            .await
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    async fn send_write(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = error_detail(response).await;
        if status == StatusCode::FORBIDDEN && detail == FINALIZED_DETAIL {
            return Err(ApiError::ExamFinalized);
        }
        Err(ApiError::Rejected { status, detail })
    }

    async fn post_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let request = self.write_request(Method::POST, url).json(body);
        Ok(self.send_write(request).await?.json().await?)
    }

    async fn put_json<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(path)?;
        let request = self.write_request(Method::PUT, url).json(body);
        Ok(self.send_write(request).await?.json().await?)
    }

    #[tracing::instrument(level = "debug", skip(self, exam), fields(name = exam.name()))]
    pub async fn create_exam(&self, exam: &NewExam) -> Result<ExamDefinition, ApiError> {
        self.post_json("/trials", exam).await
    }

    #[tracing::instrument(level = "debug", skip(self, result), fields(exam = %result.exam_id()))]
    pub async fn submit_result(&self, result: &NewResult) -> Result<ExamResult, ApiError> {
        self.post_json("/trial-results", result).await
    }

    /// Two-step submission: create the exam definition, then submit a result
    /// against it. If the second step fails, the definition created by the
    /// first is left in place (no automatic cleanup) and the step-two error
    /// is returned as the submission failure.
    pub async fn submit_new_exam_result(
        &self,
        exam: &NewExam,
        student: StudentId,
        subjects: Vec<SubjectScore>,
    ) -> Result<ExamResult, ApiError> {
        if subjects.is_empty() {
            return Err(ApiError::Validation(
                "a result needs at least one subject score".into(),
            ));
        }
        let created = self.create_exam(exam).await?;
        info!(exam = %created.id(), "exam definition created, submitting result");
        let result = NewResult::new(student, created.id().clone(), subjects)?;
        self.submit_result(&result).await
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn delete_result(&self, result: &ResultId) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/trial-results/{result}"))?;
        let request = self.write_request(Method::DELETE, url);
        self.send_write(request).await?;
        Ok(())
    }

    pub async fn create_book(
        &self,
        student: &StudentId,
        book: &NewResourceBook,
    ) -> Result<ResourceBook, ApiError> {
        self.post_json(&format!("/students/{student}/books"), book).await
    }

    /// Toggles one outcome; the response carries the server-recomputed
    /// completion percentage for the owning book.
    pub async fn toggle_outcome(
        &self,
        book: &BookId,
        outcome: &OutcomeId,
        update: &OutcomeUpdate,
    ) -> Result<OutcomeToggle, ApiError> {
        self.put_json(&format!("/books/{book}/outcomes/{outcome}"), update)
            .await
    }

    pub async fn assign_workbook(
        &self,
        student: &StudentId,
        assignment: &NewAssignment,
    ) -> Result<WorkbookAssignment, ApiError> {
        self.post_json(&format!("/students/{student}/workbooks"), assignment)
            .await
    }

    pub async fn update_workbook_progress(
        &self,
        student: &StudentId,
        assignment: &AssignmentId,
        update: &ProgressUpdate,
    ) -> Result<WorkbookAssignment, ApiError> {
        self.put_json(&format!("/students/{student}/workbooks/{assignment}"), update)
            .await
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

/// Pulls the backend's `{"detail": ...}` out of a rejection body, falling
/// back to the raw text when the body isn't in that shape.
async fn error_detail(response: Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&text) {
        Ok(body) => body.detail,
        Err(_) => text,
    }
}
