//! Resource books and their outcome checklists.
//!
//! A book's completion percentage is never written directly: the client
//! recomputes it locally when an outcome is toggled, and the server's
//! recomputed value replaces that guess on confirmation.

use std::sync::Arc;

use tracing::debug;
use tracker_api::book::{NewResourceBook, Outcome, OutcomeToggle, OutcomeUpdate, ResourceBook};
use tracker_api::client::Api;
use tracker_api::types::{BookId, OutcomeId, StudentId};

use crate::optimistic::{Keyed, MutationController, MutationOutcome};
use crate::scoring::completion_percent;
use crate::view::Liveness;

impl Keyed for ResourceBook {
    type Key = BookId;

    fn key(&self) -> BookId {
        self.id().clone()
    }
}

impl Keyed for Outcome {
    type Key = OutcomeId;

    fn key(&self) -> OutcomeId {
        self.id().clone()
    }
}

/// The books belonging to one student.
pub struct BookTracker {
    api: Arc<Api>,
    student: StudentId,
    books: MutationController<ResourceBook>,
}

impl BookTracker {
    pub fn new(api: Arc<Api>, student: StudentId) -> Self {
        Self {
            api,
            student,
            books: MutationController::new(),
        }
    }

    pub async fn refresh(&self, live: &Liveness) {
        let books = self.api.books_for_student(&self.student).await;
        if !live.is_live() {
            debug!(student = %self.student, "view retired, discarding fetched books");
            return;
        }
        self.books.replace_rows(books).await;
    }

    pub async fn books(&self) -> Vec<ResourceBook> {
        self.books.rows().await
    }

    /// Creates a book optimistically: a provisional row appears at once and
    /// is swapped for the server row on confirmation, or removed (with a
    /// visible error) on rejection.
    pub async fn create_book(&self, book: NewResourceBook) -> MutationOutcome<ResourceBook> {
        let provisional_id = BookId::new(format!("pending:{}", book.title()));
        let provisional =
            ResourceBook::provisional(provisional_id.clone(), book.title(), book.subject_code());

        let api = Arc::clone(&self.api);
        let student = self.student.clone();
        let swap_id = provisional_id.clone();
        self.books
            .apply(
                provisional_id,
                move |rows| rows.insert(0, provisional),
                async move { api.create_book(&student, &book).await },
                move |rows, created| swap_provisional(rows, &swap_id, created),
            )
            .await
    }

    /// Opens the checklist for one of this student's books.
    pub async fn open_checklist(&self, live: &Liveness, book: &BookId) -> OutcomeChecklist {
        let checklist = OutcomeChecklist::new(Arc::clone(&self.api), book.clone());
        checklist.refresh(live).await;
        checklist
    }

    /// Folds a server-recomputed completion percentage back into the book
    /// row after an outcome toggle commits.
    pub async fn apply_completion(&self, book: &BookId, percent: u8) {
        self.books
            .update_rows(|rows| {
                if let Some(row) = rows.iter_mut().find(|row| row.id() == book) {
                    row.apply_server_completion(percent);
                }
            })
            .await;
    }
}

fn swap_provisional(rows: &mut Vec<ResourceBook>, provisional: &BookId, created: &ResourceBook) {
    rows.retain(|row| row.id() != provisional);
    rows.insert(0, created.clone());
}

/// The outcome checklist of a single book.
pub struct OutcomeChecklist {
    api: Arc<Api>,
    book: BookId,
    outcomes: MutationController<Outcome>,
}

impl OutcomeChecklist {
    fn new(api: Arc<Api>, book: BookId) -> Self {
        Self {
            api,
            book,
            outcomes: MutationController::new(),
        }
    }

    pub async fn refresh(&self, live: &Liveness) {
        let outcomes = self.api.outcomes_for_book(&self.book).await;
        if !live.is_live() {
            debug!(book = %self.book, "view retired, discarding fetched outcomes");
            return;
        }
        self.outcomes.replace_rows(outcomes).await;
    }

    pub async fn outcomes(&self) -> Vec<Outcome> {
        self.outcomes.rows().await
    }

    /// Completion percentage derived from local checklist state; shown until
    /// the server's recomputed value arrives.
    pub async fn local_percent(&self) -> u8 {
        let outcomes = self.outcomes.rows().await;
        let checked = outcomes.iter().filter(|outcome| outcome.checked()).count();
        completion_percent(checked, outcomes.len())
    }

    /// Flips an outcome immediately; the committed response carries the
    /// server-recomputed book percentage for the caller to apply via
    /// [`BookTracker::apply_completion`].
    pub async fn toggle(
        &self,
        outcome: &OutcomeId,
        checked: bool,
    ) -> MutationOutcome<OutcomeToggle> {
        let api = Arc::clone(&self.api);
        let book = self.book.clone();
        let remote_id = outcome.clone();
        self.outcomes
            .apply(
                outcome.clone(),
                |rows| {
                    if let Some(row) = rows.iter_mut().find(|row| row.id() == outcome) {
                        row.set_checked(checked);
                    }
                },
                async move {
                    api.toggle_outcome(&book, &remote_id, &OutcomeUpdate::new(checked))
                        .await
                },
                |_, _| {},
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn book(id: &str, title: &str, percent: u8) -> ResourceBook {
        serde_json::from_value(json!({
            "id": id,
            "title": title,
            "subject_code": "MAT",
            "completion_percent": percent,
        }))
        .unwrap()
    }

    #[test]
    fn provisional_row_is_swapped_for_the_server_row() {
        let provisional_id = BookId::new("pending:Paragraf");
        let mut rows = vec![
            ResourceBook::provisional(provisional_id.clone(), "Paragraf", tracker_api::types::SubjectCode::Turkish),
            book("b1", "Soru Bankası", 40),
        ];

        let created = book("b9", "Paragraf", 0);
        swap_provisional(&mut rows, &provisional_id, &created);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id(), created.id());
        assert_eq!(rows[1].id().as_str(), "b1");
    }

    #[test]
    fn completion_update_only_touches_the_percent() {
        let original = book("b1", "Soru Bankası", 40);
        let mut updated = original.clone();
        updated.apply_server_completion(70);
        assert_eq!(updated.completion_percent(), 70);
        assert_eq!(updated.title(), original.title());
        assert_eq!(updated.id(), original.id());
    }
}
