//! Merges independently-fetched exam results and exam definitions into a
//! chronologically ordered display view.

use std::collections::HashMap;

use tracker_api::exam::{ExamDefinition, ExamResult};
use tracker_api::types::{ExamId, ResultId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Trend charts read left to right.
    Ascending,
    /// List views show the most recent result first.
    Descending,
}

/// One chart/list row. `date_key` is the resolved date normalized to a
/// fixed-width `YYYY-MM-DD` string (or empty when nothing resolves), so
/// plain string comparison orders rows correctly.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRow {
    result_id: ResultId,
    label: String,
    date_key: String,
    net: f64,
}

impl HistoryRow {
    pub fn result_id(&self) -> &ResultId {
        &self.result_id
    }

    /// Exam name when the definition is known, otherwise the date string
    /// stands in so rows are never unlabeled.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn date_key(&self) -> &str {
        &self.date_key
    }

    pub fn net(&self) -> f64 {
        self.net
    }
}

/// Resolves the display date for a result: the exam's calendar date when the
/// definition was fetched and carries one, else the result's own submission
/// timestamp truncated to its date, else empty.
fn resolve_date(result: &ExamResult, exam: Option<&ExamDefinition>) -> String {
    if let Some(date) = exam.and_then(ExamDefinition::date) {
        return date.format("%Y-%m-%d").to_string();
    }
    match result.entered_at() {
        Some(entered) => entered.format("%Y-%m-%d").to_string(),
        None => String::new(),
    }
}

/// Merges results with their exam definitions and orders them by resolved
/// date. Results whose exam lookup failed are kept, rendered from their
/// fallback date and label.
pub fn merge_and_order(
    results: &[ExamResult],
    exams: &HashMap<ExamId, ExamDefinition>,
    order: SortOrder,
) -> Vec<HistoryRow> {
    let mut rows: Vec<HistoryRow> = results
        .iter()
        .map(|result| {
            let exam = exams.get(result.exam_id());
            let date_key = resolve_date(result, exam);
            let label = match exam {
                Some(exam) => exam.name().to_owned(),
                None => date_key.clone(),
            };
            HistoryRow {
                result_id: result.id().clone(),
                label,
                date_key,
                net: result.net_total(),
            }
        })
        .collect();

    // Stable sort: rows with equal dates keep their fetched order.
    rows.sort_by(|a, b| match order {
        SortOrder::Ascending => a.date_key.cmp(&b.date_key),
        SortOrder::Descending => b.date_key.cmp(&a.date_key),
    });
    rows
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn result(id: &str, exam_id: &str, net: f64, entered_at: Option<&str>) -> ExamResult {
        serde_json::from_value(json!({
            "id": id,
            "student_id": "s1",
            "trial_exam_id": exam_id,
            "correct_total": 0,
            "wrong_total": 0,
            "blank_total": 0,
            "net_total": net,
            "entered_at": entered_at,
        }))
        .unwrap()
    }

    fn exam(id: &str, name: &str, date: Option<&str>) -> ExamDefinition {
        serde_json::from_value(json!({
            "id": id,
            "name": name,
            "date": date,
            "grade_scope": [8],
            "is_finalized": false,
        }))
        .unwrap()
    }

    fn exam_map(exams: Vec<ExamDefinition>) -> HashMap<ExamId, ExamDefinition> {
        exams.into_iter().map(|e| (e.id().clone(), e)).collect()
    }

    #[test]
    fn exam_date_takes_precedence_over_entry_timestamp() {
        let results = vec![result("r1", "e1", 80.0, Some("2025-06-02T09:30:00Z"))];
        let exams = exam_map(vec![exam("e1", "Nisan Denemesi", Some("2025-04-12"))]);

        let rows = merge_and_order(&results, &exams, SortOrder::Ascending);
        assert_eq!(rows[0].date_key(), "2025-04-12");
        assert_eq!(rows[0].label(), "Nisan Denemesi");
    }

    #[test]
    fn missing_exam_metadata_degrades_to_the_entry_date() {
        let results = vec![result("r1", "gone", 42.5, Some("2025-06-02T09:30:00Z"))];
        let rows = merge_and_order(&results, &HashMap::new(), SortOrder::Ascending);

        // The timestamp is truncated to its date, which also stands in as
        // the label so the row is never unlabeled.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date_key(), "2025-06-02");
        assert_eq!(rows[0].label(), "2025-06-02");
        assert_eq!(rows[0].net(), 42.5);
    }

    #[test]
    fn rows_without_any_date_resolve_to_empty_and_sort_first() {
        let results = vec![
            result("r1", "gone", 10.0, None),
            result("r2", "e2", 20.0, None),
        ];
        let exams = exam_map(vec![exam("e2", "Mayıs Denemesi", Some("2025-05-10"))]);

        let rows = merge_and_order(&results, &exams, SortOrder::Ascending);
        assert_eq!(rows[0].date_key(), "");
        assert_eq!(rows[0].label(), "");
        assert_eq!(rows[1].label(), "Mayıs Denemesi");
    }

    #[test]
    fn direction_is_caller_specified() {
        let results = vec![
            result("r1", "e1", 1.0, None),
            result("r2", "e2", 2.0, None),
            result("r3", "e3", 3.0, None),
        ];
        let exams = exam_map(vec![
            exam("e1", "Mart", Some("2025-03-01")),
            exam("e2", "Nisan", Some("2025-04-01")),
            exam("e3", "Şubat", Some("2025-02-01")),
        ]);

        let ascending = merge_and_order(&results, &exams, SortOrder::Ascending);
        let labels: Vec<_> = ascending.iter().map(HistoryRow::label).collect();
        assert_eq!(labels, ["Şubat", "Mart", "Nisan"]);

        let descending = merge_and_order(&results, &exams, SortOrder::Descending);
        let labels: Vec<_> = descending.iter().map(HistoryRow::label).collect();
        assert_eq!(labels, ["Nisan", "Mart", "Şubat"]);
    }
}
