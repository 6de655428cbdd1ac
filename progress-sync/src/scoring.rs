//! Pure scoring arithmetic: net scores from per-subject counts and
//! completion percentages from checklist state.

use tracker_api::exam::SubjectScore;
use tracker_api::types::PenaltyFactor;

/// `net = correct - wrong * penalty`. Never clamped: a heavily negative net
/// is a valid score and must display as such.
pub fn subject_net(score: &SubjectScore, penalty: PenaltyFactor) -> f64 {
    f64::from(score.correct()) - f64::from(score.wrong()) * penalty.as_f64()
}

/// Totals summed from the per-subject counts, independently of any
/// server-computed total. When the server also supplies a net, the server
/// value is the one displayed; this is only the provisional hint.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScoreTotals {
    pub correct: u32,
    pub wrong: u32,
    pub blank: u32,
    pub net: f64,
}

pub fn totals<'a>(
    scores: impl IntoIterator<Item = &'a SubjectScore>,
    penalty: PenaltyFactor,
) -> ScoreTotals {
    scores
        .into_iter()
        .fold(ScoreTotals::default(), |acc, score| ScoreTotals {
            correct: acc.correct + score.correct(),
            wrong: acc.wrong + score.wrong(),
            blank: acc.blank + score.blank(),
            net: acc.net + subject_net(score, penalty),
        })
}

/// Two-decimal rendering for display. The stored value keeps full precision.
pub fn display_net(net: f64) -> String {
    format!("{net:.2}")
}

/// Completion percentage of an outcome checklist, rounded half-up. An empty
/// checklist is 0% complete.
pub fn completion_percent(checked: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = 100.0 * checked as f64 / total as f64;
    (percent + 0.5).floor() as u8
}
