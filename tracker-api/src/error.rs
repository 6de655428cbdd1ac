use reqwest::StatusCode;
use thiserror::Error;

/// Detail string the backend uses when an exam no longer accepts results.
pub(crate) const FINALIZED_DETAIL: &str = "finalized";

/// Failure classes for the write path. The read path never surfaces these;
/// it degrades to an empty result set instead.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network-level failure or a body that could not be decoded.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A path that could not be joined onto the configured base address.
    #[error("invalid endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    /// The backend rejected the request with a non-success status.
    #[error("backend rejected the request ({status}): {detail}")]
    Rejected { status: StatusCode, detail: String },

    /// The target exam is finalized and no longer accepts result submissions.
    /// Kept distinct from [`ApiError::Rejected`] so callers can show the
    /// specific message.
    #[error("this exam is finalized and no longer accepts results")]
    ExamFinalized,

    /// Input rejected before any network call was made.
    #[error("invalid input: {0}")]
    Validation(String),
}

impl ApiError {
    pub fn is_finalized_rejection(&self) -> bool {
        matches!(self, Self::ExamFinalized)
    }

    /// Message suitable for showing directly to the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}
