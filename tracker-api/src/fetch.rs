//! Normalization of the backend's two list shapes, and the primary/fallback
//! attempt sequencing for reads.
//!
//! Some routes return a bare JSON array, others wrap the rows in an object
//! with an `items` field that may itself be absent or null. This union is the
//! single place that ambiguity is resolved; everything downstream sees a
//! plain `Vec`.

use std::future::Future;

use serde::Deserialize;
use tracing::warn;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Bare(Vec<T>),
    Wrapped(Wrapped<T>),
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Wrapped<T> {
    #[serde(default)]
    items: Option<Vec<T>>,
}

impl<T> Listing<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            Listing::Bare(items) => items,
            Listing::Wrapped(Wrapped { items }) => items.unwrap_or_default(),
        }
    }
}

/// Awaits the primary attempt; only if it fails is the secondary attempt
/// polled at all. Both failing yields an empty vec, never an error. Each
/// attempt is paired with the path it targets, for the failure log line.
pub(crate) async fn first_ok<T, P, S>(
    primary: (&str, P),
    secondary: Option<(&str, S)>,
) -> Vec<T>
where
    P: Future<Output = Result<Vec<T>, ApiError>>,
    S: Future<Output = Result<Vec<T>, ApiError>>,
{
    let (path, attempt) = primary;
    match attempt.await {
        Ok(items) => return items,
        Err(err) => warn!(path, %err, "primary fetch failed"),
    }

    if let Some((path, attempt)) = secondary {
        match attempt.await {
            Ok(items) => return items,
            Err(err) => warn!(path, %err, "fallback fetch failed"),
        }
    }

    Vec::new()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    type Attempt = std::future::Ready<Result<Vec<u32>, ApiError>>;

    fn failure() -> Result<Vec<u32>, ApiError> {
        Err(ApiError::Validation("route unavailable".into()))
    }

    #[tokio::test]
    async fn successful_primary_never_polls_the_fallback() {
        let fallback_polled = AtomicBool::new(false);
        let secondary = async {
            fallback_polled.store(true, Ordering::SeqCst);
            Ok(vec![9])
        };

        let items = first_ok(
            ("/primary", async { Ok(vec![1, 2]) }),
            Some(("/fallback", secondary)),
        )
        .await;

        assert_eq!(items, vec![1, 2]);
        assert!(!fallback_polled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failing_primary_yields_the_fallback_output_verbatim() {
        let items = first_ok(
            ("/primary", async { failure() }),
            Some(("/fallback", async { Ok(vec![4, 5]) })),
        )
        .await;

        assert_eq!(items, vec![4, 5]);
    }

    #[tokio::test]
    async fn both_attempts_failing_degrades_to_empty() {
        let items = first_ok(
            ("/primary", async { failure() }),
            Some(("/fallback", async { failure() })),
        )
        .await;
        assert_eq!(items, Vec::<u32>::new());

        let items = first_ok(("/primary", async { failure() }), None::<(&str, Attempt)>).await;
        assert_eq!(items, Vec::<u32>::new());
    }

    #[test]
    fn bare_arrays_pass_through() {
        let listing: Listing<u32> = serde_json::from_str("[1, 2, 3]").unwrap();
        assert_eq!(listing.into_items(), vec![1, 2, 3]);
    }

    #[test]
    fn wrapped_items_are_unwrapped() {
        let listing: Listing<u32> = serde_json::from_str(r#"{"items": [4, 5], "total": 2}"#).unwrap();
        assert_eq!(listing.into_items(), vec![4, 5]);
    }

    #[test]
    fn null_or_absent_items_normalize_to_empty() {
        let listing: Listing<u32> = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert_eq!(listing.into_items(), Vec::<u32>::new());

        let listing: Listing<u32> = serde_json::from_str(r#"{"total": 0}"#).unwrap();
        assert_eq!(listing.into_items(), Vec::<u32>::new());
    }
}
