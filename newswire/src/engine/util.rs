use std::time::Duration;

use newswire_types::NewswireError;

/// Join a collection of tasks and apply an optional request-level deadline.
///
/// Wraps `futures::future::join_all(tasks)` with `tokio::time::timeout`.
///
/// # Errors
/// Returns `NewswireError::RequestTimeout` if `deadline` elapses before all
/// tasks complete.
pub async fn join_with_deadline<I, F, T>(
    tasks: I,
    deadline: Option<Duration>,
) -> Result<Vec<T>, NewswireError>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    let joined = futures::future::join_all(tasks);
    match deadline {
        Some(d) => tokio::time::timeout(d, joined)
            .await
            .map_err(|_| NewswireError::RequestTimeout),
        None => Ok(joined.await),
    }
}

/// Collapse a set of per-source errors into a uniform outcome.
///
/// Rules:
/// - If `attempted_any` is false → `InvalidArg` (nothing was eligible).
/// - If all errors are `SourceTimeout` → `RequestTimeout`.
/// - Else → `AllSourcesFailed(errors)`.
#[must_use]
pub fn collapse_errors(attempted_any: bool, errors: Vec<NewswireError>) -> NewswireError {
    if !attempted_any {
        return NewswireError::InvalidArg("no eligible sources for the request".to_string());
    }
    if !errors.is_empty()
        && errors
            .iter()
            .all(|e| matches!(e, NewswireError::SourceTimeout { .. }))
    {
        return NewswireError::RequestTimeout;
    }
    NewswireError::AllSourcesFailed(errors)
}
