//! Attempt an operation, fall back once to safe defaults on a recognised
//! failure, then give up.
//!
//! Used by the log writer: a save that fails because the owning add-on is
//! unknown is retried once under the sentinel owner. Any other failure, or a
//! failure of the retry, is handed back to the caller as [`Outcome::GaveUp`]
//! so it can be reported without being propagated.

use std::future::Future;

/// Result of [`attempt_with_fallback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T, E> {
    /// The first attempt succeeded.
    Saved(T),
    /// The first attempt failed with a recoverable error and the retry with
    /// fallback state succeeded.
    SavedWithFallback(T),
    /// Nothing was saved. Carries the last error seen.
    GaveUp(E),
}

/// Run `op` with `state`. If it fails and `recover` maps the error and the
/// original state to fallback state, run `op` exactly once more with that
/// state.
///
/// `recover` returning `None` means the error is not one we fall back on.
pub async fn attempt_with_fallback<S, T, E, Op, Fut, Recover>(
    state: S,
    mut op: Op,
    recover: Recover,
) -> Outcome<T, E>
where
    S: Clone,
    Op: FnMut(S) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Recover: FnOnce(&E, S) -> Option<S>,
{
    let err = match op(state.clone()).await {
        Ok(value) => return Outcome::Saved(value),
        Err(err) => err,
    };

    let Some(fallback) = recover(&err, state) else {
        return Outcome::GaveUp(err);
    };

    match op(fallback).await {
        Ok(value) => Outcome::SavedWithFallback(value),
        Err(retry_err) => Outcome::GaveUp(retry_err),
    }
}
