//! First-success-wins evaluation of an ordered strategy list.

use crate::Result;
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Winning strategy index and its output.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit<T> {
    pub index: usize,
    pub value: T,
}

/// Try `strategies` in order and return the first `Ok(Some(_))`.
///
/// Earlier strategies are assumed more specific than later ones; there is no
/// scoring or merging. A strategy that errors is logged and skipped. If every
/// strategy errored and none produced a clean miss, the last error is returned,
/// which is how a dead browser surfaces instead of looking like "nothing found".
pub async fn first_success<'a, S, T, F, Fut>(
    label: &str,
    strategies: &'a [S],
    mut attempt: F,
) -> Result<Option<Hit<T>>>
where
    S: fmt::Display,
    F: FnMut(usize, &'a S) -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let mut missed = false;
    let mut last_error = None;

    for (index, strategy) in strategies.iter().enumerate() {
        match attempt(index, strategy).await {
            Ok(Some(value)) => {
                debug!("{}: strategy {} ({}) matched", label, index + 1, strategy);
                return Ok(Some(Hit { index, value }));
            }
            Ok(None) => {
                debug!("{}: strategy {} ({}) missed", label, index + 1, strategy);
                missed = true;
            }
            Err(e) => {
                debug!("{}: strategy {} ({}) failed: {}", label, index + 1, strategy, e);
                last_error = Some(e);
            }
        }
    }

    match last_error {
        Some(e) if !missed => Err(e),
        _ => Ok(None),
    }
}
