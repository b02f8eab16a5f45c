//! Strictly sequential async folding.
//!
//! Mutations of deployment state for one asset/environment must never overlap:
//! step N starts only after step N-1 has resolved.

use std::future::Future;

/// Fold `items` through `step`, awaiting each step before starting the next.
pub async fn fold_sequential<I, A, F, Fut>(items: I, init: A, mut step: F) -> A
where
    I: IntoIterator,
    F: FnMut(A, I::Item) -> Fut,
    Fut: Future<Output = A>,
{
    let mut acc = init;
    for item in items {
        acc = step(acc, item).await;
    }
    acc
}
