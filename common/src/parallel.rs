//! Concurrency-limited, cancellable parallel mapping.
//!
//! Items are processed on the rayon pool in batches of at most
//! `max_concurrent`, so memory and IO pressure stay bounded. Results keep the
//! input order: each item's output lands in the slot of its index.

use rayon::prelude::*;

use crate::CancelFlag;

/// Outcome of a batched map that may be cut short.
#[derive(Debug, PartialEq, Eq)]
pub enum BatchError<E> {
    /// The closure failed for some item; later batches were not started.
    Failed(E),
    /// The cancel flag was raised between batches.
    Cancelled,
}

/// Maps `f(index, item)` over `items` in parallel with at most
/// `max_concurrent` items in flight.
///
/// The cancel flag is checked before each batch. The first error in a batch
/// stops the run; items in the same batch may still have been processed.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn try_par_map_batched<T, R, E, F>(
    items: &[T],
    max_concurrent: usize,
    cancel: &CancelFlag,
    f: F,
) -> Result<Vec<R>, BatchError<E>>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(usize, &T) -> Result<R, E> + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    let mut results = Vec::with_capacity(items.len());
    for (batch_idx, batch) in items.chunks(max_concurrent).enumerate() {
        if cancel.is_cancelled() {
            return Err(BatchError::Cancelled);
        }
        let base = batch_idx * max_concurrent;
        let batch_results: Result<Vec<R>, E> = batch
            .par_iter()
            .enumerate()
            .map(|(i, item)| f(base + i, item))
            .collect();
        results.extend(batch_results.map_err(BatchError::Failed)?);
    }
    Ok(results)
}
