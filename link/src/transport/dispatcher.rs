//! Bounded fan-out with first-error-wins semantics.

use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{debug, warn};
use std::collections::BTreeSet;
use std::future::Future;

use crate::error::Result;

/// Run `units` with at most `concurrency` of them in flight, returning their
/// outputs in input order.
///
/// Units are pulled from the iterator only when a slot frees up, so nothing a
/// unit does (opening streams included) happens before it is started. The
/// first failing unit ends the batch: every other in-flight unit is dropped,
/// which cancels its request, and the error is returned. A `concurrency` of
/// zero is treated as one.
pub async fn dispatch<I, Fut, T>(units: I, concurrency: usize) -> Result<Vec<T>>
where
    I: IntoIterator<Item = Fut>,
    Fut: Future<Output = Result<T>>,
{
    let ceiling = concurrency.max(1);
    let mut pending = units.into_iter().enumerate();
    let mut in_flight = FuturesUnordered::new();
    let mut slots: Vec<Option<T>> = Vec::new();
    let mut running = BTreeSet::new();

    for (index, unit) in pending.by_ref().take(ceiling) {
        running.insert(index);
        in_flight.push(indexed(index, unit));
    }

    while let Some((index, outcome)) = in_flight.next().await {
        running.remove(&index);
        match outcome {
            Ok(value) => {
                if slots.len() <= index {
                    slots.resize_with(index + 1, || None);
                }
                slots[index] = Some(value);
            }
            Err(err) => {
                warn!(
                    "[CH_DISPATCH] Unit #{} failed, cancelling {} in-flight unit(s): {}",
                    index,
                    in_flight.len(),
                    err
                );
                if !running.is_empty() {
                    debug!("[CH_DISPATCH] Cancelled unit(s) {:?}", running);
                }
                return Err(err);
            }
        }

        if let Some((index, unit)) = pending.next() {
            running.insert(index);
            in_flight.push(indexed(index, unit));
        }
    }

    debug!(
        "[CH_DISPATCH] Completed {} unit(s) with concurrency {}",
        slots.len(),
        ceiling
    );
    // Every slot is filled once the loop drains without an error.
    Ok(slots.into_iter().flatten().collect())
}

async fn indexed<Fut, T>(index: usize, unit: Fut) -> (usize, Result<T>)
where
    Fut: Future<Output = Result<T>>,
{
    (index, unit.await)
}
