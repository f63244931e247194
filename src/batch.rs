//! Bounded execution of composition jobs.
//!
//! A composition holds its decoded chapters, the music bed and the mix in
//! memory until it is written, so only a few may be in flight at once.

use futures::{stream, Stream, StreamExt};
use std::num::NonZeroUsize;
use tokio::task::JoinError;

/// One job per available core, at least one
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Runs `jobs` on the blocking pool, at most `limit` at a time.
///
/// Jobs are only spawned once a slot frees up. Results arrive in completion order.
pub fn run_blocking<I, F, T>(jobs: I, limit: usize) -> impl Stream<Item = Result<T, JoinError>>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    stream::iter(jobs)
        .map(tokio::task::spawn_blocking)
        .buffer_unordered(limit.max(1))
}
