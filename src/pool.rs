//! Bounded worker pool for per-chunk work.
//!
//! [`run_bounded`] applies a closure to every item on a dedicated Rayon pool
//! of at most `jobs` threads and returns one result per item, in input
//! order, once every item has finished.  A failing item never cancels its
//! siblings: the closure returns whatever it likes (usually a `Result`) and
//! aggregation is left to the caller.
//!
//! Without the `parallel` feature the same contract holds, executed
//! sequentially on the calling thread.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Failed to build worker pool: {0}")]
    Build(String),
}

/// Run `f` over `items` with at most `jobs` concurrent workers.
///
/// `jobs == 0` uses the Rayon default (one thread per logical CPU).
pub fn run_bounded<T, R, F>(items: Vec<T>, jobs: usize, f: F) -> Result<Vec<R>, PoolError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .thread_name(|i| format!("qrfile-worker-{i}"))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;

        Ok(pool.install(|| items.into_par_iter().map(f).collect()))
    }

    #[cfg(not(feature = "parallel"))]
    {
        let _ = jobs;
        Ok(items.into_iter().map(f).collect())
    }
}
