//! Dedicated drill-down worker pool
//!
//! Each stacked call builds its own bounded pool and drops it when the call
//! returns, on success or failure. Worker threads never outlive the call and
//! drill-down work never lands on the global rayon pool.

use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::debug;

use crate::error::{Error, Result};

/// Scoped worker pool for one stacked call
pub struct StackPool {
    pool: ThreadPool,
    label: String,
    created: Instant,
}

impl StackPool {
    /// Pool with `threads` workers (at least one) named `<label>-stack-<n>`
    pub fn new(label: &str, threads: usize) -> Result<Self> {
        let prefix = format!("{}-stack", label);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(move |i| format!("{}-{}", prefix, i))
            .build()
            .map_err(|e| Error::WorkerPool(e.to_string()))?;
        debug!(label, threads = pool.current_num_threads(), "Stack pool created");

        Ok(Self {
            pool,
            label: label.to_string(),
            created: Instant::now(),
        })
    }

    /// Worker count
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Apply `f` to every item on the pool; results keep the input order
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        self.pool.install(|| items.par_iter().map(f).collect())
    }
}

impl Drop for StackPool {
    fn drop(&mut self) {
        debug!(
            label = %self.label,
            elapsed_ms = self.created.elapsed().as_millis() as u64,
            "Stack pool released"
        );
    }
}
