//! Race-safe cache-by-existence for deterministic destination paths.
//!
//! Every artifact in the pipeline is addressed purely by its output path.
//! With tuples running in parallel, the bare existence-check-then-create
//! pattern would race, so all creations funnel through a per-destination
//! lock: acquire the path's lock, re-check existence, produce.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

/// Whether an artifact was already on disk or had to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Destination already existed; the producer was not run.
    Hit,
    /// Destination was produced by this call.
    Created,
}

/// Registry of per-destination-path locks.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

/// Acquire a mutex, recovering from poisoning. A tuple that panicked while
/// holding a path lock must not take its sibling tuples down with it; the
/// guarded state is just the existence check, which stays valid.
pub(crate) fn acquire<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl PathLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding one destination path.
    pub fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = acquire(&self.locks);
        locks.entry(path.to_path_buf()).or_default().clone()
    }

    /// Create-if-absent: run `produce` only when `dest` does not exist yet,
    /// holding the path's lock throughout. The parent directory is created
    /// on demand.
    pub fn ensure(
        &self,
        dest: &Path,
        produce: impl FnOnce() -> Result<()>,
    ) -> Result<CacheOutcome> {
        let lock = self.lock_for(dest);
        let _guard = acquire(&lock);

        if dest.is_file() {
            return Ok(CacheOutcome::Hit);
        }
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        produce()?;
        Ok(CacheOutcome::Created)
    }
}
