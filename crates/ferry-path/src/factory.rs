//! Entry pool and prefix dispatch.
//!
//! [`PathFactory`] is the only way the engine obtains entries. It picks the
//! driver from the path's prefix and recycles released instances per
//! backend, so a long scan does not allocate one driver per path.

use std::collections::HashMap;

use tracing::debug;

use crate::backends::{ListPath, NullPath, PosixPath};
use crate::config::PathConfig;
use crate::ops::PathOps;
use crate::types::Backend;

/// Pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Entries handed out.
    pub acquired: u64,
    /// Acquisitions served from a free list.
    pub recycled: u64,
    /// Entries returned to a free list.
    pub released: u64,
    /// Released entries dropped because the free list was full.
    pub dropped: u64,
}

/// Creates, recycles and dispatches path entries.
///
/// Not reentrant; share it through [`Shared`](crate::Shared) if several
/// threads need one pool.
#[derive(Debug, Default)]
pub struct PathFactory {
    config: PathConfig,
    free: HashMap<Backend, Vec<Box<dyn PathOps>>>,
    stats: PoolStats,
}

impl PathFactory {
    pub fn new(config: PathConfig) -> Self {
        Self {
            config,
            free: HashMap::new(),
            stats: PoolStats::default(),
        }
    }

    pub fn config(&self) -> &PathConfig {
        &self.config
    }

    /// The backend `path` dispatches to under this factory's config.
    pub fn route(&self, path: &str) -> Backend {
        match Backend::detect(path) {
            Backend::Null if !self.config.null_device => Backend::Posix,
            backend => backend,
        }
    }

    fn construct(backend: Backend, path: &str) -> Box<dyn PathOps> {
        match backend {
            Backend::Posix => Box::new(PosixPath::new(path)),
            Backend::List => Box::new(ListPath::new(path)),
            Backend::Null => Box::new(NullPath::new(path)),
        }
    }

    /// Get an entry for `path`, reusing a pooled driver when one is idle.
    pub fn acquire(&mut self, path: &str) -> Box<dyn PathOps> {
        let backend = self.route(path);
        let mut entry = match self.free.get_mut(&backend).and_then(Vec::pop) {
            Some(mut pooled) => {
                pooled.reset(path);
                self.stats.recycled += 1;
                debug!(path, %backend, "recycled pooled entry");
                pooled
            }
            None => {
                debug!(path, %backend, "constructed entry");
                Self::construct(backend, path)
            }
        };
        if self.config.follow_links {
            entry.follow();
        }
        self.stats.acquired += 1;
        entry
    }

    /// Return an entry to the pool. Open resources are released first.
    pub fn release(&mut self, mut entry: Box<dyn PathOps>) {
        entry.finalize();
        let backend = entry.backend();
        let idle = self.free.entry(backend).or_default();
        if idle.len() >= self.config.max_idle_per_backend {
            self.stats.dropped += 1;
            debug!(path = %entry.path(), %backend, "pool full, dropping entry");
            return;
        }
        idle.push(entry);
        self.stats.released += 1;
    }

    /// Entry for `entry.path() + suffix`, which may use another backend.
    pub fn append(&mut self, entry: &dyn PathOps, suffix: &str) -> Box<dyn PathOps> {
        let path = format!("{}{}", entry.path(), suffix);
        self.acquire(&path)
    }

    /// Number of idle pooled entries for `backend`.
    pub fn idle(&self, backend: Backend) -> usize {
        self.free.get(&backend).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
