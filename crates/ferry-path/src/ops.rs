//! Path capability trait.
//!
//! Every backend driver implements [`PathOps`]. The engine only ever holds
//! `Box<dyn PathOps>` and never asks which driver it got; capabilities a
//! backend cannot provide are declined with [`PathError::Unsupported`].
//!
//! Calls are blocking and an entry belongs to one worker at a time.

use std::fmt;
use std::time::SystemTime;

use tracing::{trace, warn};

use crate::entry::{Entry, EntryFlags};
use crate::error::PathResult;
use crate::types::{AccessFlags, AccessMode, Backend, OpenFlags, SetTimes, StatRecord};

/// Backend-agnostic capability set for one path entry.
pub trait PathOps: Send + fmt::Debug {
    // ========================================================================
    // Identity
    // ========================================================================

    /// The backend this driver talks to.
    fn backend(&self) -> Backend;

    /// Shared entry state.
    fn entry(&self) -> &Entry;

    fn entry_mut(&mut self) -> &mut Entry;

    /// The path as given, prefix included.
    fn path(&self) -> &str {
        self.entry().path()
    }

    // ========================================================================
    // Stat
    // ========================================================================

    /// Run the backend stat without touching the cache.
    fn stat_uncached(&mut self, follow_links: bool) -> PathResult<StatRecord>;

    /// Stat the entry, reusing the cached record when it is valid and was
    /// gathered with the same link policy.
    ///
    /// A failed stat is not cached; the next call retries.
    fn stat(&mut self, follow_links: bool) -> PathResult<StatRecord> {
        let entry = self.entry();
        if let Some(cached) = entry.cached_stat() {
            if entry.flags().contains(EntryFlags::STAT_FOLLOWED) == follow_links {
                let cached = *cached;
                return self.entry_mut().record("stat", Ok(cached));
            }
        }

        let result = self.stat_uncached(follow_links);
        let entry = self.entry_mut();
        match &result {
            Ok(stat) => {
                trace!(path = %entry.path(), follow_links, "stat refreshed");
                entry.cache_stat(*stat, follow_links);
            }
            Err(_) => entry.stat_failed(),
        }
        entry.record("stat", result)
    }

    /// Stat with the entry's own link policy.
    fn stat_default(&mut self) -> PathResult<StatRecord> {
        let follow = self.entry().follows_links();
        self.stat(follow)
    }

    /// Switch convenience queries to link-following stat.
    fn follow(&mut self) {
        let entry = self.entry_mut();
        entry.set(EntryFlags::FOLLOW);
        entry.invalidate_stat();
    }

    /// Returns true if the backend object exists.
    fn exists(&mut self) -> bool {
        self.stat_default().is_ok()
    }

    fn is_dir(&mut self) -> bool {
        self.stat_default().is_ok_and(|s| s.is_dir())
    }

    /// Returns true if the entry itself is a symbolic link.
    fn is_link(&mut self) -> bool {
        self.stat(false).is_ok_and(|s| s.is_symlink())
    }

    fn size(&mut self) -> PathResult<u64> {
        self.stat_default().map(|s| s.size)
    }

    fn mtime(&mut self) -> PathResult<SystemTime> {
        self.stat_default().map(|s| s.mtime)
    }

    /// Returns true if both entries name the same backend object.
    ///
    /// Both sides are re-stat'ed; a stale cache never answers this.
    fn identical(&mut self, other: &mut dyn PathOps) -> PathResult<bool> {
        if self.backend() != other.backend() {
            return Ok(false);
        }
        self.entry_mut().invalidate_stat();
        other.entry_mut().invalidate_stat();
        let mine = self.stat_default()?;
        let theirs = other.stat_default()?;
        Ok(mine.dev == theirs.dev && mine.ino == theirs.ino)
    }

    // ========================================================================
    // Access and resources
    // ========================================================================

    /// Permission probe. An empty mode checks existence.
    fn access(&mut self, mode: AccessMode) -> PathResult<()>;

    /// `faccessat`-style probe relative to the working directory.
    fn access_at(&mut self, mode: AccessMode, flags: AccessFlags) -> PathResult<()>;

    /// Open the file resource. Fails if one is already open.
    fn open(&mut self, flags: OpenFlags, mode: u32) -> PathResult<()>;

    /// Close the file resource.
    fn close(&mut self) -> PathResult<()>;

    fn open_dir(&mut self) -> PathResult<()>;

    fn close_dir(&mut self) -> PathResult<()>;

    /// Next name from the open directory; `Ok(None)` at the end.
    fn read_dir_entry(&mut self) -> PathResult<Option<String>>;

    /// Positional read on the open file.
    fn read(&mut self, buf: &mut [u8], offset: u64) -> PathResult<usize>;

    /// Positional write on the open file.
    fn write(&mut self, buf: &[u8], offset: u64) -> PathResult<usize>;

    // ========================================================================
    // Namespace and metadata
    // ========================================================================

    fn mkdir(&mut self, mode: u32) -> PathResult<()>;

    /// Remove the entry from the backend.
    fn remove(&mut self) -> PathResult<()> {
        self.unlink()
    }

    fn unlink(&mut self) -> PathResult<()>;

    /// Create this entry as a symlink pointing at `target`.
    fn symlink(&mut self, target: &str) -> PathResult<()>;

    /// Copy the link target into `buf`, truncating to fit.
    ///
    /// No terminator is written; the returned count is the only length.
    fn read_link(&mut self, buf: &mut [u8]) -> PathResult<usize>;

    /// Change ownership of the entry itself (links are not followed).
    fn chown(&mut self, uid: u32, gid: u32) -> PathResult<()>;

    fn chmod(&mut self, mode: u32) -> PathResult<()>;

    fn set_times(&mut self, times: SetTimes) -> PathResult<()>;

    /// Resolved path, re-prefixed so it dispatches to the same backend.
    fn canonical_path(&mut self) -> PathResult<String>;

    /// Returns true if many sources may be written into one destination
    /// of this backend concurrently.
    fn supports_fan_in(&self) -> bool {
        false
    }

    /// Human-readable form of the last recorded status.
    fn strerror(&self) -> String {
        self.entry().status().describe()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release any open file or directory resource. Safe to call twice.
    ///
    /// The default goes by the entry flags; drivers that own handles
    /// override it to drop them regardless.
    fn finalize(&mut self) {
        let flags = self.entry().flags();
        if flags.contains(EntryFlags::OPEN) {
            if let Err(e) = self.close() {
                warn!(path = %self.path(), error = %e, "failed to close file during finalize");
            }
            self.entry_mut().unset(EntryFlags::OPEN);
        }
        if flags.contains(EntryFlags::OPEN_DIR) {
            if let Err(e) = self.close_dir() {
                warn!(path = %self.path(), error = %e, "failed to close directory during finalize");
            }
            self.entry_mut().unset(EntryFlags::OPEN_DIR);
        }
    }

    /// Finalize and take on a new identity, for pool reuse.
    fn reset(&mut self, path: &str) {
        self.finalize();
        self.entry_mut().reset(path);
    }
}
