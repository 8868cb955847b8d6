//! Per-entry state shared by every driver.
//!
//! An [`Entry`] is the identity path plus everything a driver caches about
//! it: the last stat record, state flags, and the status of the last
//! capability call.

use std::fmt;
use std::io;

use tracing::trace;

use crate::error::{PathError, PathResult};
use crate::types::{Backend, StatRecord};

bitflags::bitflags! {
    /// Entry state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u16 {
        /// A stat was attempted since the cache was last invalidated.
        const STAT_CACHED = 1 << 0;
        /// The cached stat record is usable.
        const STAT_OK = 1 << 1;
        /// Convenience queries stat through symlinks.
        const FOLLOW = 1 << 2;
        /// The cached record came from a link-following stat.
        const STAT_FOLLOWED = 1 << 3;
        /// A file resource is open.
        const OPEN = 1 << 4;
        /// A directory resource is open.
        const OPEN_DIR = 1 << 5;
    }
}

/// Outcome class of the last capability call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    Ok,
    Unsupported,
    BackendFailure,
    NotFound,
    InvalidState,
    InvalidPath,
}

/// Advisory record of the last capability call on an entry.
///
/// Callers check each call's `Result`; this is for logging and retry
/// policy after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub kind: StatusKind,
    /// Capability that produced this status ("" before any call).
    pub op: &'static str,
    /// Return code: 0 on success, -1 on failure.
    pub rc: i32,
    /// OS error code, 0 on success.
    pub errno: i32,
}

impl Status {
    /// Status of a successful call.
    pub fn ok(op: &'static str) -> Self {
        Self {
            kind: StatusKind::Ok,
            op,
            rc: 0,
            errno: 0,
        }
    }

    /// Returns true if the last call succeeded.
    pub fn is_ok(&self) -> bool {
        self.kind == StatusKind::Ok
    }

    /// Human-readable rendering, strerror style.
    pub fn describe(&self) -> String {
        match self.kind {
            StatusKind::Ok => "success".to_string(),
            StatusKind::Unsupported => format!("{}: not supported by this backend", self.op),
            _ => format!("{}: {}", self.op, io::Error::from_raw_os_error(self.errno)),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// One logical filesystem object, independent of backend.
#[derive(Debug, Clone, Default)]
pub struct Entry {
    path: String,
    stat: Option<StatRecord>,
    flags: EntryFlags,
    status: Status,
}

impl Entry {
    /// Create an entry for `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Clear all cached state and take on a new identity.
    ///
    /// The path buffer is reused.
    pub(crate) fn reset(&mut self, path: &str) {
        self.path.clear();
        self.path.push_str(path);
        self.stat = None;
        self.flags = EntryFlags::empty();
        self.status = Status::default();
    }

    /// The path as given, prefix included.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn flags(&self) -> EntryFlags {
        self.flags
    }

    /// Status of the last capability call.
    pub fn status(&self) -> Status {
        self.status
    }

    /// The cached stat record, if a stat succeeded since the last
    /// invalidation.
    pub fn cached_stat(&self) -> Option<&StatRecord> {
        if self
            .flags
            .contains(EntryFlags::STAT_CACHED | EntryFlags::STAT_OK)
        {
            self.stat.as_ref()
        } else {
            None
        }
    }

    /// Returns true if convenience queries follow symlinks.
    pub fn follows_links(&self) -> bool {
        self.flags.contains(EntryFlags::FOLLOW)
    }

    /// Returns true if a file or directory resource is open.
    pub fn is_open(&self) -> bool {
        self.flags
            .intersects(EntryFlags::OPEN | EntryFlags::OPEN_DIR)
    }

    pub(crate) fn set(&mut self, flag: EntryFlags) {
        self.flags.insert(flag);
    }

    pub(crate) fn unset(&mut self, flag: EntryFlags) {
        self.flags.remove(flag);
    }

    /// Store a fresh stat record.
    pub(crate) fn cache_stat(&mut self, stat: StatRecord, followed: bool) {
        self.stat = Some(stat);
        self.flags.insert(EntryFlags::STAT_CACHED | EntryFlags::STAT_OK);
        self.flags.set(EntryFlags::STAT_FOLLOWED, followed);
    }

    /// Note a failed stat; the previous record is no longer trusted.
    pub(crate) fn stat_failed(&mut self) {
        self.flags.insert(EntryFlags::STAT_CACHED);
        self.flags
            .remove(EntryFlags::STAT_OK | EntryFlags::STAT_FOLLOWED);
    }

    /// Mark the cached record stale instead of refreshing it.
    pub fn invalidate_stat(&mut self) {
        self.flags.remove(
            EntryFlags::STAT_CACHED | EntryFlags::STAT_OK | EntryFlags::STAT_FOLLOWED,
        );
    }

    /// Record the outcome of a capability call and pass it through.
    pub fn record<T>(&mut self, op: &'static str, result: PathResult<T>) -> PathResult<T> {
        self.status = match &result {
            Ok(_) => Status::ok(op),
            Err(e) => e.status(op),
        };
        result
    }

    /// Like [`Entry::record`], but a success also marks the cached stat
    /// stale.
    pub fn record_mutation<T>(
        &mut self,
        op: &'static str,
        result: PathResult<T>,
    ) -> PathResult<T> {
        if result.is_ok() {
            self.invalidate_stat();
        }
        self.record(op, result)
    }

    /// Decline a capability this backend does not implement.
    ///
    /// Only the status changes; flags and cached stat are untouched.
    pub fn decline<T>(&mut self, op: &'static str, backend: Backend) -> PathResult<T> {
        trace!(path = %self.path, op, %backend, "capability declined");
        self.record(op, Err(PathError::unsupported(op, backend)))
    }

    /// Fail a call made in the wrong state.
    pub fn reject<T>(&mut self, op: &'static str, reason: &'static str) -> PathResult<T> {
        let err = PathError::invalid_state(op, self.path.clone(), reason);
        self.record(op, Err(err))
    }
}
