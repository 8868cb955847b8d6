//! Backend-agnostic path entries for a parallel tree mover.
//!
//! The engine never talks to a filesystem directly. It asks a
//! [`PathFactory`] for an entry, gets a `Box<dyn PathOps>`, and calls
//! capabilities on it. Key components:
//!
//! - [`PathOps`] - Capability trait every driver implements
//! - [`Entry`] - Identity path, cached stat, state flags, last status
//! - [`PosixPath`] - Plain POSIX paths (the default)
//! - [`ListPath`] - `list://` manifests presented as directories
//! - [`NullPath`] - `/dev/null` tree that accepts everything
//! - [`PathFactory`] - Prefix dispatch plus per-backend entry pools
//!
//! ## Design Decisions
//!
//! - **Decline, don't fake**: a capability a backend lacks returns
//!   [`PathError::Unsupported`] without a syscall, distinct from a backend
//!   failure.
//! - **Stale, not refreshed**: mutating calls mark the cached stat stale;
//!   the next query re-stats.
//! - **Single owner**: entries and factories are `Send` but unsynchronized.
//!   Cross-thread sharing goes through [`Shared`].

pub mod backends;
mod config;
mod entry;
mod error;
mod factory;
mod ops;
mod shared;
mod sys;
mod types;

pub use backends::{ListPath, NullPath, PosixPath};
pub use config::PathConfig;
pub use entry::{Entry, EntryFlags, Status, StatusKind};
pub use error::{ConfigError, PathError, PathResult};
pub use factory::{PathFactory, PoolStats};
pub use ops::PathOps;
pub use shared::Shared;
pub use types::{
    AccessFlags, AccessMode, Backend, FileKind, OpenFlags, S_IFDIR, S_IFLNK, S_IFMT, S_IFREG,
    SetTimes, StatRecord,
};
