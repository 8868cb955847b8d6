//! Core path types.
//!
//! Backend tags, the cached stat record, and the argument types of the
//! capability interface. Drivers translate these into backend calls.

use serde::{Deserialize, Serialize};
use std::os::unix::fs::MetadataExt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use strum::{Display, EnumString};

/// Mask for the file-format bits of `st_mode`.
pub const S_IFMT: u32 = 0o170_000;
/// Directory format bits.
pub const S_IFDIR: u32 = 0o040_000;
/// Regular file format bits.
pub const S_IFREG: u32 = 0o100_000;
/// Symbolic link format bits.
pub const S_IFLNK: u32 = 0o120_000;

/// Storage backend selected by a path's prefix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Backend {
    /// Plain POSIX filesystem (no prefix).
    Posix,
    /// Manifest-driven listing, presented as a directory (`list://`).
    List,
    /// `/dev/null` tree: writes are free, reads are zeros.
    Null,
}

impl Backend {
    /// Prefix that selects the list backend.
    pub const LIST_PREFIX: &'static str = "list://";

    /// Root of the null tree.
    pub const NULL_DEVICE: &'static str = "/dev/null";

    /// Pick the backend for a path by its leading token.
    pub fn detect(path: &str) -> Self {
        if path.starts_with(Self::LIST_PREFIX) {
            Backend::List
        } else if path == Self::NULL_DEVICE
            || path
                .strip_prefix(Self::NULL_DEVICE)
                .is_some_and(|rest| rest.starts_with('/'))
        {
            Backend::Null
        } else {
            Backend::Posix
        }
    }

    /// The literal token this backend strips before making syscalls.
    pub fn prefix(&self) -> &'static str {
        match self {
            Backend::List => Self::LIST_PREFIX,
            Backend::Posix | Backend::Null => "",
        }
    }
}

/// File type enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Symbolic link.
    Symlink,
    /// Device, fifo, socket.
    Other,
}

impl FileKind {
    /// Classify the format bits of an `st_mode`.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFREG => FileKind::Regular,
            S_IFDIR => FileKind::Directory,
            S_IFLNK => FileKind::Symlink,
            _ => FileKind::Other,
        }
    }
}

/// POSIX-style stat record cached on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatRecord {
    /// File type, derived from `mode`.
    pub kind: FileKind,
    /// Full `st_mode`, format bits included.
    pub mode: u32,
    /// Size in bytes.
    pub size: u64,
    /// Last access time.
    pub atime: SystemTime,
    /// Last modification time.
    pub mtime: SystemTime,
    /// Last status change time.
    pub ctime: SystemTime,
    /// Inode number.
    pub ino: u64,
    /// Device number.
    pub dev: u64,
    /// Number of hard links.
    pub nlink: u64,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// 512-byte blocks allocated.
    pub blocks: u64,
}

impl StatRecord {
    /// Convert `std::fs::Metadata` to a stat record.
    pub fn from_metadata(meta: &std::fs::Metadata) -> Self {
        let mode = meta.mode();
        Self {
            kind: FileKind::from_mode(mode),
            mode,
            size: meta.size(),
            atime: system_time(meta.atime(), meta.atime_nsec()),
            mtime: system_time(meta.mtime(), meta.mtime_nsec()),
            ctime: system_time(meta.ctime(), meta.ctime_nsec()),
            ino: meta.ino(),
            dev: meta.dev(),
            nlink: meta.nlink(),
            uid: meta.uid(),
            gid: meta.gid(),
            blocks: meta.blocks(),
        }
    }

    /// Permission bits only.
    pub fn perm(&self) -> u32 {
        self.mode & !S_IFMT
    }

    /// Returns true if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::Regular
    }

    /// Returns true if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// Returns true if this is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

fn system_time(secs: i64, nsecs: i64) -> SystemTime {
    let nanos = Duration::from_nanos(nsecs.clamp(0, 999_999_999) as u64);
    let shifted = if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs as u64))
    } else {
        UNIX_EPOCH.checked_sub(Duration::from_secs(secs.unsigned_abs()))
    };
    shifted
        .and_then(|t| t.checked_add(nanos))
        .unwrap_or(UNIX_EPOCH)
}

/// Open file flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags {
    /// Read access requested.
    pub read: bool,
    /// Write access requested.
    pub write: bool,
    /// Append mode.
    pub append: bool,
    /// Create if not exists.
    pub create: bool,
    /// Truncate on open.
    pub truncate: bool,
    /// Exclusive create (fail if exists).
    pub exclusive: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        Self {
            read: true,
            write: false,
            append: false,
            create: false,
            truncate: false,
            exclusive: false,
        }
    }
}

impl OpenFlags {
    /// Read-only access.
    pub fn read() -> Self {
        Self::default()
    }

    /// Write access (also enables read).
    pub fn write() -> Self {
        Self {
            read: true,
            write: true,
            ..Default::default()
        }
    }

    /// Create and truncate, the usual copy destination.
    pub fn create_truncate() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            truncate: true,
            ..Default::default()
        }
    }

    /// Create exclusively (fail if exists).
    pub fn create_exclusive() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            exclusive: true,
            ..Default::default()
        }
    }

    /// Returns true if opening with these flags may change the file's
    /// metadata.
    pub fn mutates(&self) -> bool {
        self.create || self.truncate || self.exclusive
    }
}

bitflags::bitflags! {
    /// Permission probe for `access`; empty means existence only.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessMode: u8 {
        /// `R_OK`
        const READ = 1 << 0;
        /// `W_OK`
        const WRITE = 1 << 1;
        /// `X_OK`
        const EXECUTE = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Modifiers for `access_at`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AccessFlags: u8 {
        /// Check with effective rather than real ids (`AT_EACCESS`).
        const EFFECTIVE_IDS = 1 << 0;
        /// Probe the link itself (`AT_SYMLINK_NOFOLLOW`).
        const NO_FOLLOW = 1 << 1;
    }
}

/// Times for `set_times`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetTimes {
    /// New access time.
    pub accessed: SystemTime,
    /// New modification time.
    pub modified: SystemTime,
    /// Apply to the link target instead of the link.
    pub follow_links: bool,
}

impl SetTimes {
    /// Set both times without following links.
    pub fn new(accessed: SystemTime, modified: SystemTime) -> Self {
        Self {
            accessed,
            modified,
            follow_links: false,
        }
    }

    /// Copy access and modification times from a stat record.
    pub fn from_stat(stat: &StatRecord) -> Self {
        Self::new(stat.atime, stat.mtime)
    }

    /// Follow symlinks when applying.
    pub fn following(mut self) -> Self {
        self.follow_links = true;
        self
    }
}
