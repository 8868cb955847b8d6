//! Thin syscall wrappers std does not cover.

use std::io;
use std::time::{SystemTime, UNIX_EPOCH};

use rustix::fs::{Access, AtFlags, CWD, Timespec, Timestamps};

use crate::types::{AccessFlags, AccessMode, SetTimes};

fn access_bits(mode: AccessMode) -> Access {
    let mut access = Access::EXISTS;
    if mode.contains(AccessMode::READ) {
        access |= Access::READ_OK;
    }
    if mode.contains(AccessMode::WRITE) {
        access |= Access::WRITE_OK;
    }
    if mode.contains(AccessMode::EXECUTE) {
        access |= Access::EXEC_OK;
    }
    access
}

/// `access(2)`.
pub(crate) fn access(path: &str, mode: AccessMode) -> io::Result<()> {
    rustix::fs::access(path, access_bits(mode))?;
    Ok(())
}

/// `faccessat(AT_FDCWD, ...)`.
pub(crate) fn access_at(path: &str, mode: AccessMode, flags: AccessFlags) -> io::Result<()> {
    let mut at = AtFlags::empty();
    if flags.contains(AccessFlags::EFFECTIVE_IDS) {
        at |= AtFlags::EACCESS;
    }
    if flags.contains(AccessFlags::NO_FOLLOW) {
        at |= AtFlags::SYMLINK_NOFOLLOW;
    }
    rustix::fs::accessat(CWD, path, access_bits(mode), at)?;
    Ok(())
}

fn timespec(t: SystemTime) -> Timespec {
    let (tv_sec, tv_nsec) = match t.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs() as i64, i64::from(d.subsec_nanos())),
        Err(before) => {
            let d = before.duration();
            let secs = -(d.as_secs() as i64);
            match i64::from(d.subsec_nanos()) {
                0 => (secs, 0),
                nanos => (secs - 1, 1_000_000_000 - nanos),
            }
        }
    };
    Timespec {
        tv_sec,
        tv_nsec: tv_nsec as _,
    }
}

/// `utimensat(AT_FDCWD, ...)`.
pub(crate) fn set_times(path: &str, times: &SetTimes) -> io::Result<()> {
    let stamps = Timestamps {
        last_access: timespec(times.accessed),
        last_modification: timespec(times.modified),
    };
    let flags = if times.follow_links {
        AtFlags::empty()
    } else {
        AtFlags::SYMLINK_NOFOLLOW
    };
    rustix::fs::utimensat(CWD, path, &stamps, flags)?;
    Ok(())
}
