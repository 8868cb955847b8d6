//! `/dev/null` tree driver.
//!
//! Any path under `/dev/null` is accepted as a destination. Writes, creates
//! and metadata changes succeed without touching storage, reads return
//! zeros. Useful for measuring read throughput of a source tree.

use std::fs;
use std::io;

use rustix::io::Errno;

use crate::entry::{Entry, EntryFlags};
use crate::error::{PathError, PathResult};
use crate::ops::PathOps;
use crate::types::{AccessFlags, AccessMode, Backend, OpenFlags, SetTimes, StatRecord};

/// Driver for paths under `/dev/null`.
#[derive(Debug)]
pub struct NullPath {
    entry: Entry,
    is_dir: bool,
}

impl NullPath {
    pub fn new(path: impl Into<String>) -> Self {
        let entry = Entry::new(path);
        let is_dir = entry.path().ends_with('/');
        Self { entry, is_dir }
    }

    fn probe(&mut self, op: &'static str, mode: AccessMode) -> PathResult<()> {
        let result = if AccessMode::READ.contains(mode) {
            Ok(())
        } else {
            Err(PathError::backend(
                op,
                self.entry.path(),
                io::Error::from_raw_os_error(Errno::ACCESS.raw_os_error()),
            ))
        };
        self.entry.record(op, result)
    }

    fn require(&mut self, op: &'static str, flag: EntryFlags) -> PathResult<()> {
        if self.entry.flags().contains(flag) {
            Ok(())
        } else {
            self.entry.reject(op, "not open")
        }
    }
}

impl PathOps for NullPath {
    fn backend(&self) -> Backend {
        Backend::Null
    }

    fn entry(&self) -> &Entry {
        &self.entry
    }

    fn entry_mut(&mut self) -> &mut Entry {
        &mut self.entry
    }

    fn stat_uncached(&mut self, _follow_links: bool) -> PathResult<StatRecord> {
        let stand_in = if self.is_dir { "/dev" } else { Backend::NULL_DEVICE };
        fs::metadata(stand_in)
            .map(|m| StatRecord::from_metadata(&m))
            .map_err(|e| PathError::backend("stat", self.entry.path(), e))
    }

    fn access(&mut self, mode: AccessMode) -> PathResult<()> {
        self.probe("access", mode)
    }

    fn access_at(&mut self, mode: AccessMode, _flags: AccessFlags) -> PathResult<()> {
        self.probe("access_at", mode)
    }

    fn open(&mut self, _flags: OpenFlags, _mode: u32) -> PathResult<()> {
        if self.entry.flags().contains(EntryFlags::OPEN) {
            return self.entry.reject("open", "file already open");
        }
        self.entry.set(EntryFlags::OPEN);
        self.entry.record("open", Ok(()))
    }

    fn close(&mut self) -> PathResult<()> {
        self.require("close", EntryFlags::OPEN)?;
        self.entry.unset(EntryFlags::OPEN);
        self.entry.record_mutation("close", Ok(()))
    }

    fn open_dir(&mut self) -> PathResult<()> {
        if self.entry.flags().contains(EntryFlags::OPEN_DIR) {
            return self.entry.reject("open_dir", "directory already open");
        }
        self.entry.set(EntryFlags::OPEN_DIR);
        self.entry.record("open_dir", Ok(()))
    }

    fn close_dir(&mut self) -> PathResult<()> {
        self.require("close_dir", EntryFlags::OPEN_DIR)?;
        self.entry.unset(EntryFlags::OPEN_DIR);
        self.entry.record_mutation("close_dir", Ok(()))
    }

    fn read_dir_entry(&mut self) -> PathResult<Option<String>> {
        self.require("read_dir_entry", EntryFlags::OPEN_DIR)?;
        self.entry.record("read_dir_entry", Ok(None))
    }

    fn read(&mut self, buf: &mut [u8], _offset: u64) -> PathResult<usize> {
        self.require("read", EntryFlags::OPEN)?;
        buf.fill(0);
        self.entry.record("read", Ok(buf.len()))
    }

    fn write(&mut self, buf: &[u8], _offset: u64) -> PathResult<usize> {
        self.require("write", EntryFlags::OPEN)?;
        self.entry.record("write", Ok(buf.len()))
    }

    fn mkdir(&mut self, _mode: u32) -> PathResult<()> {
        self.is_dir = true;
        self.entry.record_mutation("mkdir", Ok(()))
    }

    fn unlink(&mut self) -> PathResult<()> {
        self.entry.record_mutation("unlink", Ok(()))
    }

    fn symlink(&mut self, _target: &str) -> PathResult<()> {
        self.entry.decline("symlink", Backend::Null)
    }

    fn read_link(&mut self, _buf: &mut [u8]) -> PathResult<usize> {
        self.entry.decline("read_link", Backend::Null)
    }

    fn chown(&mut self, _uid: u32, _gid: u32) -> PathResult<()> {
        self.entry.record_mutation("chown", Ok(()))
    }

    fn chmod(&mut self, _mode: u32) -> PathResult<()> {
        self.entry.record_mutation("chmod", Ok(()))
    }

    fn set_times(&mut self, _times: SetTimes) -> PathResult<()> {
        self.entry.record_mutation("set_times", Ok(()))
    }

    fn canonical_path(&mut self) -> PathResult<String> {
        let path = self.entry.path().to_string();
        self.entry.record("canonical_path", Ok(path))
    }

    fn supports_fan_in(&self) -> bool {
        true
    }

    fn reset(&mut self, path: &str) {
        self.finalize();
        self.entry.reset(path);
        self.is_dir = path.ends_with('/');
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_dir_stat() {
        let mut file = NullPath::new("/dev/null/out.dat");
        assert!(!file.stat(true).unwrap().is_dir());

        let mut dir = NullPath::new("/dev/null/tree/");
        assert!(dir.stat(true).unwrap().is_dir());
    }

    #[test]
    fn test_mkdir_turns_into_directory() {
        let mut p = NullPath::new("/dev/null/sub");
        assert!(!p.is_dir());
        p.mkdir(0o755).unwrap();
        assert!(p.is_dir());
    }

    #[test]
    fn test_io_is_free() {
        let mut p = NullPath::new("/dev/null/out");
        p.open(OpenFlags::create_truncate(), 0o644).unwrap();
        assert_eq!(p.write(b"discarded", 1 << 40).unwrap(), 9);

        let mut buf = [0xffu8; 16];
        assert_eq!(p.read(&mut buf, 0).unwrap(), 16);
        assert!(buf.iter().all(|&b| b == 0));
        p.close().unwrap();
        assert!(p.write(b"x", 0).is_err());
    }

    #[test]
    fn test_access_read_only() {
        let mut p = NullPath::new("/dev/null");
        p.access(AccessMode::READ).unwrap();
        assert!(p.access(AccessMode::WRITE).is_err());
        assert!(
            p.access_at(AccessMode::READ | AccessMode::EXECUTE, AccessFlags::empty())
                .is_err()
        );
    }

    #[test]
    fn test_fan_in_and_links() {
        let mut p = NullPath::new("/dev/null/x");
        assert!(p.supports_fan_in());
        assert!(p.symlink("/a").unwrap_err().is_unsupported());
        assert_eq!(p.canonical_path().unwrap(), "/dev/null/x");
    }

    #[test]
    fn test_metadata_changes_mark_stat_stale() {
        let mut p = NullPath::new("/dev/null/out");
        p.stat(true).unwrap();
        p.chmod(0o600).unwrap();
        assert!(p.entry().cached_stat().is_none());

        p.stat(true).unwrap();
        p.chown(0, 0).unwrap();
        assert!(p.entry().cached_stat().is_none());

        p.stat(true).unwrap();
        let when = std::time::UNIX_EPOCH;
        p.set_times(SetTimes::new(when, when)).unwrap();
        assert!(p.entry().cached_stat().is_none());

        p.stat(true).unwrap();
        p.unlink().unwrap();
        assert!(p.entry().cached_stat().is_none());
    }

    #[test]
    fn test_reset_recomputes_directory_state() {
        let mut p = NullPath::new("/dev/null/d/");
        p.open_dir().unwrap();
        assert_eq!(p.read_dir_entry().unwrap(), None);

        p.reset("/dev/null/f");
        assert!(!p.entry().is_open());
        assert!(!p.is_dir());
    }
}
