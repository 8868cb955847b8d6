//! Plain POSIX filesystem driver.
//!
//! The path is used as given. Handles are owned, so dropping a driver
//! closes whatever it still has open.

use std::fs::{self, File, OpenOptions, ReadDir};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};

use super::utf8;
use crate::entry::{Entry, EntryFlags};
use crate::error::{PathError, PathResult};
use crate::ops::PathOps;
use crate::sys;
use crate::types::{AccessFlags, AccessMode, Backend, OpenFlags, SetTimes, StatRecord};

/// Driver for ordinary POSIX paths.
#[derive(Debug)]
pub struct PosixPath {
    entry: Entry,
    file: Option<File>,
    dir: Option<ReadDir>,
}

impl PosixPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            entry: Entry::new(path),
            file: None,
            dir: None,
        }
    }
}

impl PathOps for PosixPath {
    fn backend(&self) -> Backend {
        Backend::Posix
    }

    fn entry(&self) -> &Entry {
        &self.entry
    }

    fn entry_mut(&mut self) -> &mut Entry {
        &mut self.entry
    }

    fn stat_uncached(&mut self, follow_links: bool) -> PathResult<StatRecord> {
        let path = self.entry.path();
        let meta = if follow_links {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        };
        meta.map(|m| StatRecord::from_metadata(&m))
            .map_err(|e| PathError::backend("stat", path, e))
    }

    fn access(&mut self, mode: AccessMode) -> PathResult<()> {
        let path = self.entry.path();
        let result = sys::access(path, mode).map_err(|e| PathError::backend("access", path, e));
        self.entry.record("access", result)
    }

    fn access_at(&mut self, mode: AccessMode, flags: AccessFlags) -> PathResult<()> {
        let path = self.entry.path();
        let result = if path.starts_with('/') {
            sys::access_at(path, mode, flags).map_err(|e| PathError::backend("access_at", path, e))
        } else {
            Err(PathError::invalid_path(path))
        };
        self.entry.record("access_at", result)
    }

    fn open(&mut self, flags: OpenFlags, mode: u32) -> PathResult<()> {
        if self.file.is_some() {
            return self.entry.reject("open", "file already open");
        }
        let path = self.entry.path();
        let result = OpenOptions::new()
            .read(flags.read)
            .write(flags.write)
            .append(flags.append)
            .create(flags.create)
            .truncate(flags.truncate)
            .create_new(flags.exclusive)
            .mode(mode)
            .open(path)
            .map_err(|e| PathError::backend("open", path, e));

        match result {
            Ok(file) => {
                self.file = Some(file);
                self.entry.set(EntryFlags::OPEN);
                if flags.mutates() {
                    self.entry.invalidate_stat();
                }
                self.entry.record("open", Ok(()))
            }
            Err(e) => self.entry.record("open", Err(e)),
        }
    }

    fn close(&mut self) -> PathResult<()> {
        if self.file.take().is_none() {
            return self.entry.reject("close", "file not open");
        }
        self.entry.unset(EntryFlags::OPEN);
        self.entry.record_mutation("close", Ok(()))
    }

    fn open_dir(&mut self) -> PathResult<()> {
        if self.dir.is_some() {
            return self.entry.reject("open_dir", "directory already open");
        }
        let path = self.entry.path();
        match fs::read_dir(path).map_err(|e| PathError::backend("open_dir", path, e)) {
            Ok(dir) => {
                self.dir = Some(dir);
                self.entry.set(EntryFlags::OPEN_DIR);
                self.entry.record("open_dir", Ok(()))
            }
            Err(e) => self.entry.record("open_dir", Err(e)),
        }
    }

    fn close_dir(&mut self) -> PathResult<()> {
        if self.dir.take().is_none() {
            return self.entry.reject("close_dir", "directory not open");
        }
        self.entry.unset(EntryFlags::OPEN_DIR);
        self.entry.record_mutation("close_dir", Ok(()))
    }

    fn read_dir_entry(&mut self) -> PathResult<Option<String>> {
        let Some(dir) = self.dir.as_mut() else {
            return self.entry.reject("read_dir_entry", "directory not open");
        };
        // std already skips "." and ".."
        let result = match dir.next() {
            None => Ok(None),
            Some(Ok(de)) => utf8(de.file_name()).map(Some),
            Some(Err(e)) => Err(PathError::backend("read_dir_entry", self.entry.path(), e)),
        };
        self.entry.record("read_dir_entry", result)
    }

    fn read(&mut self, buf: &mut [u8], offset: u64) -> PathResult<usize> {
        let Some(file) = self.file.as_ref() else {
            return self.entry.reject("read", "file not open");
        };
        let result = file
            .read_at(buf, offset)
            .map_err(|e| PathError::backend("read", self.entry.path(), e));
        self.entry.record("read", result)
    }

    fn write(&mut self, buf: &[u8], offset: u64) -> PathResult<usize> {
        let Some(file) = self.file.as_ref() else {
            return self.entry.reject("write", "file not open");
        };
        let result = file
            .write_at(buf, offset)
            .map_err(|e| PathError::backend("write", self.entry.path(), e));
        self.entry.record_mutation("write", result)
    }

    fn mkdir(&mut self, mode: u32) -> PathResult<()> {
        let path = self.entry.path();
        let result = fs::DirBuilder::new()
            .mode(mode)
            .create(path)
            .map_err(|e| PathError::backend("mkdir", path, e));
        self.entry.record_mutation("mkdir", result)
    }

    fn unlink(&mut self) -> PathResult<()> {
        let path = self.entry.path();
        let result = fs::remove_file(path).map_err(|e| PathError::backend("unlink", path, e));
        self.entry.record_mutation("unlink", result)
    }

    fn symlink(&mut self, target: &str) -> PathResult<()> {
        let path = self.entry.path();
        let result = std::os::unix::fs::symlink(target, path)
            .map_err(|e| PathError::backend("symlink", path, e));
        self.entry.record_mutation("symlink", result)
    }

    fn read_link(&mut self, buf: &mut [u8]) -> PathResult<usize> {
        let path = self.entry.path();
        let result = fs::read_link(path)
            .map(|target| {
                let bytes = target.as_os_str().as_bytes();
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                n
            })
            .map_err(|e| PathError::backend("read_link", path, e));
        self.entry.record("read_link", result)
    }

    fn chown(&mut self, uid: u32, gid: u32) -> PathResult<()> {
        let path = self.entry.path();
        let result = std::os::unix::fs::lchown(path, Some(uid), Some(gid))
            .map_err(|e| PathError::backend("chown", path, e));
        self.entry.record_mutation("chown", result)
    }

    fn chmod(&mut self, mode: u32) -> PathResult<()> {
        let path = self.entry.path();
        let result = fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| PathError::backend("chmod", path, e));
        self.entry.record_mutation("chmod", result)
    }

    fn set_times(&mut self, times: SetTimes) -> PathResult<()> {
        let path = self.entry.path();
        let result =
            sys::set_times(path, &times).map_err(|e| PathError::backend("set_times", path, e));
        self.entry.record_mutation("set_times", result)
    }

    fn canonical_path(&mut self) -> PathResult<String> {
        let path = self.entry.path();
        let result = dunce::canonicalize(path)
            .map_err(|e| PathError::backend("canonical_path", path, e))
            .and_then(|p| utf8(p.into_os_string()));
        self.entry.record("canonical_path", result)
    }

    fn finalize(&mut self) {
        // Handles are dropped whatever the flags say.
        let had_file = self.file.take().is_some();
        let had_dir = self.dir.take().is_some();
        if had_file || had_dir {
            self.entry.invalidate_stat();
        }
        self.entry.unset(EntryFlags::OPEN | EntryFlags::OPEN_DIR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::StatusKind;
    use std::ffi::OsStr;
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    fn setup() -> (TempDir, String) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().to_string_lossy().into_owned();
        (dir, root)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(format!("{root}/data.bin"));

        p.open(OpenFlags::create_truncate(), 0o644).unwrap();
        assert!(p.entry().is_open());
        assert_eq!(p.write(b"hello world", 0).unwrap(), 11);

        let mut buf = [0u8; 5];
        assert_eq!(p.read(&mut buf, 6).unwrap(), 5);
        assert_eq!(&buf, b"world");
        p.close().unwrap();

        assert_eq!(p.size().unwrap(), 11);
    }

    #[test]
    fn test_open_twice_is_invalid_state() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(format!("{root}/f"));
        p.open(OpenFlags::create_truncate(), 0o644).unwrap();
        let err = p.open(OpenFlags::read(), 0).unwrap_err();
        assert!(matches!(err, PathError::InvalidState { .. }));
        assert!(p.entry().flags().contains(EntryFlags::OPEN));
    }

    #[test]
    fn test_close_unopened() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(format!("{root}/f"));
        assert!(matches!(p.close(), Err(PathError::InvalidState { .. })));
        assert!(matches!(p.close_dir(), Err(PathError::InvalidState { .. })));
        assert_eq!(p.entry().status().kind, StatusKind::InvalidState);
    }

    #[test]
    fn test_read_dir_skips_dot_entries() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("a"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();

        let mut p = PosixPath::new(root);
        p.open_dir().unwrap();
        let mut names = Vec::new();
        while let Some(name) = p.read_dir_entry().unwrap() {
            names.push(name);
        }
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
        p.close_dir().unwrap();
        assert!(p.read_dir_entry().is_err());
    }

    #[test]
    fn test_mutation_invalidates_stat() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(format!("{root}/sub"));
        assert!(!p.exists());

        p.mkdir(0o755).unwrap();
        assert!(p.entry().cached_stat().is_none());
        assert!(p.is_dir());

        p.chmod(0o700).unwrap();
        assert!(p.entry().cached_stat().is_none());
        assert_eq!(p.stat(false).unwrap().perm(), 0o700);
    }

    #[test]
    fn test_failed_mkdir_keeps_cache() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(root);
        p.stat(false).unwrap();

        let err = p.mkdir(0o755).unwrap_err();
        assert!(matches!(err, PathError::Backend { op: "mkdir", .. }));
        assert!(p.entry().cached_stat().is_some());
        assert_eq!(p.entry().status().kind, StatusKind::BackendFailure);
    }

    #[test]
    fn test_stat_failure_is_retried() {
        let (dir, root) = setup();
        let mut p = PosixPath::new(format!("{root}/late"));
        assert!(matches!(p.stat(false), Err(PathError::NotFound(_))));

        std::fs::write(dir.path().join("late"), b"now").unwrap();
        assert_eq!(p.stat(false).unwrap().size, 3);
    }

    #[test]
    fn test_stat_cache_respects_link_policy() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("target"), b"0123456789").unwrap();
        let mut link = PosixPath::new(format!("{root}/link"));
        link.symlink("target").unwrap();

        assert!(link.stat(false).unwrap().is_symlink());
        let followed = link.stat(true).unwrap();
        assert!(followed.is_file());
        assert_eq!(followed.size, 10);
        assert!(link.is_link());
    }

    #[test]
    fn test_read_link_truncates() {
        let (_dir, root) = setup();
        let mut link = PosixPath::new(format!("{root}/link"));
        link.symlink("/some/long/target").unwrap();

        let mut full = [0u8; 64];
        let n = link.read_link(&mut full).unwrap();
        assert_eq!(&full[..n], b"/some/long/target");

        let mut short = [0u8; 5];
        assert_eq!(link.read_link(&mut short).unwrap(), 5);
        assert_eq!(&short, b"/some");
    }

    #[test]
    fn test_set_times() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let mut p = PosixPath::new(format!("{root}/f"));

        let when = UNIX_EPOCH + Duration::from_secs(1_000_000);
        p.set_times(SetTimes::new(when, when)).unwrap();
        assert_eq!(p.mtime().unwrap(), when);
    }

    #[test]
    fn test_access() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let mut p = PosixPath::new(format!("{root}/f"));
        p.access(AccessMode::READ).unwrap();
        p.access_at(AccessMode::empty(), AccessFlags::NO_FOLLOW).unwrap();

        let mut rel = PosixPath::new("relative/f");
        assert!(matches!(
            rel.access_at(AccessMode::READ, AccessFlags::empty()),
            Err(PathError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_identical_and_canonical() {
        let (dir, root) = setup();
        std::fs::create_dir(dir.path().join("d")).unwrap();
        let mut a = PosixPath::new(format!("{root}/d"));
        let mut b = PosixPath::new(format!("{root}/d/../d"));
        assert!(a.identical(&mut b).unwrap());

        let canon = b.canonical_path().unwrap();
        assert!(canon.ends_with("/d"));
        assert!(!canon.contains(".."));
    }

    #[test]
    fn test_finalize_is_idempotent() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("f"), b"x").unwrap();
        let mut p = PosixPath::new(format!("{root}/f"));
        p.open(OpenFlags::read(), 0).unwrap();
        let mut d = PosixPath::new(root);
        d.open_dir().unwrap();

        p.finalize();
        p.finalize();
        d.finalize();
        assert!(!p.entry().is_open());
        assert!(!d.entry().is_open());
        assert!(p.read(&mut [0u8; 1], 0).is_err());
    }

    #[test]
    fn test_unlink_via_remove() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("gone"), b"x").unwrap();
        let mut p = PosixPath::new(format!("{root}/gone"));
        p.remove().unwrap();
        assert!(!dir.path().join("gone").exists());
        assert!(!p.exists());
    }

    #[test]
    fn test_reset_drops_handle_when_flag_is_stale() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join("a"), b"AAAA").unwrap();
        std::fs::write(dir.path().join("b"), b"BBBB").unwrap();

        let mut p = PosixPath::new(format!("{root}/a"));
        p.open(OpenFlags::read(), 0).unwrap();
        p.entry_mut().unset(EntryFlags::OPEN);

        p.reset(&format!("{root}/b"));
        let err = p.read(&mut [0u8; 4], 0).unwrap_err();
        assert!(matches!(err, PathError::InvalidState { .. }));

        p.open(OpenFlags::read(), 0).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(p.read(&mut buf, 0).unwrap(), 4);
        assert_eq!(&buf, b"BBBB");
    }

    #[test]
    fn test_finalize_closes_directory_with_stale_flag() {
        let (_dir, root) = setup();
        let mut p = PosixPath::new(root);
        p.open_dir().unwrap();
        p.entry_mut().unset(EntryFlags::OPEN_DIR);

        p.finalize();
        assert!(matches!(p.read_dir_entry(), Err(PathError::InvalidState { .. })));
        p.open_dir().unwrap();
    }

    #[test]
    fn test_non_utf8_name_is_invalid_path() {
        let (dir, root) = setup();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"f\xff")), b"").unwrap();
        std::fs::write(dir.path().join("ok"), b"").unwrap();

        let mut p = PosixPath::new(root);
        p.open_dir().unwrap();
        let mut names = Vec::new();
        let mut rejected = 0;
        loop {
            match p.read_dir_entry() {
                Ok(Some(name)) => names.push(name),
                Ok(None) => break,
                Err(PathError::InvalidPath(_)) => {
                    assert_eq!(p.entry().status().kind, StatusKind::InvalidPath);
                    rejected += 1;
                }
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(names, vec!["ok"]);
        assert_eq!(rejected, 1);
    }

    #[test]
    fn test_canonical_path_rejects_non_utf8_target() {
        let (dir, root) = setup();
        let target = dir.path().join(OsStr::from_bytes(b"d\xfe"));
        std::fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

        let mut p = PosixPath::new(format!("{root}/link"));
        let err = p.canonical_path().unwrap_err();
        assert!(matches!(err, PathError::InvalidPath(_)));
        assert_eq!(p.entry().status().kind, StatusKind::InvalidPath);
    }
}
