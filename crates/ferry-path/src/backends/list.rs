//! Manifest driver for `list://` paths.
//!
//! A `list://` entry always looks like a directory. Enumerating it yields
//! either the names in a real directory or the lines of a manifest file,
//! which lets a run be seeded from a precomputed list of paths.
//!
//! Only stat, access, enumeration and canonicalization are meaningful;
//! everything else is declined.

use std::fs::{self, File, ReadDir};
use std::io::{BufRead, BufReader, Lines};

use super::utf8;
use crate::entry::{Entry, EntryFlags};
use crate::error::{PathError, PathResult};
use crate::ops::PathOps;
use crate::sys;
use crate::types::{
    AccessFlags, AccessMode, Backend, FileKind, OpenFlags, S_IFDIR, S_IFMT, SetTimes, StatRecord,
};

#[derive(Debug)]
enum ListCursor {
    Dir(ReadDir),
    Manifest(Lines<BufReader<File>>),
}

impl ListCursor {
    fn next_name(&mut self, path: &str) -> PathResult<Option<String>> {
        let failed = |e| PathError::backend("read_dir_entry", path, e);
        match self {
            ListCursor::Dir(dir) => match dir.next() {
                None => Ok(None),
                Some(Ok(de)) => utf8(de.file_name()).map(Some),
                Some(Err(e)) => Err(failed(e)),
            },
            ListCursor::Manifest(lines) => {
                for line in lines.by_ref() {
                    let line = line.map_err(failed)?;
                    let trimmed = line.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    return Ok(Some(trimmed.to_string()));
                }
                Ok(None)
            }
        }
    }
}

/// Driver for `list://` paths.
#[derive(Debug)]
pub struct ListPath {
    entry: Entry,
    cursor: Option<ListCursor>,
}

impl ListPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            entry: Entry::new(path),
            cursor: None,
        }
    }

    /// The path with `list://` stripped.
    pub fn real_path(&self) -> &str {
        let path = self.entry.path();
        path.strip_prefix(Backend::LIST_PREFIX).unwrap_or(path)
    }
}

impl PathOps for ListPath {
    fn backend(&self) -> Backend {
        Backend::List
    }

    fn entry(&self) -> &Entry {
        &self.entry
    }

    fn entry_mut(&mut self) -> &mut Entry {
        &mut self.entry
    }

    fn stat_uncached(&mut self, follow_links: bool) -> PathResult<StatRecord> {
        let real = self.real_path();
        let meta = if follow_links {
            fs::metadata(real)
        } else {
            fs::symlink_metadata(real)
        };
        let mut stat = meta
            .map(|m| StatRecord::from_metadata(&m))
            .map_err(|e| PathError::backend("stat", self.entry.path(), e))?;
        // Whatever backs it, a list is presented as a directory.
        stat.mode = (stat.mode & !S_IFMT) | S_IFDIR;
        stat.kind = FileKind::Directory;
        Ok(stat)
    }

    fn access(&mut self, mode: AccessMode) -> PathResult<()> {
        let result = sys::access(self.real_path(), mode)
            .map_err(|e| PathError::backend("access", self.entry.path(), e));
        self.entry.record("access", result)
    }

    fn access_at(&mut self, mode: AccessMode, flags: AccessFlags) -> PathResult<()> {
        let real = self.real_path();
        let result = if real.starts_with('/') {
            sys::access_at(real, mode, flags)
                .map_err(|e| PathError::backend("access_at", self.entry.path(), e))
        } else {
            Err(PathError::invalid_path(self.entry.path()))
        };
        self.entry.record("access_at", result)
    }

    fn open(&mut self, _flags: OpenFlags, _mode: u32) -> PathResult<()> {
        self.entry.decline("open", Backend::List)
    }

    fn close(&mut self) -> PathResult<()> {
        self.entry.decline("close", Backend::List)
    }

    fn open_dir(&mut self) -> PathResult<()> {
        if self.cursor.is_some() {
            return self.entry.reject("open_dir", "directory already open");
        }
        let real = self.real_path();
        let opened = fs::metadata(real).and_then(|meta| {
            if meta.is_dir() {
                fs::read_dir(real).map(ListCursor::Dir)
            } else {
                File::open(real).map(|f| ListCursor::Manifest(BufReader::new(f).lines()))
            }
        });
        match opened {
            Ok(cursor) => {
                self.cursor = Some(cursor);
                self.entry.set(EntryFlags::OPEN_DIR);
                self.entry.record("open_dir", Ok(()))
            }
            Err(e) => {
                let err = PathError::backend("open_dir", self.entry.path(), e);
                self.entry.record("open_dir", Err(err))
            }
        }
    }

    fn close_dir(&mut self) -> PathResult<()> {
        if self.cursor.take().is_none() {
            return self.entry.reject("close_dir", "directory not open");
        }
        self.entry.unset(EntryFlags::OPEN_DIR);
        self.entry.record_mutation("close_dir", Ok(()))
    }

    fn read_dir_entry(&mut self) -> PathResult<Option<String>> {
        let Some(cursor) = self.cursor.as_mut() else {
            return self.entry.reject("read_dir_entry", "directory not open");
        };
        let result = cursor.next_name(self.entry.path());
        self.entry.record("read_dir_entry", result)
    }

    fn read(&mut self, _buf: &mut [u8], _offset: u64) -> PathResult<usize> {
        self.entry.decline("read", Backend::List)
    }

    fn write(&mut self, _buf: &[u8], _offset: u64) -> PathResult<usize> {
        self.entry.decline("write", Backend::List)
    }

    fn mkdir(&mut self, _mode: u32) -> PathResult<()> {
        self.entry.decline("mkdir", Backend::List)
    }

    fn remove(&mut self) -> PathResult<()> {
        self.entry.decline("remove", Backend::List)
    }

    fn unlink(&mut self) -> PathResult<()> {
        self.entry.decline("unlink", Backend::List)
    }

    fn symlink(&mut self, _target: &str) -> PathResult<()> {
        self.entry.decline("symlink", Backend::List)
    }

    fn read_link(&mut self, _buf: &mut [u8]) -> PathResult<usize> {
        self.entry.decline("read_link", Backend::List)
    }

    fn chown(&mut self, _uid: u32, _gid: u32) -> PathResult<()> {
        self.entry.decline("chown", Backend::List)
    }

    fn chmod(&mut self, _mode: u32) -> PathResult<()> {
        self.entry.decline("chmod", Backend::List)
    }

    fn set_times(&mut self, _times: SetTimes) -> PathResult<()> {
        self.entry.decline("set_times", Backend::List)
    }

    fn canonical_path(&mut self) -> PathResult<String> {
        let result = dunce::canonicalize(self.real_path())
            .map_err(|e| PathError::backend("canonical_path", self.entry.path(), e))
            .and_then(|p| utf8(p.into_os_string()))
            .map(|real| format!("{}{real}", Backend::LIST_PREFIX));
        self.entry.record("canonical_path", result)
    }

    fn finalize(&mut self) {
        // The cursor is dropped whatever the flags say.
        if self.cursor.take().is_some() {
            self.entry.invalidate_stat();
        }
        self.entry.unset(EntryFlags::OPEN | EntryFlags::OPEN_DIR);
    }
}
