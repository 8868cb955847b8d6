//! Path error types.

use std::io;
use std::path::PathBuf;

use rustix::io::Errno;
use thiserror::Error;

use crate::entry::{Status, StatusKind};
use crate::types::Backend;

/// Path capability error type.
#[derive(Debug, Error)]
pub enum PathError {
    /// The backend does not implement this capability.
    #[error("{backend} backend does not support {op}")]
    Unsupported { op: &'static str, backend: Backend },

    /// The underlying syscall failed.
    #[error("{op} failed on {path}: {source}")]
    Backend {
        op: &'static str,
        path: String,
        #[source]
        source: io::Error,
    },

    /// Path does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Capability called on an entry in the wrong state.
    #[error("{op} on {path}: {reason}")]
    InvalidState {
        op: &'static str,
        path: String,
        reason: &'static str,
    },

    /// Path is not usable by this backend (bad prefix, relative path).
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl PathError {
    /// Create an Unsupported error.
    pub fn unsupported(op: &'static str, backend: Backend) -> Self {
        Self::Unsupported { op, backend }
    }

    /// Wrap a backend I/O error. `ENOENT` becomes [`PathError::NotFound`].
    pub fn backend(op: &'static str, path: impl Into<String>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            Self::NotFound(path.into())
        } else {
            Self::Backend {
                op,
                path: path.into(),
                source,
            }
        }
    }

    /// Create an InvalidState error.
    pub fn invalid_state(op: &'static str, path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidState {
            op,
            path: path.into(),
            reason,
        }
    }

    /// Create an InvalidPath error.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    /// Returns true if the backend declined the capability.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported { .. })
    }

    /// OS error code equivalent.
    pub fn errno(&self) -> i32 {
        match self {
            Self::Unsupported { .. } => Errno::NOTSUP.raw_os_error(),
            Self::Backend { source, .. } => source
                .raw_os_error()
                .unwrap_or_else(|| Errno::IO.raw_os_error()),
            Self::NotFound(_) => Errno::NOENT.raw_os_error(),
            Self::InvalidState { .. } => Errno::BADF.raw_os_error(),
            Self::InvalidPath(_) => Errno::INVAL.raw_os_error(),
        }
    }

    /// The advisory status recorded on an entry for this error.
    pub fn status(&self, op: &'static str) -> Status {
        let kind = match self {
            Self::Unsupported { .. } => StatusKind::Unsupported,
            Self::Backend { .. } => StatusKind::BackendFailure,
            Self::NotFound(_) => StatusKind::NotFound,
            Self::InvalidState { .. } => StatusKind::InvalidState,
            Self::InvalidPath(_) => StatusKind::InvalidPath,
        };
        Status {
            kind,
            op,
            rc: -1,
            errno: self.errno(),
        }
    }
}

/// Convert PathError to std::io::Error for compatibility.
impl From<PathError> for io::Error {
    fn from(e: PathError) -> Self {
        match e {
            PathError::Unsupported { .. } => io::Error::new(io::ErrorKind::Unsupported, e),
            PathError::Backend { source, .. } => source,
            PathError::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, e),
            PathError::InvalidState { .. } => io::Error::other(e),
            PathError::InvalidPath(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
        }
    }
}

/// Path result type.
pub type PathResult<T> = Result<T, PathError>;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid TOML for [`PathConfig`](crate::PathConfig).
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enoent_maps_to_not_found() {
        let err = PathError::backend(
            "stat",
            "/missing",
            io::Error::from_raw_os_error(Errno::NOENT.raw_os_error()),
        );
        assert!(matches!(err, PathError::NotFound(ref p) if p == "/missing"));
        assert_eq!(err.errno(), Errno::NOENT.raw_os_error());
    }

    #[test]
    fn test_unsupported_distinct_from_backend_failure() {
        let declined = PathError::unsupported("read", Backend::List);
        let failed = PathError::backend(
            "read",
            "/x",
            io::Error::from_raw_os_error(Errno::ACCESS.raw_os_error()),
        );
        assert!(declined.is_unsupported());
        assert!(!failed.is_unsupported());
        assert_eq!(declined.status("read").kind, StatusKind::Unsupported);
        assert_eq!(failed.status("read").kind, StatusKind::BackendFailure);
        assert_eq!(failed.errno(), Errno::ACCESS.raw_os_error());
    }

    #[test]
    fn test_into_io_error() {
        let io_err: io::Error = PathError::unsupported("write", Backend::List).into();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
    }
}
