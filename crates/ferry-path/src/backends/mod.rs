//! Path drivers.
//!
//! Drivers implement [`PathOps`](crate::PathOps) for different storage
//! backends.

use std::ffi::OsString;

use crate::error::{PathError, PathResult};

mod list;
mod null;
mod posix;

pub use list::ListPath;
pub use null::NullPath;
pub use posix::PosixPath;

/// Entry paths are `String`s; a name that is not UTF-8 cannot be
/// addressed again, so it is an error rather than a lossy conversion.
fn utf8(name: OsString) -> PathResult<String> {
    name.into_string()
        .map_err(|raw| PathError::invalid_path(raw.to_string_lossy()))
}
