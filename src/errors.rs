//! Error types you might see while resolving or translating jailed paths

use std::io;
use thiserror::Error;

/// Errors from the jail layer, convertible to an errno code
#[derive(Error, Debug)]
pub enum JailError {
    /// a real address falls outside the jail root
    #[error("path is outside the jail root: {0:?}")]
    JailViolation(String),

    /// a required path segment does not exist
    #[error("no such file or directory: {0:?}")]
    NotFound(String),

    /// a non-directory was found where a directory was required
    #[error("not a directory: {0:?}")]
    NotADirectory(String),

    /// a symbolic link chain revisited the same address
    #[error("too many levels of symbolic links: {0:?}")]
    SymlinkLoop(String),

    /// invalid argument
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// backing filesystem io error
    #[error("backing filesystem io error: {0}")]
    Io(#[from] io::Error),
}

impl JailError {
    /// Convert this error to the equivalent kernel errno value
    pub fn to_errno(&self) -> libc::c_int {
        match self {
            JailError::JailViolation(_) => libc::EXDEV,
            JailError::NotFound(_) => libc::ENOENT,
            JailError::NotADirectory(_) => libc::ENOTDIR,
            JailError::SymlinkLoop(_) => libc::ELOOP,
            JailError::InvalidArgument(_) => libc::EINVAL,
            JailError::Io(err) => err.raw_os_error().unwrap_or(libc::EIO),
        }
    }

    /// Failures that describe the shape of a path rather than a broken
    /// backing filesystem. Queries answer these with a not-found result.
    pub fn is_resolution_failure(&self) -> bool {
        match self {
            JailError::JailViolation(_)
            | JailError::NotFound(_)
            | JailError::NotADirectory(_)
            | JailError::SymlinkLoop(_) => true,
            JailError::InvalidArgument(_) | JailError::Io(_) => false,
        }
    }
}

impl From<JailError> for io::Error {
    fn from(err: JailError) -> Self {
        match err {
            JailError::Io(err) => err,
            other => io::Error::from_raw_os_error(other.to_errno()),
        }
    }
}
