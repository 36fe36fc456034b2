//! Error types
//!
//! Defines the backend-level and store-level error types.

use std::io;
use thiserror::Error;

/// Failures reported by a filesystem backend.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Path already exists: {0}")]
    AlreadyExists(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classifies an `io::Error` raised while operating on `path`.
    pub fn from_io(path: &str, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => FsError::NotFound(path.to_string()),
            io::ErrorKind::PermissionDenied => FsError::PermissionDenied(path.to_string()),
            io::ErrorKind::AlreadyExists => FsError::AlreadyExists(path.to_string()),
            _ => FsError::Io {
                path: path.to_string(),
                source: error,
            },
        }
    }

    /// Builds an `Io` error from a plain message.
    pub fn other(path: &str, message: &str) -> Self {
        FsError::Io {
            path: path.to_string(),
            source: io::Error::other(message.to_string()),
        }
    }
}

/// Stable classification of a [`ContentsError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    OutsideRoot,
    Forbidden,
    NotADirectory,
    NotAFile,
    Encoding,
    BadRequest,
    HiddenPath,
    AlreadyExists,
    DirectoryNotEmpty,
    Configuration,
    Parse,
    Validation,
    Rename,
    Storage,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::OutsideRoot => "outside_root",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotADirectory => "not_a_directory",
            ErrorKind::NotAFile => "not_a_file",
            ErrorKind::Encoding => "encoding",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::HiddenPath => "hidden_path",
            ErrorKind::AlreadyExists => "already_exists",
            ErrorKind::DirectoryNotEmpty => "directory_not_empty",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Parse => "parse",
            ErrorKind::Validation => "validation",
            ErrorKind::Rename => "rename",
            ErrorKind::Storage => "storage",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors surfaced to callers of the content store.
#[derive(Debug, Error)]
pub enum ContentsError {
    #[error("No such file or directory: {0}")]
    NotFound(String),

    #[error("{0} is outside root directory")]
    OutsideRoot(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("{0} is not a directory")]
    NotADirectory(String),

    #[error("{0} is not a file")]
    NotAFile(String),

    #[error("Encoding error for {path}: {reason}")]
    Encoding { path: String, reason: String },

    #[error("{0}")]
    BadRequest(String),

    #[error("Cannot create hidden directory {0:?}")]
    HiddenPath(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),

    #[error("Directory {0} not empty")]
    DirectoryNotEmpty(String),

    #[error("{0} is outside both configured root directories")]
    Configuration(String),

    #[error("Unreadable notebook {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Notebook validation failed for {path}: {reason}")]
    Validation { path: String, reason: String },

    #[error("Unknown error renaming file {path}: {source}")]
    Rename {
        path: String,
        #[source]
        source: FsError,
    },

    #[error(transparent)]
    Storage(#[from] FsError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ContentsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ContentsError::NotFound(_) => ErrorKind::NotFound,
            ContentsError::OutsideRoot(_) => ErrorKind::OutsideRoot,
            ContentsError::Forbidden(_) => ErrorKind::Forbidden,
            ContentsError::NotADirectory(_) => ErrorKind::NotADirectory,
            ContentsError::NotAFile(_) => ErrorKind::NotAFile,
            ContentsError::Encoding { .. } => ErrorKind::Encoding,
            ContentsError::BadRequest(_) => ErrorKind::BadRequest,
            ContentsError::HiddenPath(_) => ErrorKind::HiddenPath,
            ContentsError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            ContentsError::DirectoryNotEmpty(_) => ErrorKind::DirectoryNotEmpty,
            ContentsError::Configuration(_) => ErrorKind::Configuration,
            ContentsError::Parse { .. } => ErrorKind::Parse,
            ContentsError::Validation { .. } => ErrorKind::Validation,
            ContentsError::Rename { .. } => ErrorKind::Rename,
            ContentsError::Storage(_) => ErrorKind::Storage,
            ContentsError::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_classifies_kinds() {
        let err = FsError::from_io("/a", io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(err, FsError::NotFound(p) if p == "/a"));

        let err = FsError::from_io("/a", io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, FsError::PermissionDenied(_)));

        let err = FsError::from_io("/a", io::Error::from(io::ErrorKind::AlreadyExists));
        assert!(matches!(err, FsError::AlreadyExists(_)));

        let err = FsError::from_io("/a", io::Error::from(io::ErrorKind::Interrupted));
        assert!(matches!(err, FsError::Io { .. }));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            ContentsError::NotFound("a/b".into()).to_string(),
            "No such file or directory: a/b"
        );
        assert_eq!(
            ContentsError::DirectoryNotEmpty("proj".into()).to_string(),
            "Directory proj not empty"
        );
        let err = ContentsError::Rename {
            path: "a".into(),
            source: FsError::other("/r/a", "backend went away"),
        };
        assert!(err.to_string().contains("backend went away"));
        assert_eq!(err.kind(), ErrorKind::Rename);
    }
}
