//! Error handlers
//!
//! Maps store errors onto the status codes a request layer reports.

use crate::error::types::{ContentsError, FsError};
use log::error;

/// Log an error that is about to cross the store boundary.
pub fn handle_error(err: &ContentsError) {
    error!("{} ({}): {}", status_code(err), err.kind().as_str(), err);
}

/// Convert an error to an HTTP-equivalent status code
pub fn status_code(err: &ContentsError) -> u16 {
    match err {
        ContentsError::NotFound(_) | ContentsError::OutsideRoot(_) => 404,
        ContentsError::Forbidden(_) => 403,
        ContentsError::NotADirectory(_)
        | ContentsError::NotAFile(_)
        | ContentsError::Encoding { .. }
        | ContentsError::BadRequest(_)
        | ContentsError::HiddenPath(_)
        | ContentsError::DirectoryNotEmpty(_)
        | ContentsError::Parse { .. }
        | ContentsError::Validation { .. } => 400,
        ContentsError::AlreadyExists(_) => 409,
        ContentsError::Configuration(_)
        | ContentsError::Rename { .. }
        | ContentsError::Internal(_) => 500,
        ContentsError::Storage(inner) => match inner {
            FsError::NotFound(_) => 404,
            FsError::PermissionDenied(_) => 403,
            FsError::AlreadyExists(_) => 409,
            FsError::Io { .. } => 500,
        },
    }
}
