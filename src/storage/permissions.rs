//! Permission translation
//!
//! Backend permission failures become a uniform forbidden outcome naming the
//! logical path; every other failure passes through unchanged.

use log::warn;

use crate::error::{ContentsError, FsError};

/// Run a backend operation, translating permission denials for `path`.
pub fn perm_to_forbidden<T, F>(path: &str, op: F) -> Result<T, ContentsError>
where
    F: FnOnce() -> Result<T, FsError>,
{
    op().map_err(|err| match err {
        FsError::PermissionDenied(physical) => {
            warn!("Permission denied for {} (physical: {})", path, physical);
            ContentsError::Forbidden(path.to_string())
        }
        other => ContentsError::Storage(other),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_becomes_forbidden() {
        let result: Result<(), _> =
            perm_to_forbidden("proj/x.txt", || Err(FsError::PermissionDenied("/r/proj/x.txt".into())));
        assert!(matches!(result, Err(ContentsError::Forbidden(p)) if p == "proj/x.txt"));
    }

    #[test]
    fn test_other_failures_pass_through() {
        let result: Result<(), _> =
            perm_to_forbidden("x", || Err(FsError::NotFound("/r/x".into())));
        assert!(matches!(
            result,
            Err(ContentsError::Storage(FsError::NotFound(_)))
        ));

        assert_eq!(perm_to_forbidden("x", || Ok(7)).unwrap(), 7);
    }
}
