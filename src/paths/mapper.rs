//! Logical/physical path mapping
//!
//! Callers address entries through one logical namespace. Paths whose first
//! segment is [`SHARED_PREFIX`] live under the shared root, everything else
//! under the private root. The marker segment is kept in the physical path,
//! so `shared/a` maps to `<shared_root>/shared/a`.

use crate::error::ContentsError;
use crate::paths::hidden::is_hidden_remainder;

/// First logical segment that routes a path into the shared root.
pub const SHARED_PREFIX: &str = "shared";

/// The two physical roots backing the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalRoot {
    Private,
    Shared,
}

/// Translates between logical paths and physical backend paths.
#[derive(Debug, Clone)]
pub struct PathMapper {
    private_root: String,
    shared_root: String,
}

impl PathMapper {
    /// Build a mapper over two disjoint, non-nested root directories.
    pub fn new(private_root: impl Into<String>, shared_root: impl Into<String>) -> Self {
        Self {
            private_root: trim_root(private_root.into()),
            shared_root: trim_root(shared_root.into()),
        }
    }

    /// Directory backing the given root.
    pub fn root_dir(&self, root: PhysicalRoot) -> &str {
        match root {
            PhysicalRoot::Private => &self.private_root,
            PhysicalRoot::Shared => &self.shared_root,
        }
    }

    /// Selects the root a logical path is served from.
    pub fn root_for_logical(&self, logical: &str) -> PhysicalRoot {
        match segments(logical).next() {
            Some(SHARED_PREFIX) => PhysicalRoot::Shared,
            _ => PhysicalRoot::Private,
        }
    }

    /// Selects the root a physical path belongs to, preferring the longest
    /// matching root directory.
    pub fn root_for_physical(&self, physical: &str) -> Result<PhysicalRoot, ContentsError> {
        let private = strip_root(physical, &self.private_root).map(|_| self.private_root.len());
        let shared = strip_root(physical, &self.shared_root).map(|_| self.shared_root.len());

        match (private, shared) {
            (Some(p), Some(s)) if s > p => Ok(PhysicalRoot::Shared),
            (Some(_), _) => Ok(PhysicalRoot::Private),
            (None, Some(_)) => Ok(PhysicalRoot::Shared),
            (None, None) => Err(ContentsError::Configuration(physical.to_string())),
        }
    }

    /// Maps a logical path to its physical location. Paths with `.` or `..`
    /// segments are refused.
    pub fn to_physical(&self, logical: &str) -> Result<String, ContentsError> {
        let mut physical = self.root_dir(self.root_for_logical(logical)).to_string();
        for segment in checked_segments(logical)? {
            physical.push('/');
            physical.push_str(segment);
        }
        Ok(physical)
    }

    /// Maps a physical path back to its canonical logical form.
    pub fn to_logical(&self, physical: &str) -> Result<String, ContentsError> {
        Ok(segments(self.remainder(physical)?).collect::<Vec<_>>().join("/"))
    }

    /// Whether a physical path is hidden relative to its root.
    pub fn is_hidden(&self, physical: &str) -> Result<bool, ContentsError> {
        Ok(is_hidden_remainder(self.remainder(physical)?))
    }

    fn remainder<'a>(&self, physical: &'a str) -> Result<&'a str, ContentsError> {
        let root = self.root_dir(self.root_for_physical(physical)?);
        strip_root(physical, root).ok_or_else(|| ContentsError::Configuration(physical.to_string()))
    }
}

/// Canonical logical form: non-empty segments joined by `/`.
///
/// Fails with [`ContentsError::OutsideRoot`] when a segment is `.` or `..`.
pub fn normalize(logical: &str) -> Result<String, ContentsError> {
    Ok(checked_segments(logical)?.join("/"))
}

/// Final segment of a path, or the empty string for the root.
pub fn base_name(path: &str) -> &str {
    segments(path).last().unwrap_or("")
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

fn checked_segments(logical: &str) -> Result<Vec<&str>, ContentsError> {
    let parts: Vec<_> = segments(logical).collect();
    if parts.iter().any(|segment| *segment == "." || *segment == "..") {
        return Err(ContentsError::OutsideRoot(logical.to_string()));
    }
    Ok(parts)
}

fn trim_root(root: String) -> String {
    root.trim_end_matches('/').to_string()
}

/// Strips `root` from `path` on a segment boundary.
fn strip_root<'a>(path: &'a str, root: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(root)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}
