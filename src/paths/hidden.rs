//! Hidden-entry policy
//!
//! An entry is hidden when any segment of its root-relative path starts
//! with the hidden marker.

/// Marker that starts the name of a hidden entry.
pub const HIDDEN_MARKER: char = '.';

/// Returns true if a single entry name is hidden.
pub fn is_hidden_name(name: &str) -> bool {
    name.starts_with(HIDDEN_MARKER)
}

/// Returns true if any segment of a root-relative path is hidden.
pub fn is_hidden_remainder(remainder: &str) -> bool {
    remainder
        .split('/')
        .filter(|segment| !segment.is_empty())
        .any(is_hidden_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_segments() {
        assert!(is_hidden_remainder(".git"));
        assert!(is_hidden_remainder("proj/.ipynb_checkpoints/a.ipynb"));
        assert!(is_hidden_remainder("/a/b/.c"));
        assert!(!is_hidden_remainder("proj/notes.txt"));
        assert!(!is_hidden_remainder(""));
        assert!(!is_hidden_remainder("a.b/c."));
    }
}
