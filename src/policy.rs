//! Listing and checkpoint collaborators
//!
//! Directory listings consult a [`ListingPolicy`] on top of the hidden-entry
//! rule, and directory emptiness checks ignore the child reserved by the
//! [`Checkpoints`] subsystem.

use glob::Pattern;
use log::warn;

/// Names hidden from listings unless configured otherwise.
pub const DEFAULT_HIDE_GLOBS: [&str; 7] = [
    "__pycache__",
    "*.pyc",
    "*.pyo",
    ".DS_Store",
    "*.so",
    "*.dylib",
    "*~",
];

/// Default name of the checkpoint storage child.
pub const DEFAULT_CHECKPOINT_DIR: &str = ".ipynb_checkpoints";

pub trait ListingPolicy: Send + Sync {
    fn should_list(&self, name: &str) -> bool;
}

/// Rejects names matching any of a set of glob patterns.
#[derive(Debug, Clone)]
pub struct HideGlobs {
    patterns: Vec<Pattern>,
}

impl HideGlobs {
    /// Compiles the patterns once. Invalid patterns are logged and skipped;
    /// configuration validation refuses them before they get here.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .filter_map(|raw| match Pattern::new(raw.as_ref()) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!("Ignoring invalid hide pattern {:?}: {}", raw.as_ref(), e);
                    None
                }
            })
            .collect();
        Self { patterns }
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
}

impl Default for HideGlobs {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_GLOBS)
    }
}

impl ListingPolicy for HideGlobs {
    fn should_list(&self, name: &str) -> bool {
        !self.patterns.iter().any(|pattern| pattern.matches(name))
    }
}

/// Collaborator reserving a child name for checkpoint storage.
pub trait Checkpoints: Send + Sync {
    fn checkpoint_dir(&self) -> Option<&str>;
}

/// Checkpoints kept in a named child directory.
#[derive(Debug, Clone)]
pub struct CheckpointDir(pub String);

impl Default for CheckpointDir {
    fn default() -> Self {
        Self(DEFAULT_CHECKPOINT_DIR.to_string())
    }
}

impl Checkpoints for CheckpointDir {
    fn checkpoint_dir(&self) -> Option<&str> {
        Some(&self.0)
    }
}

/// No checkpoint storage at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCheckpoints;

impl Checkpoints for NoCheckpoints {
    fn checkpoint_dir(&self) -> Option<&str> {
        None
    }
}
