//! Backend storage
//!
//! The filesystem capability set the content store runs on, plus the
//! backends shipped with the crate.

use chrono::{DateTime, Utc};
use std::io::{Read, Write};

use crate::error::FsError;

pub mod local;
pub mod memory;
pub mod permissions;

pub use local::LocalFs;
pub use memory::MemoryFs;
pub use permissions::perm_to_forbidden;

/// Kind of entry reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    File,
    Directory,
    NotFound,
}

/// Result of a stat or listing call. Request-scoped, never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryMetadata {
    pub path: String,
    pub file_type: FileType,
    pub size: u64,
    pub modified: DateTime<Utc>,
}

impl EntryMetadata {
    pub fn not_found(path: &str) -> Self {
        Self {
            path: path.to_string(),
            file_type: FileType::NotFound,
            size: 0,
            modified: DateTime::<Utc>::MIN_UTC,
        }
    }

    pub fn exists(&self) -> bool {
        self.file_type != FileType::NotFound
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Final segment of the physical path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

/// Primitive operations consumed from a (possibly remote) filesystem.
///
/// Paths are physical, slash-separated and absolute. Streams are closed when
/// dropped, so every exit path releases the backend handle.
pub trait FilesystemAdapter: Send + Sync {
    /// Metadata for `path`; a missing entry is reported as
    /// [`FileType::NotFound`] rather than an error.
    fn stat(&self, path: &str) -> Result<EntryMetadata, FsError>;

    /// Entries below a directory, optionally the whole subtree.
    fn list(&self, path: &str, recursive: bool) -> Result<Vec<EntryMetadata>, FsError>;

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError>;

    /// Opens a sink that replaces the file's content.
    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError>;

    /// Creates a directory and any missing parents. Succeeds if the
    /// directory already exists.
    fn create_dir(&self, path: &str) -> Result<(), FsError>;

    fn delete_file(&self, path: &str) -> Result<(), FsError>;

    /// Deletes a directory with everything below it.
    fn delete_dir(&self, path: &str) -> Result<(), FsError>;

    /// Renames `source` to `dest`, failing with [`FsError::AlreadyExists`]
    /// if `dest` is taken.
    fn rename(&self, source: &str, dest: &str) -> Result<(), FsError>;
}
