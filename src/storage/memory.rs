//! In-memory backend
//!
//! Keeps the whole physical namespace in a lock-guarded map. Useful for
//! tests and for embedding the store without a remote filesystem. Write
//! streams commit their buffer when closed.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::FsError;
use crate::storage::{EntryMetadata, FileType, FilesystemAdapter};

#[derive(Debug, Clone)]
enum Node {
    Directory { modified: DateTime<Utc> },
    File { data: Vec<u8>, modified: DateTime<Utc> },
}

#[derive(Debug, Default)]
struct State {
    nodes: BTreeMap<String, Node>,
    denied: BTreeSet<String>,
}

/// Filesystem held entirely in memory. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    state: Arc<Mutex<State>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every operation on `prefix` or below fail with a permission
    /// error.
    pub fn deny(&self, prefix: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.denied.insert(canonical(prefix));
        }
    }

    /// Lifts a previous [`MemoryFs::deny`].
    pub fn allow(&self, prefix: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.denied.remove(&canonical(prefix));
        }
    }

    fn lock(&self, path: &str) -> Result<MutexGuard<'_, State>, FsError> {
        let state = self
            .state
            .lock()
            .map_err(|_| FsError::other(path, "memory filesystem lock poisoned"))?;
        if state.is_denied(path) {
            return Err(FsError::PermissionDenied(path.to_string()));
        }
        Ok(state)
    }
}

impl State {
    fn is_denied(&self, path: &str) -> bool {
        self.denied.iter().any(|prefix| {
            prefix == "/" || path == prefix || path.starts_with(&format!("{}/", prefix))
        })
    }

    fn node_type(&self, path: &str) -> FileType {
        if path == "/" {
            return FileType::Directory;
        }
        match self.nodes.get(path) {
            Some(Node::Directory { .. }) => FileType::Directory,
            Some(Node::File { .. }) => FileType::File,
            None => FileType::NotFound,
        }
    }

    fn metadata(&self, path: &str) -> EntryMetadata {
        match self.nodes.get(path) {
            Some(Node::Directory { modified }) => EntryMetadata {
                path: path.to_string(),
                file_type: FileType::Directory,
                size: 0,
                modified: *modified,
            },
            Some(Node::File { data, modified }) => EntryMetadata {
                path: path.to_string(),
                file_type: FileType::File,
                size: data.len() as u64,
                modified: *modified,
            },
            None if path == "/" => EntryMetadata {
                path: path.to_string(),
                file_type: FileType::Directory,
                size: 0,
                modified: DateTime::<Utc>::MIN_UTC,
            },
            None => EntryMetadata::not_found(path),
        }
    }

    fn descendants(&self, path: &str) -> Vec<String> {
        let prefix = child_prefix(path);
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }

    fn require_parent_dir(&self, path: &str) -> Result<(), FsError> {
        match self.node_type(parent(path)) {
            FileType::Directory => Ok(()),
            FileType::File => Err(FsError::other(path, "parent is not a directory")),
            FileType::NotFound => Err(FsError::NotFound(parent(path).to_string())),
        }
    }
}

impl FilesystemAdapter for MemoryFs {
    fn stat(&self, path: &str) -> Result<EntryMetadata, FsError> {
        let path = canonical(path);
        let state = self.lock(&path)?;
        Ok(state.metadata(&path))
    }

    fn list(&self, path: &str, recursive: bool) -> Result<Vec<EntryMetadata>, FsError> {
        let path = canonical(path);
        let state = self.lock(&path)?;
        match state.node_type(&path) {
            FileType::Directory => {}
            FileType::File => return Err(FsError::other(&path, "not a directory")),
            FileType::NotFound => return Err(FsError::NotFound(path)),
        }

        let prefix = child_prefix(&path);
        Ok(state
            .descendants(&path)
            .into_iter()
            .filter(|key| recursive || !key[prefix.len()..].contains('/'))
            .map(|key| state.metadata(&key))
            .collect())
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let path = canonical(path);
        let state = self.lock(&path)?;
        match state.nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Directory { .. }) => Err(FsError::other(&path, "is a directory")),
            None => Err(FsError::NotFound(path)),
        }
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let path = canonical(path);
        let state = self.lock(&path)?;
        state.require_parent_dir(&path)?;
        if state.node_type(&path) == FileType::Directory {
            return Err(FsError::other(&path, "is a directory"));
        }
        drop(state);

        Ok(Box::new(MemoryWriter {
            state: Arc::clone(&self.state),
            path,
            buffer: Vec::new(),
        }))
    }

    fn create_dir(&self, path: &str) -> Result<(), FsError> {
        let path = canonical(path);
        let mut state = self.lock(&path)?;
        let now = Utc::now();

        let mut current = String::new();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);
            match state.node_type(&current) {
                FileType::Directory => {}
                FileType::File => return Err(FsError::AlreadyExists(current)),
                FileType::NotFound => {
                    state
                        .nodes
                        .insert(current.clone(), Node::Directory { modified: now });
                }
            }
        }
        Ok(())
    }

    fn delete_file(&self, path: &str) -> Result<(), FsError> {
        let path = canonical(path);
        let mut state = self.lock(&path)?;
        match state.node_type(&path) {
            FileType::File => {
                state.nodes.remove(&path);
                Ok(())
            }
            FileType::Directory => Err(FsError::other(&path, "is a directory")),
            FileType::NotFound => Err(FsError::NotFound(path)),
        }
    }

    fn delete_dir(&self, path: &str) -> Result<(), FsError> {
        let path = canonical(path);
        let mut state = self.lock(&path)?;
        match state.node_type(&path) {
            FileType::Directory => {
                for key in state.descendants(&path) {
                    state.nodes.remove(&key);
                }
                state.nodes.remove(&path);
                Ok(())
            }
            FileType::File => Err(FsError::other(&path, "not a directory")),
            FileType::NotFound => Err(FsError::NotFound(path)),
        }
    }

    fn rename(&self, source: &str, dest: &str) -> Result<(), FsError> {
        let source = canonical(source);
        let dest = canonical(dest);
        let mut state = self.lock(&source)?;
        if state.is_denied(&dest) {
            return Err(FsError::PermissionDenied(dest));
        }

        if state.node_type(&source) == FileType::NotFound {
            return Err(FsError::NotFound(source));
        }
        if state.node_type(&dest) != FileType::NotFound {
            return Err(FsError::AlreadyExists(dest));
        }
        state.require_parent_dir(&dest)?;

        let mut moved = state.descendants(&source);
        moved.push(source.clone());
        for key in moved {
            if let Some(node) = state.nodes.remove(&key) {
                let renamed = format!("{}{}", dest, &key[source.len()..]);
                state.nodes.insert(renamed, node);
            }
        }
        Ok(())
    }
}

/// Buffered sink that lands in the map when dropped.
struct MemoryWriter {
    state: Arc<Mutex<State>>,
    path: String,
    buffer: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            let node = Node::File {
                data: std::mem::take(&mut self.buffer),
                modified: Utc::now(),
            };
            state.nodes.insert(self.path.clone(), node);
        }
    }
}

fn canonical(path: &str) -> String {
    let joined = path
        .split('/')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined)
}

fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => "/",
        Some(idx) => &path[..idx],
    }
}

fn child_prefix(path: &str) -> String {
    if path == "/" {
        "/".to_string()
    } else {
        format!("{}/", path)
    }
}
