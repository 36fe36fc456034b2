//! Local disk backend
//!
//! Serves the physical namespace from a directory on local disk: physical
//! `/a/b` lives at `<base>/a/b`.

use chrono::{DateTime, Utc};
use std::fs::{self, File, Metadata};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::FsError;
use crate::storage::{EntryMetadata, FileType, FilesystemAdapter};

#[derive(Debug, Clone)]
pub struct LocalFs {
    base: PathBuf,
}

impl LocalFs {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Location of a physical path on disk. Relative segments are refused so
    /// nothing resolves outside the base directory.
    fn resolve(&self, physical: &str) -> Result<PathBuf, FsError> {
        let mut real = self.base.clone();
        for segment in physical.split('/').filter(|s| !s.is_empty()) {
            if segment == "." || segment == ".." {
                return Err(FsError::PermissionDenied(physical.to_string()));
            }
            real.push(segment);
        }
        Ok(real)
    }

    fn entry(physical: &str, metadata: &Metadata) -> EntryMetadata {
        let file_type = if metadata.is_dir() {
            FileType::Directory
        } else {
            FileType::File
        };
        let modified = metadata
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        EntryMetadata {
            path: physical.to_string(),
            file_type,
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            modified,
        }
    }

    fn collect(
        &self,
        physical: &str,
        recursive: bool,
        out: &mut Vec<EntryMetadata>,
    ) -> Result<(), FsError> {
        let entries = fs::read_dir(self.resolve(physical)?).map_err(|e| FsError::from_io(physical, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(physical, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let child = format!("{}/{}", physical.trim_end_matches('/'), name);
            let metadata = entry.metadata().map_err(|e| FsError::from_io(&child, e))?;

            out.push(Self::entry(&child, &metadata));
            if recursive && metadata.is_dir() {
                self.collect(&child, true, out)?;
            }
        }
        Ok(())
    }
}

impl FilesystemAdapter for LocalFs {
    fn stat(&self, path: &str) -> Result<EntryMetadata, FsError> {
        match fs::metadata(self.resolve(path)?) {
            Ok(metadata) => Ok(Self::entry(path, &metadata)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(EntryMetadata::not_found(path)),
            Err(e) => Err(FsError::from_io(path, e)),
        }
    }

    fn list(&self, path: &str, recursive: bool) -> Result<Vec<EntryMetadata>, FsError> {
        let mut entries = Vec::new();
        self.collect(path, recursive, &mut entries)?;
        Ok(entries)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>, FsError> {
        let file = File::open(self.resolve(path)?).map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn open_write(&self, path: &str) -> Result<Box<dyn Write + Send>, FsError> {
        let real = self.resolve(path)?;
        if real.is_dir() {
            return Err(FsError::other(path, "cannot write to a directory"));
        }
        let file = File::create(real).map_err(|e| FsError::from_io(path, e))?;
        Ok(Box::new(file))
    }

    fn create_dir(&self, path: &str) -> Result<(), FsError> {
        let real = self.resolve(path)?;
        if real.is_file() {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        fs::create_dir_all(real).map_err(|e| FsError::from_io(path, e))
    }

    fn delete_file(&self, path: &str) -> Result<(), FsError> {
        fs::remove_file(self.resolve(path)?).map_err(|e| FsError::from_io(path, e))
    }

    fn delete_dir(&self, path: &str) -> Result<(), FsError> {
        fs::remove_dir_all(self.resolve(path)?).map_err(|e| FsError::from_io(path, e))
    }

    fn rename(&self, source: &str, dest: &str) -> Result<(), FsError> {
        let real_dest = self.resolve(dest)?;
        if real_dest.exists() {
            return Err(FsError::AlreadyExists(dest.to_string()));
        }
        fs::rename(self.resolve(source)?, real_dest).map_err(|e| FsError::from_io(source, e))
    }
}
