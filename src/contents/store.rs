//! Content store
//!
//! Get, save, delete and rename over logical paths. Each call is a
//! stateless transaction against the backend: nothing is cached, and no
//! locking happens here, so concurrent callers see whatever atomicity the
//! backend provides.

use log::debug;
use serde_json::Value;
use std::io::{Read, Write};

use crate::config::StoreConfig;
use crate::error::{ContentsError, FsError};
use crate::model::builder::{encode_file, infer_type};
use crate::model::{ContentModel, ContentModelBuilder, ContentType, Format, SaveModel};
use crate::notebook::{JsonNotebookFormat, NotebookFormat};
use crate::paths::{PathMapper, PhysicalRoot, SHARED_PREFIX, normalize};
use crate::policy::{CheckpointDir, Checkpoints, HideGlobs, ListingPolicy};
use crate::storage::{EntryMetadata, FileType, FilesystemAdapter, perm_to_forbidden};

pub struct ContentStore<B> {
    backend: B,
    mapper: PathMapper,
    allow_hidden: bool,
    notebooks: Box<dyn NotebookFormat>,
    listing: Box<dyn ListingPolicy>,
    checkpoints: Box<dyn Checkpoints>,
}

impl<B: FilesystemAdapter> ContentStore<B> {
    /// Store with the default collaborators and hidden entries refused.
    pub fn new(backend: B, mapper: PathMapper) -> Self {
        Self {
            backend,
            mapper,
            allow_hidden: false,
            notebooks: Box::new(JsonNotebookFormat::new()),
            listing: Box::new(HideGlobs::default()),
            checkpoints: Box::new(CheckpointDir::default()),
        }
    }

    /// Store wired from configuration.
    pub fn from_config(backend: B, config: &StoreConfig) -> Self {
        Self::new(
            backend,
            PathMapper::new(config.roots.resolved_root_dir(), config.roots.shared_dir.clone()),
        )
        .with_allow_hidden(config.policy.allow_hidden)
        .with_notebook_format(JsonNotebookFormat::with_cache_size(
            config.policy.signature_cache_size,
        ))
        .with_listing_policy(HideGlobs::new(config.policy.hide_globs.clone()))
        .with_checkpoints(CheckpointDir(config.policy.checkpoint_dir.clone()))
    }

    pub fn with_allow_hidden(mut self, allow_hidden: bool) -> Self {
        self.allow_hidden = allow_hidden;
        self
    }

    pub fn with_notebook_format(mut self, format: impl NotebookFormat + 'static) -> Self {
        self.notebooks = Box::new(format);
        self
    }

    pub fn with_listing_policy(mut self, policy: impl ListingPolicy + 'static) -> Self {
        self.listing = Box::new(policy);
        self
    }

    pub fn with_checkpoints(mut self, checkpoints: impl Checkpoints + 'static) -> Self {
        self.checkpoints = Box::new(checkpoints);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn mapper(&self) -> &PathMapper {
        &self.mapper
    }

    pub fn allow_hidden(&self) -> bool {
        self.allow_hidden
    }

    pub fn info_string(&self) -> String {
        format!(
            "Serving notebooks from directory: {}",
            self.mapper.root_dir(PhysicalRoot::Private)
        )
    }

    /// Creates the private root and the placeholder through which the
    /// shared namespace shows up in root listings.
    pub fn ensure_root_directories(&self) -> Result<(), ContentsError> {
        let root = self.mapper.root_dir(PhysicalRoot::Private).to_string();
        let placeholder = format!("{}/{}", root, SHARED_PREFIX);

        debug!("Creating root notebooks directory: {}", root);
        perm_to_forbidden("", || self.backend.create_dir(&root))?;
        debug!("Creating shared placeholder directory: {}", placeholder);
        perm_to_forbidden(SHARED_PREFIX, || self.backend.create_dir(&placeholder))
    }

    pub fn exists(&self, path: &str) -> Result<bool, ContentsError> {
        Ok(self.stat(path, &self.mapper.to_physical(path)?)?.exists())
    }

    pub fn file_exists(&self, path: &str) -> Result<bool, ContentsError> {
        Ok(self.stat(path, &self.mapper.to_physical(path)?)?.is_file())
    }

    pub fn dir_exists(&self, path: &str) -> Result<bool, ContentsError> {
        Ok(self.stat(path, &self.mapper.to_physical(path)?)?.is_dir())
    }

    pub fn is_hidden(&self, path: &str) -> Result<bool, ContentsError> {
        self.mapper.is_hidden(&self.mapper.to_physical(path)?)
    }

    /// Fetch the model at `path`, with its content if `content` is set.
    pub fn get(
        &self,
        path: &str,
        content: bool,
        content_type: Option<ContentType>,
        format: Option<Format>,
    ) -> Result<ContentModel, ContentsError> {
        let path = normalize(path)?;
        let physical = self.mapper.to_physical(&path)?;
        let meta = self.stat(&path, &physical)?;

        if !meta.exists() {
            return Err(ContentsError::NotFound(path));
        }
        if !self.allow_hidden && self.mapper.is_hidden(&physical)? {
            debug!("Refusing to serve hidden entry {:?}", physical);
            return Err(ContentsError::NotFound(path));
        }

        let builder = self.builder();
        match content_type.unwrap_or_else(|| infer_type(&path, meta.file_type)) {
            ContentType::Directory => {
                let children = if content && meta.is_dir() {
                    Some(perm_to_forbidden(&path, || self.backend.list(&physical, false))?)
                } else {
                    None
                };
                builder.directory(&meta, children)
            }
            ContentType::Notebook => {
                let raw = self.read_if(content && meta.is_file(), &path, &physical)?;
                builder.notebook(&meta, raw)
            }
            ContentType::File => {
                let raw = self.read_if(content && meta.is_file(), &path, &physical)?;
                builder.file(&meta, raw, format)
            }
        }
    }

    /// Save `model` at `path` and return a fresh model of what was stored.
    pub fn save(&self, model: &SaveModel, path: &str) -> Result<ContentModel, ContentsError> {
        let path = normalize(path)?;
        let content_type = model
            .content_type
            .ok_or_else(|| ContentsError::BadRequest("No file type provided".into()))?;
        if model.content.is_none() && content_type != ContentType::Directory {
            return Err(ContentsError::BadRequest("No file content provided".into()));
        }

        let physical = self.mapper.to_physical(&path)?;
        match content_type {
            ContentType::Directory => self.save_directory(&path, &physical)?,
            ContentType::File => self.save_file(&path, &physical, model)?,
            ContentType::Notebook => self.save_notebook(&path, &physical, model)?,
        }

        self.get(&path, false, Some(content_type), None)
    }

    /// Delete the file or directory at `path`. Directories must be empty
    /// apart from the checkpoint child.
    pub fn delete(&self, path: &str) -> Result<(), ContentsError> {
        let path = normalize(path)?;
        let physical = self.mapper.to_physical(&path)?;
        let meta = self.stat(&path, &physical)?;

        match meta.file_type {
            FileType::NotFound => Err(ContentsError::NotFound(path)),
            FileType::Directory => {
                if !self.is_dir_empty(&path, &physical)? {
                    return Err(ContentsError::DirectoryNotEmpty(path));
                }
                debug!("Deleting directory at {}", physical);
                perm_to_forbidden(&path, || self.backend.delete_dir(&physical))
            }
            FileType::File => {
                debug!("Deleting file at {}", physical);
                perm_to_forbidden(&path, || self.backend.delete_file(&physical))
            }
        }
    }

    /// Move `old_path` to `new_path`.
    ///
    /// The destination check and the move are separate backend calls, so a
    /// destination created concurrently in between may be overwritten on
    /// backends whose move does not refuse existing targets.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<(), ContentsError> {
        let old_path = normalize(old_path)?;
        let new_path = normalize(new_path)?;
        if old_path == new_path {
            return Ok(());
        }

        let old_physical = self.mapper.to_physical(&old_path)?;
        let new_physical = self.mapper.to_physical(&new_path)?;

        if self.stat(&new_path, &new_physical)?.exists() {
            return Err(ContentsError::AlreadyExists(new_path));
        }

        debug!("Renaming {} -> {}", old_physical, new_physical);
        perm_to_forbidden(&old_path, || self.backend.rename(&old_physical, &new_physical))
            .map_err(|err| match err {
                ContentsError::Storage(FsError::AlreadyExists(_)) => {
                    ContentsError::AlreadyExists(new_path.clone())
                }
                ContentsError::Storage(source) => ContentsError::Rename {
                    path: old_path.clone(),
                    source,
                },
                other => other,
            })
    }

    fn builder(&self) -> ContentModelBuilder<'_> {
        ContentModelBuilder::new(&self.mapper, self.listing.as_ref(), self.notebooks.as_ref())
    }

    fn stat(&self, path: &str, physical: &str) -> Result<EntryMetadata, ContentsError> {
        perm_to_forbidden(path, || self.backend.stat(physical))
    }

    fn read_if(
        &self,
        wanted: bool,
        path: &str,
        physical: &str,
    ) -> Result<Option<Vec<u8>>, ContentsError> {
        if !wanted {
            return Ok(None);
        }
        perm_to_forbidden(path, || {
            let mut stream = self.backend.open_read(physical)?;
            let mut raw = Vec::new();
            stream
                .read_to_end(&mut raw)
                .map_err(|e| FsError::from_io(physical, e))?;
            Ok(raw)
        })
        .map(Some)
    }

    fn write_bytes(&self, path: &str, physical: &str, bytes: &[u8]) -> Result<(), ContentsError> {
        perm_to_forbidden(path, || {
            let mut sink = self.backend.open_write(physical)?;
            sink.write_all(bytes)
                .and_then(|_| sink.flush())
                .map_err(|e| FsError::from_io(physical, e))
        })
    }

    fn save_directory(&self, path: &str, physical: &str) -> Result<(), ContentsError> {
        if !self.allow_hidden && self.mapper.is_hidden(physical)? {
            return Err(ContentsError::HiddenPath(path.to_string()));
        }

        match self.stat(path, physical)?.file_type {
            FileType::NotFound => {
                debug!("Creating directory at {}", physical);
                perm_to_forbidden(path, || self.backend.create_dir(physical))
            }
            FileType::Directory => Ok(()),
            FileType::File => Err(ContentsError::NotADirectory(path.to_string())),
        }
    }

    fn save_file(&self, path: &str, physical: &str, model: &SaveModel) -> Result<(), ContentsError> {
        let format = match model.format {
            Some(format @ (Format::Text | Format::Base64)) => format,
            _ => {
                return Err(ContentsError::BadRequest(
                    "Must specify format of file contents as 'text' or 'base64'".into(),
                ));
            }
        };
        let content = match &model.content {
            Some(Value::String(content)) => content,
            _ => {
                return Err(ContentsError::BadRequest(
                    "File content must be a string".into(),
                ));
            }
        };

        let bytes = encode_file(path, content, format)?;
        debug!("Saving file to {}", physical);
        self.write_bytes(path, physical, &bytes)
    }

    fn save_notebook(
        &self,
        path: &str,
        physical: &str,
        model: &SaveModel,
    ) -> Result<(), ContentsError> {
        let content = model.content.as_ref().ok_or_else(|| {
            ContentsError::BadRequest("No file content provided".into())
        })?;
        let invalid = |reason: String| ContentsError::Validation {
            path: path.to_string(),
            reason,
        };

        let mut notebook = self
            .notebooks
            .from_model(content)
            .map_err(|e| invalid(e.to_string()))?;
        self.notebooks.sign(&mut notebook, path);
        let bytes = self
            .notebooks
            .serialize(&notebook)
            .map_err(|e| ContentsError::Internal(e.to_string()))?;

        debug!("Saving notebook to {}", physical);
        self.write_bytes(path, physical, &bytes)?;

        self.notebooks
            .validate(content)
            .map_err(|e| invalid(e.to_string()))
    }

    fn is_dir_empty(&self, path: &str, physical: &str) -> Result<bool, ContentsError> {
        let entries = perm_to_forbidden(path, || self.backend.list(physical, false))?;
        let reserved = self.checkpoints.checkpoint_dir();
        Ok(entries.iter().all(|entry| Some(entry.name()) == reserved))
    }
}
