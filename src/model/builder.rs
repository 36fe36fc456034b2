//! Content model construction
//!
//! Shapes backend metadata and raw bytes into directory, file and notebook
//! models.

use base64::Engine as _;
use log::warn;
use base64::engine::general_purpose::STANDARD;

use crate::error::ContentsError;
use crate::model::mimetypes::{DEFAULT_BINARY, DEFAULT_TEXT, guess_type};
use crate::model::{Content, ContentModel, ContentType, Format};
use crate::notebook::NotebookFormat;
use crate::paths::{PathMapper, base_name, is_hidden_name};
use crate::policy::ListingPolicy;
use crate::storage::{EntryMetadata, FileType};

/// Notebook documents are recognised by this suffix.
pub const NOTEBOOK_SUFFIX: &str = ".ipynb";

pub struct ContentModelBuilder<'a> {
    mapper: &'a PathMapper,
    listing: &'a dyn ListingPolicy,
    notebooks: &'a dyn NotebookFormat,
}

impl<'a> ContentModelBuilder<'a> {
    pub fn new(
        mapper: &'a PathMapper,
        listing: &'a dyn ListingPolicy,
        notebooks: &'a dyn NotebookFormat,
    ) -> Self {
        Self {
            mapper,
            listing,
            notebooks,
        }
    }

    /// Model without content. The type is inferred from the metadata and
    /// the notebook suffix unless given.
    pub fn from_metadata(
        &self,
        meta: &EntryMetadata,
        explicit_type: Option<ContentType>,
    ) -> Result<ContentModel, ContentsError> {
        let path = self.mapper.to_logical(&meta.path)?;
        let content_type = explicit_type.unwrap_or_else(|| infer_type(&path, meta.file_type));

        let mimetype = match content_type {
            ContentType::File => guess_type(&path).map(str::to_string),
            _ => None,
        };
        let size = match content_type {
            ContentType::Directory => None,
            _ => Some(meta.size),
        };

        Ok(ContentModel {
            name: base_name(&path).to_string(),
            path,
            last_modified: meta.modified,
            created: meta.modified,
            content_type,
            size,
            mimetype,
            content: None,
            format: None,
            writable: true,
            message: None,
        })
    }

    /// Directory model; `children` carries the backend listing when content
    /// was requested.
    pub fn directory(
        &self,
        meta: &EntryMetadata,
        children: Option<Vec<EntryMetadata>>,
    ) -> Result<ContentModel, ContentsError> {
        self.check_kind(meta, FileType::Directory)?;
        let mut model = self.from_metadata(meta, Some(ContentType::Directory))?;

        if let Some(children) = children {
            let mut entries = Vec::with_capacity(children.len());
            for child in &children {
                entries.push(self.from_metadata(child, None)?);
            }
            // Hidden entries are rare, so filter after building.
            entries.retain(|entry| {
                !is_hidden_name(&entry.name) && self.listing.should_list(&entry.name)
            });
            model.content = Some(Content::Entries(entries));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }

    /// File model; `raw` carries the file body when content was requested.
    pub fn file(
        &self,
        meta: &EntryMetadata,
        raw: Option<Vec<u8>>,
        requested: Option<Format>,
    ) -> Result<ContentModel, ContentsError> {
        self.check_kind(meta, FileType::File)?;
        let mut model = self.from_metadata(meta, Some(ContentType::File))?;

        if let Some(raw) = raw {
            let (content, format) = decode_file(&model.path, raw, requested)?;
            if model.mimetype.is_none() {
                let fallback = match format {
                    Format::Text => DEFAULT_TEXT,
                    _ => DEFAULT_BINARY,
                };
                model.mimetype = Some(fallback.to_string());
            }
            model.content = Some(Content::Text(content));
            model.format = Some(format);
        }
        Ok(model)
    }

    /// Notebook model; `raw` carries the stored document when content was
    /// requested. A stored document that parses but fails validation is still
    /// returned, with the failure in `message`.
    pub fn notebook(
        &self,
        meta: &EntryMetadata,
        raw: Option<Vec<u8>>,
    ) -> Result<ContentModel, ContentsError> {
        self.check_kind(meta, FileType::File)?;
        let mut model = self.from_metadata(meta, Some(ContentType::Notebook))?;

        if let Some(raw) = raw {
            let mut notebook = self.notebooks.parse(&raw).map_err(|e| ContentsError::Parse {
                path: model.path.clone(),
                reason: e.to_string(),
            })?;
            self.notebooks.mark_trusted(&mut notebook, &model.path);
            if let Err(e) = self.notebooks.validate(notebook.as_value()) {
                warn!("Stored notebook {} is invalid: {}", model.path, e);
                model.message = Some(format!("Notebook validation failed: {}", e));
            }
            model.content = Some(Content::Notebook(notebook.into_value()));
            model.format = Some(Format::Json);
        }
        Ok(model)
    }

    fn check_kind(&self, meta: &EntryMetadata, expected: FileType) -> Result<(), ContentsError> {
        if meta.file_type == expected {
            return Ok(());
        }
        let path = self.mapper.to_logical(&meta.path)?;
        Err(match (meta.file_type, expected) {
            (FileType::NotFound, _) => ContentsError::NotFound(path),
            (_, FileType::Directory) => ContentsError::NotADirectory(path),
            _ => ContentsError::NotAFile(path),
        })
    }
}

/// Type of an entry when the caller did not name one.
pub fn infer_type(path: &str, file_type: FileType) -> ContentType {
    if path.ends_with(NOTEBOOK_SUFFIX) {
        ContentType::Notebook
    } else if file_type == FileType::Directory {
        ContentType::Directory
    } else {
        ContentType::File
    }
}

/// Decode a file body for the requested format.
///
/// Without a request the body is returned as text if it is valid UTF-8 and as
/// base64 otherwise. A text request fails on invalid UTF-8; any other request
/// yields base64.
pub fn decode_file(
    path: &str,
    raw: Vec<u8>,
    requested: Option<Format>,
) -> Result<(String, Format), ContentsError> {
    match requested {
        None => match String::from_utf8(raw) {
            Ok(text) => Ok((text, Format::Text)),
            Err(err) => Ok((STANDARD.encode(err.as_bytes()), Format::Base64)),
        },
        Some(Format::Text) => String::from_utf8(raw)
            .map(|text| (text, Format::Text))
            .map_err(|_| ContentsError::Encoding {
                path: path.to_string(),
                reason: "not UTF-8 encoded".into(),
            }),
        Some(_) => Ok((STANDARD.encode(raw), Format::Base64)),
    }
}

/// Encode caller content into the bytes to store.
pub fn encode_file(path: &str, content: &str, format: Format) -> Result<Vec<u8>, ContentsError> {
    match format {
        Format::Text => Ok(content.as_bytes().to_vec()),
        Format::Base64 => {
            let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
            STANDARD
                .decode(compact)
                .map_err(|e| ContentsError::Encoding {
                    path: path.to_string(),
                    reason: e.to_string(),
                })
        }
        Format::Json => Err(ContentsError::BadRequest(
            "Must specify format of file contents as 'text' or 'base64'".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::JsonNotebookFormat;
    use crate::policy::HideGlobs;
    use chrono::{DateTime, Utc};

    const ROOT: &str = "/user/alice/notebooks";

    fn meta(logical: &str, file_type: FileType, size: u64) -> EntryMetadata {
        EntryMetadata {
            path: format!("{}/{}", ROOT, logical),
            file_type,
            size,
            modified: DateTime::<Utc>::MIN_UTC,
        }
    }

    fn with_builder<T>(f: impl FnOnce(&ContentModelBuilder<'_>) -> T) -> T {
        let mapper = PathMapper::new(ROOT, "/user/jupyter/notebooks");
        let listing = HideGlobs::default();
        let notebooks = JsonNotebookFormat::new();
        let builder = ContentModelBuilder::new(&mapper, &listing, &notebooks);
        f(&builder)
    }

    #[test]
    fn test_from_metadata_infers_type() {
        with_builder(|b| {
            let dir = b.from_metadata(&meta("proj", FileType::Directory, 0), None).unwrap();
            assert_eq!(dir.content_type, ContentType::Directory);
            assert_eq!(dir.size, None);
            assert_eq!(dir.mimetype, None);

            let nb = b.from_metadata(&meta("proj/a.ipynb", FileType::File, 10), None).unwrap();
            assert_eq!(nb.content_type, ContentType::Notebook);
            assert_eq!(nb.mimetype, None);

            let file = b.from_metadata(&meta("proj/a.csv", FileType::File, 3), None).unwrap();
            assert_eq!(file.content_type, ContentType::File);
            assert_eq!(file.name, "a.csv");
            assert_eq!(file.path, "proj/a.csv");
            assert_eq!(file.size, Some(3));
            assert_eq!(file.mimetype.as_deref(), Some("text/csv"));
            assert!(file.writable);
            assert!(file.content.is_none() && file.format.is_none());
        });
    }

    #[test]
    fn test_directory_filters_hidden_and_globs() {
        with_builder(|b| {
            let children = vec![
                meta("proj/x.txt", FileType::File, 2),
                meta("proj/.secret", FileType::File, 1),
                meta("proj/__pycache__", FileType::Directory, 0),
                meta("proj/sub", FileType::Directory, 0),
            ];
            let model = b
                .directory(&meta("proj", FileType::Directory, 0), Some(children))
                .unwrap();
            let names: Vec<_> = model.entries().unwrap().iter().map(|e| e.name.as_str()).collect();
            assert_eq!(names, vec!["x.txt", "sub"]);
            assert_eq!(model.format, Some(Format::Json));
        });
    }

    #[test]
    fn test_kind_mismatches() {
        with_builder(|b| {
            let err = b.directory(&meta("a.txt", FileType::File, 1), None).unwrap_err();
            assert!(matches!(err, ContentsError::NotADirectory(p) if p == "a.txt"));

            let err = b.file(&meta("d", FileType::Directory, 0), None, None).unwrap_err();
            assert!(matches!(err, ContentsError::NotAFile(_)));

            let err = b.notebook(&meta("gone.ipynb", FileType::NotFound, 0), None).unwrap_err();
            assert!(matches!(err, ContentsError::NotFound(_)));
        });
    }

    #[test]
    fn test_file_mimetype_fallbacks() {
        with_builder(|b| {
            let text = b
                .file(&meta("README", FileType::File, 2), Some(b"hi".to_vec()), None)
                .unwrap();
            assert_eq!(text.mimetype.as_deref(), Some("text/plain"));
            assert_eq!(text.format, Some(Format::Text));

            let binary = b
                .file(&meta("blob", FileType::File, 2), Some(vec![0xff, 0xfe]), None)
                .unwrap();
            assert_eq!(binary.mimetype.as_deref(), Some("application/octet-stream"));
            assert_eq!(binary.format, Some(Format::Base64));
            assert_eq!(binary.text(), Some("//4="));

            let png = b
                .file(&meta("img.png", FileType::File, 1), Some(vec![1]), Some(Format::Base64))
                .unwrap();
            assert_eq!(png.mimetype.as_deref(), Some("image/png"));
        });
    }

    #[test]
    fn test_decode_policy() {
        assert_eq!(
            decode_file("a", "héllo".as_bytes().to_vec(), Some(Format::Text)).unwrap(),
            ("héllo".to_string(), Format::Text)
        );
        assert_eq!(
            decode_file("a", b"hi".to_vec(), Some(Format::Base64)).unwrap(),
            ("aGk=".to_string(), Format::Base64)
        );
        let err = decode_file("a", vec![0xc3, 0x28], Some(Format::Text)).unwrap_err();
        assert!(matches!(err, ContentsError::Encoding { .. }));
    }

    #[test]
    fn test_encode_file() {
        assert_eq!(encode_file("a", "aGk=\n", Format::Base64).unwrap(), b"hi");
        assert!(matches!(
            encode_file("a", "!!!not base64", Format::Base64),
            Err(ContentsError::Encoding { .. })
        ));
        assert!(matches!(
            encode_file("a", "{}", Format::Json),
            Err(ContentsError::BadRequest(_))
        ));
    }

    #[test]
    fn test_notebook_validation_on_read() {
        with_builder(|b| {
            let valid = serde_json::to_vec(&crate::notebook::tests::sample()).unwrap();
            let model = b
                .notebook(&meta("ok.ipynb", FileType::File, 1), Some(valid))
                .unwrap();
            assert!(model.message.is_none());

            let invalid = br#"{"nbformat": 4, "nbformat_minor": 5, "metadata": {}, "cells": [{"cell_type": "widget"}]}"#;
            let model = b
                .notebook(&meta("odd.ipynb", FileType::File, 1), Some(invalid.to_vec()))
                .unwrap();
            assert!(model.message.as_deref().unwrap().starts_with("Notebook validation failed: cell 0"));
            assert_eq!(model.notebook().unwrap()["cells"][0]["cell_type"], "widget");
        });
    }

    #[test]
    fn test_notebook_parse_failure() {
        with_builder(|b| {
            let err = b
                .notebook(&meta("bad.ipynb", FileType::File, 3), Some(b"{{{".to_vec()))
                .unwrap_err();
            assert!(matches!(err, ContentsError::Parse { path, .. } if path == "bad.ipynb"));
        });
    }
}
