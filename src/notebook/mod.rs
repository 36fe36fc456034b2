//! Notebook documents
//!
//! The store treats notebooks through [`NotebookFormat`]; parsing,
//! serialisation, trust signing and validation all live behind it.
//! [`JsonNotebookFormat`] handles nbformat 4 JSON documents.

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod notary;

pub use notary::{DEFAULT_SIGNATURE_CACHE_SIZE, Notary};

/// Major document version this crate reads and writes.
pub const NBFORMAT: u64 = 4;

#[derive(Debug, Error)]
pub enum NotebookError {
    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Validation(String),

    #[error("failed to serialize notebook: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A parsed notebook document.
#[derive(Debug, Clone, PartialEq)]
pub struct Notebook(Value);

impl Notebook {
    /// Wraps a JSON value, checking that it is an nbformat 4 object.
    pub fn from_value(value: Value) -> Result<Self, NotebookError> {
        let Some(object) = value.as_object() else {
            return Err(NotebookError::Parse("notebook must be a JSON object".into()));
        };
        match object.get("nbformat").and_then(Value::as_u64) {
            Some(NBFORMAT) => Ok(Self(value)),
            Some(other) => Err(NotebookError::Parse(format!(
                "unsupported nbformat version {}",
                other
            ))),
            None => Err(NotebookError::Parse("missing nbformat version".into())),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }

    /// Mutable access to every code cell.
    pub fn code_cells_mut(&mut self) -> impl Iterator<Item = &mut Map<String, Value>> {
        self.0
            .get_mut("cells")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object_mut)
            .filter(|cell| cell.get("cell_type").and_then(Value::as_str) == Some("code"))
    }

    /// Code cells, read-only.
    pub fn code_cells(&self) -> impl Iterator<Item = &Map<String, Value>> {
        self.0
            .get("cells")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .filter(|cell| cell.get("cell_type").and_then(Value::as_str) == Some("code"))
    }
}

/// Collaborator owning the notebook document format.
pub trait NotebookFormat: Send + Sync {
    /// Parse stored bytes into a document.
    fn parse(&self, bytes: &[u8]) -> Result<Notebook, NotebookError>;

    /// Build a document from caller-supplied model content.
    fn from_model(&self, content: &Value) -> Result<Notebook, NotebookError>;

    /// Canonical byte form of a document.
    fn serialize(&self, notebook: &Notebook) -> Result<Vec<u8>, NotebookError>;

    /// Sign a document about to be saved at `path`, if it is trusted.
    fn sign(&self, notebook: &mut Notebook, path: &str);

    /// Mark cells of a document read from `path` as trusted or not.
    fn mark_trusted(&self, notebook: &mut Notebook, path: &str);

    /// Check the structural shape of model content.
    fn validate(&self, content: &Value) -> Result<(), NotebookError>;
}

/// nbformat 4 JSON documents with an in-process signature store.
#[derive(Debug, Default)]
pub struct JsonNotebookFormat {
    notary: Notary,
}

impl JsonNotebookFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Format whose notary remembers at most `size` trusted digests.
    pub fn with_cache_size(size: usize) -> Self {
        Self {
            notary: Notary::with_capacity(size),
        }
    }

    pub fn notary(&self) -> &Notary {
        &self.notary
    }
}

impl NotebookFormat for JsonNotebookFormat {
    fn parse(&self, bytes: &[u8]) -> Result<Notebook, NotebookError> {
        let value: Value =
            serde_json::from_slice(bytes).map_err(|e| NotebookError::Parse(e.to_string()))?;
        Notebook::from_value(value)
    }

    fn from_model(&self, content: &Value) -> Result<Notebook, NotebookError> {
        Notebook::from_value(content.clone())
    }

    fn serialize(&self, notebook: &Notebook) -> Result<Vec<u8>, NotebookError> {
        let canonical = sorted(strip_transient(notebook.as_value()));
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b" ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        canonical.serialize(&mut serializer)?;
        out.push(b'\n');
        Ok(out)
    }

    fn sign(&self, notebook: &mut Notebook, path: &str) {
        self.notary.check_and_sign(notebook, path);
    }

    fn mark_trusted(&self, notebook: &mut Notebook, _path: &str) {
        let trusted = self.notary.check_signature(notebook);
        self.notary.mark_cells(notebook, trusted);
    }

    fn validate(&self, content: &Value) -> Result<(), NotebookError> {
        validate_v4(content).map_err(NotebookError::Validation)
    }
}

/// Copy of a document without fields that are never persisted.
pub(crate) fn strip_transient(value: &Value) -> Value {
    let mut value = value.clone();
    if let Some(metadata) = value.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("signature");
        metadata.remove("orig_nbformat");
        metadata.remove("orig_nbformat_minor");
    }
    if let Some(cells) = value.get_mut("cells").and_then(Value::as_array_mut) {
        for cell in cells {
            if let Some(metadata) = cell.get_mut("metadata").and_then(Value::as_object_mut) {
                metadata.remove("trusted");
            }
        }
    }
    value
}

/// Rebuild every object with its keys in sorted order.
pub(crate) fn sorted(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<_> = object.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(entries.into_iter().map(|(k, v)| (k, sorted(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

fn validate_v4(content: &Value) -> Result<(), String> {
    let nb = content.as_object().ok_or("notebook must be a JSON object")?;

    match nb.get("nbformat").and_then(Value::as_u64) {
        Some(NBFORMAT) => {}
        _ => return Err(format!("nbformat must be {}", NBFORMAT)),
    }
    if nb.get("nbformat_minor").and_then(Value::as_u64).is_none() {
        return Err("nbformat_minor must be a non-negative integer".into());
    }
    if !nb.get("metadata").is_some_and(Value::is_object) {
        return Err("metadata must be an object".into());
    }
    let cells = nb
        .get("cells")
        .and_then(Value::as_array)
        .ok_or("cells must be an array")?;

    for (index, cell) in cells.iter().enumerate() {
        validate_cell(cell).map_err(|reason| format!("cell {}: {}", index, reason))?;
    }
    Ok(())
}

fn validate_cell(cell: &Value) -> Result<(), String> {
    let cell = cell.as_object().ok_or("cell must be an object")?;

    let cell_type = cell
        .get("cell_type")
        .and_then(Value::as_str)
        .ok_or("missing cell_type")?;
    if !matches!(cell_type, "code" | "markdown" | "raw") {
        return Err(format!("unknown cell_type {:?}", cell_type));
    }

    let source_ok = match cell.get("source") {
        Some(Value::String(_)) => true,
        Some(Value::Array(lines)) => lines.iter().all(Value::is_string),
        _ => false,
    };
    if !source_ok {
        return Err("source must be a string or a list of strings".into());
    }
    if !cell.get("metadata").is_some_and(Value::is_object) {
        return Err("metadata must be an object".into());
    }

    if cell_type == "code" {
        if !cell.get("outputs").is_some_and(Value::is_array) {
            return Err("code cell outputs must be an array".into());
        }
        match cell.get("execution_count") {
            Some(Value::Null) => {}
            Some(count) if count.is_u64() => {}
            _ => return Err("execution_count must be null or an integer".into()),
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample() -> Value {
        json!({
            "nbformat": 4,
            "nbformat_minor": 5,
            "metadata": {"kernelspec": {"name": "python3"}},
            "cells": [
                {"cell_type": "markdown", "metadata": {}, "source": "# Title"},
                {
                    "cell_type": "code",
                    "metadata": {},
                    "source": ["print(1)\n"],
                    "execution_count": 1,
                    "outputs": [{"output_type": "stream", "name": "stdout", "text": "1\n"}]
                }
            ]
        })
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let format = JsonNotebookFormat::new();
        assert!(matches!(format.parse(b"{not json"), Err(NotebookError::Parse(_))));
        assert!(matches!(format.parse(b"[1, 2]"), Err(NotebookError::Parse(_))));
        let old = serde_json::to_vec(&json!({"nbformat": 3, "worksheets": []})).unwrap();
        assert!(matches!(format.parse(&old), Err(NotebookError::Parse(_))));
    }

    #[test]
    fn test_serialize_is_canonical() {
        let format = JsonNotebookFormat::new();
        let mut value = sample();
        value["metadata"]["signature"] = json!("sha256:abc");
        value["cells"][1]["metadata"]["trusted"] = json!(true);
        let notebook = Notebook::from_value(value).unwrap();

        let text = String::from_utf8(format.serialize(&notebook).unwrap()).unwrap();
        assert!(text.starts_with("{\n \"cells\": ["));
        assert!(text.ends_with("}\n"));
        assert!(!text.contains("signature"));
        assert!(!text.contains("trusted"));

        let reparsed = format.parse(text.as_bytes()).unwrap();
        assert_eq!(reparsed.as_value()["cells"][1]["source"], json!(["print(1)\n"]));
    }

    #[test]
    fn test_cache_size_bounds_notary() {
        let format = JsonNotebookFormat::with_cache_size(1);
        let mut first = Notebook::from_value(sample()).unwrap();
        let mut value = sample();
        value["cells"][0]["source"] = json!("# Other");
        let mut second = Notebook::from_value(value).unwrap();

        format.sign(&mut first, "a.ipynb");
        format.sign(&mut second, "b.ipynb");
        assert_eq!(format.notary().len(), 1);
        assert!(!format.notary().check_signature(&first));
        assert!(format.notary().check_signature(&second));
    }

    #[test]
    fn test_validate() {
        let format = JsonNotebookFormat::new();
        assert!(format.validate(&sample()).is_ok());

        let mut bad = sample();
        bad["cells"][0]["cell_type"] = json!("widget");
        let err = format.validate(&bad).unwrap_err();
        assert!(err.to_string().contains("cell 0"));

        let mut bad = sample();
        bad["cells"][1].as_object_mut().unwrap().remove("outputs");
        assert!(format.validate(&bad).is_err());

        assert!(format.validate(&json!({"nbformat": 4})).is_err());
    }
}
