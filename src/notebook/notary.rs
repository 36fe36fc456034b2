//! Notebook trust signing
//!
//! A document is trusted when its digest has been recorded by a previous
//! save of a trusted document. Output of untrusted documents should not be
//! rendered as active content by the request layer. The digest store is
//! bounded; once full, the least recently signed digests are dropped first.

use log::warn;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use crate::notebook::{Notebook, sorted, strip_transient};

/// Output types that may carry active content.
const UNSAFE_OUTPUTS: [&str; 2] = ["execute_result", "display_data"];

/// Digests remembered by default before culling starts.
pub const DEFAULT_SIGNATURE_CACHE_SIZE: usize = 65535;

#[derive(Debug)]
pub struct Notary {
    signatures: Mutex<SignatureStore>,
}

#[derive(Debug)]
struct SignatureStore {
    known: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl SignatureStore {
    fn insert(&mut self, signature: String) {
        if self.known.contains(&signature) {
            self.order.retain(|seen| seen != &signature);
        } else {
            while self.order.len() >= self.capacity {
                match self.order.pop_front() {
                    Some(oldest) => {
                        self.known.remove(&oldest);
                    }
                    None => break,
                }
            }
            self.known.insert(signature.clone());
        }
        self.order.push_back(signature);
    }
}

impl Default for Notary {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_SIGNATURE_CACHE_SIZE)
    }
}

impl Notary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notary remembering at most `capacity` digests (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            signatures: Mutex::new(SignatureStore {
                known: HashSet::new(),
                order: VecDeque::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Number of digests currently remembered.
    pub fn len(&self) -> usize {
        self.signatures.lock().map(|store| store.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hex SHA-256 of the document's persisted form.
    pub fn compute_signature(&self, notebook: &Notebook) -> String {
        let canonical = sorted(strip_transient(notebook.as_value()));
        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether every code cell is either marked trusted or has no output
    /// that could carry active content.
    pub fn check_cells(&self, notebook: &Notebook) -> bool {
        notebook.code_cells().all(|cell| {
            let marked = cell
                .get("metadata")
                .and_then(|m| m.get("trusted"))
                .and_then(Value::as_bool)
                .unwrap_or(false);
            marked || !has_unsafe_output(cell.get("outputs"))
        })
    }

    pub fn sign(&self, notebook: &Notebook) {
        let signature = self.compute_signature(notebook);
        if let Ok(mut signatures) = self.signatures.lock() {
            signatures.insert(signature);
        }
    }

    pub fn check_signature(&self, notebook: &Notebook) -> bool {
        let signature = self.compute_signature(notebook);
        self.signatures
            .lock()
            .map(|signatures| signatures.known.contains(&signature))
            .unwrap_or(false)
    }

    /// Sign the document if its cells are trusted.
    pub fn check_and_sign(&self, notebook: &Notebook, path: &str) {
        if self.check_cells(notebook) {
            self.sign(notebook);
        } else {
            warn!("Notebook {} is not trusted", path);
        }
    }

    /// Set `metadata.trusted` on every code cell.
    pub fn mark_cells(&self, notebook: &mut Notebook, trusted: bool) {
        for cell in notebook.code_cells_mut() {
            let metadata = cell
                .entry("metadata")
                .or_insert_with(|| Value::Object(Default::default()));
            if let Some(metadata) = metadata.as_object_mut() {
                metadata.insert("trusted".into(), Value::Bool(trusted));
            }
        }
    }
}

fn has_unsafe_output(outputs: Option<&Value>) -> bool {
    outputs
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .any(|output| {
            output
                .get("output_type")
                .and_then(Value::as_str)
                .is_some_and(|kind| UNSAFE_OUTPUTS.contains(&kind))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notebook::tests::sample;
    use serde_json::json;

    #[test]
    fn test_sign_then_check() {
        let notary = Notary::new();
        let notebook = Notebook::from_value(sample()).unwrap();
        assert!(!notary.check_signature(&notebook));

        notary.check_and_sign(&notebook, "nb.ipynb");
        assert!(notary.check_signature(&notebook));

        // Transient trust flags do not change the digest.
        let mut marked = notebook.clone();
        notary.mark_cells(&mut marked, true);
        assert!(notary.check_signature(&marked));
    }

    #[test]
    fn test_unsafe_output_blocks_signing() {
        let notary = Notary::new();
        let mut value = sample();
        value["cells"][1]["outputs"] = json!([
            {"output_type": "display_data", "data": {"text/html": "<script></script>"}, "metadata": {}}
        ]);
        let notebook = Notebook::from_value(value.clone()).unwrap();
        assert!(!notary.check_cells(&notebook));
        notary.check_and_sign(&notebook, "nb.ipynb");
        assert!(!notary.check_signature(&notebook));

        value["cells"][1]["metadata"]["trusted"] = json!(true);
        let notebook = Notebook::from_value(value).unwrap();
        assert!(notary.check_cells(&notebook));
    }

    #[test]
    fn test_oldest_signatures_are_culled() {
        let notary = Notary::with_capacity(2);
        assert!(notary.is_empty());
        let versions: Vec<_> = (0..3)
            .map(|i| {
                let mut value = sample();
                value["cells"][0]["source"] = json!(format!("# Version {}", i));
                Notebook::from_value(value).unwrap()
            })
            .collect();

        notary.sign(&versions[0]);
        notary.sign(&versions[1]);
        // Signing again makes a digest the most recent one.
        notary.sign(&versions[0]);
        notary.sign(&versions[2]);

        assert_eq!(notary.len(), 2);
        assert!(notary.check_signature(&versions[0]));
        assert!(!notary.check_signature(&versions[1]));
        assert!(notary.check_signature(&versions[2]));
    }

    #[test]
    fn test_mark_cells_only_touches_code() {
        let notary = Notary::new();
        let mut notebook = Notebook::from_value(sample()).unwrap();
        notary.mark_cells(&mut notebook, false);
        let value = notebook.as_value();
        assert_eq!(value["cells"][1]["metadata"]["trusted"], json!(false));
        assert!(value["cells"][0]["metadata"].get("trusted").is_none());
    }
}
