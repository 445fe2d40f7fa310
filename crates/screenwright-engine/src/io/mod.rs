//! Durable storage for screenplay documents.
//!
//! Documents persist as versioned JSON. Saves are atomic (temp file plus
//! rename) so a crash mid-write never leaves a torn file; loads validate
//! the restored tree and fall back to the starter document when the file is
//! corrupt, reporting why instead of crashing.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::editing::{BlockKind, Document, InvariantViolation};

mod autosave;
pub use autosave::{Autosave, DEFAULT_DEBOUNCE};

/// Current on-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Storage or serialization failure. The edit session is unaffected; the
/// caller decides whether to retry or surface it.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Why a stored document was unusable. Recovery is the starter document;
/// this value records what was wrong with the file.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorruptError {
    #[error("stored document is not valid JSON: {0}")]
    Unreadable(String),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),
    #[error("unknown block kind: {0:?}")]
    UnknownKind(String),
    #[error("stored document violates structure: {0}")]
    Invariant(#[from] InvariantViolation),
}

/// Result of a load: always a usable document, plus the corruption that
/// forced a fallback, if any.
#[derive(Debug)]
pub struct LoadOutcome {
    pub document: Document,
    pub corruption: Option<CorruptError>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    version: u32,
    blocks: Vec<StoredBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredBlock {
    // Kind travels as a string so unknown values are rejected explicitly
    // rather than failing somewhere inside a derived Deserialize
    kind: String,
    runs: Vec<StoredRun>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRun {
    text: String,
}

/// File-backed store for one screenplay.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `document` to disk. Total for any structurally valid document;
    /// idempotent (saving the same document twice writes the same bytes).
    pub fn save(&self, document: &Document) -> Result<(), PersistenceError> {
        let stored = StoredDocument {
            version: FORMAT_VERSION,
            blocks: document
                .blocks()
                .iter()
                .map(|block| StoredBlock {
                    kind: block.kind().as_str().to_string(),
                    runs: block
                        .runs()
                        .iter()
                        .map(|run| StoredRun {
                            text: run.text.clone(),
                        })
                        .collect(),
                })
                .collect(),
        };
        let json = serde_json::to_vec_pretty(&stored)?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent)?;
                parent
            }
            _ => Path::new("."),
        };
        // Atomic replace: a concurrent load sees either the old or the new
        // file, never a partial write
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(&json)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Read the stored document. A missing file yields the starter document
    /// with no corruption; an unusable file yields the starter document and
    /// the reason.
    pub fn load(&self) -> Result<LoadOutcome, PersistenceError> {
        if !self.path.exists() {
            return Ok(LoadOutcome {
                document: Document::starter(),
                corruption: None,
            });
        }
        let content = fs::read_to_string(&self.path)?;
        match restore(&content) {
            Ok(document) => Ok(LoadOutcome {
                document,
                corruption: None,
            }),
            Err(corruption) => {
                warn!(path = %self.path.display(), error = %corruption, "stored document unusable, falling back to starter");
                Ok(LoadOutcome {
                    document: Document::starter(),
                    corruption: Some(corruption),
                })
            }
        }
    }
}

fn restore(content: &str) -> Result<Document, CorruptError> {
    let stored: StoredDocument =
        serde_json::from_str(content).map_err(|e| CorruptError::Unreadable(e.to_string()))?;
    if stored.version != FORMAT_VERSION {
        return Err(CorruptError::UnsupportedVersion(stored.version));
    }

    let mut blocks = Vec::with_capacity(stored.blocks.len());
    for block in stored.blocks {
        let kind: BlockKind = block
            .kind
            .parse()
            .map_err(|e: crate::editing::UnknownKind| CorruptError::UnknownKind(e.0))?;
        blocks.push((kind, block.runs.into_iter().map(|run| run.text)));
    }
    let document = Document::from_blocks(blocks);
    document.validate()?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::BlockKind;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> Store {
        Store::new(dir.path().join("screenplay.json"))
    }

    #[test]
    fn load_on_empty_storage_returns_starter() {
        let dir = TempDir::new().unwrap();
        let outcome = store_in(&dir).load().unwrap();
        assert_eq!(outcome.document, Document::starter());
        assert_eq!(outcome.corruption, None);
    }

    #[test]
    fn save_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let doc = Document::from_blocks(vec![
            (BlockKind::SceneHeading, vec!["EXT. ALLEY – DAY".to_string()]),
            (
                BlockKind::Dialogue,
                vec!["Two ".to_string(), "runs".to_string()],
            ),
        ]);
        store.save(&doc).unwrap();
        let outcome = store.load().unwrap();
        assert_eq!(outcome.document, doc);
        assert_eq!(outcome.corruption, None);
        // Run structure survives, not just joined text
        assert_eq!(outcome.document.block(1).unwrap().runs().len(), 2);
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("nested/deeper/screenplay.json"));
        store.save(&Document::starter()).unwrap();
        assert!(store.path().exists());
    }

    #[test]
    fn save_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let doc = Document::starter();
        store.save(&doc).unwrap();
        let first = fs::read_to_string(store.path()).unwrap();
        store.save(&doc).unwrap();
        let second = fs::read_to_string(store.path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_kind_falls_back_with_report() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.save(&Document::starter()).unwrap();
        let tampered = fs::read_to_string(store.path())
            .unwrap()
            .replace("scene_heading", "montage");
        fs::write(store.path(), tampered).unwrap();

        let outcome = store.load().unwrap();
        assert_eq!(outcome.document, Document::starter());
        assert_eq!(
            outcome.corruption,
            Some(CorruptError::UnknownKind("montage".to_string()))
        );
    }

    #[test]
    fn garbage_json_falls_back_with_report() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "not json at all").unwrap();
        let outcome = store.load().unwrap();
        assert_eq!(outcome.document, Document::starter());
        assert!(matches!(
            outcome.corruption,
            Some(CorruptError::Unreadable(_))
        ));
    }

    #[test]
    fn future_version_falls_back_with_report() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"version": 2, "blocks": []}"#).unwrap();
        let outcome = store.load().unwrap();
        assert_eq!(
            outcome.corruption,
            Some(CorruptError::UnsupportedVersion(2))
        );
    }

    #[test]
    fn structurally_invalid_file_falls_back_with_report() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), r#"{"version": 1, "blocks": []}"#).unwrap();
        let outcome = store.load().unwrap();
        assert_eq!(
            outcome.corruption,
            Some(CorruptError::Invariant(InvariantViolation::EmptyDocument))
        );

        fs::write(
            store.path(),
            r#"{"version": 1, "blocks": [{"kind": "action", "runs": []}]}"#,
        )
        .unwrap();
        let outcome = store.load().unwrap();
        assert_eq!(
            outcome.corruption,
            Some(CorruptError::Invariant(InvariantViolation::EmptyBlock {
                index: 0
            }))
        );
    }

    #[test]
    fn wire_format_matches_the_documented_shape() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store
            .save(&Document::from_parts(&[(BlockKind::Character, "EVE")]))
            .unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["blocks"][0]["kind"], "character");
        assert_eq!(value["blocks"][0]["runs"][0]["text"], "EVE");
    }
}
