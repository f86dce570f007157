//! Load/save of tree records.
//!
//! One JSON file per content item under the data directory, named
//! `qa_tree_<key>.json`. Saves replace the record atomically (write to a
//! temp file, then rename) so a crash mid-write never tears the sole
//! source of truth.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::constants::TREE_FILE_PREFIX;
use crate::state::Tree;

#[derive(Debug)]
pub enum StoreError {
    /// Record exists but does not parse or violates tree invariants.
    /// The on-disk file is left untouched.
    CorruptRecord { path: PathBuf, detail: String },
    Io(std::io::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::CorruptRecord { path, detail } => {
                write!(f, "corrupt record {}: {}", path.display(), detail)
            }
            StoreError::Io(e) => write!(f, "storage I/O error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

/// Derive a stable content key from a title or file stem.
pub fn slugify(name: &str) -> String {
    let mut slug = String::new();
    for c in name.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub struct TreeStore {
    data_dir: PathBuf,
}

impl TreeStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}{}.json", TREE_FILE_PREFIX, key))
    }

    /// Load the record for `key`, or an empty tree if none exists.
    pub fn load(&self, key: &str) -> Result<Tree, StoreError> {
        let path = self.record_path(key);
        if !path.exists() {
            debug!(key, "no record on disk, starting empty tree");
            return Ok(Tree::new(key));
        }
        let content = fs::read_to_string(&path)?;
        let tree: Tree = serde_json::from_str(&content)
            .map_err(|e| StoreError::CorruptRecord { path: path.clone(), detail: e.to_string() })?;
        tree.validate().map_err(|detail| StoreError::CorruptRecord { path: path.clone(), detail })?;
        info!(key, nodes = tree.len(), "loaded tree record");
        Ok(tree)
    }

    /// Atomically replace the record for the tree's key.
    pub fn save(&self, tree: &Tree) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.record_path(&tree.key);
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(tree)
            .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
        fs::write(&tmp, &content)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }
        debug!(key = %tree.key, nodes = tree.len(), "saved tree record");
        Ok(())
    }

    /// Keys of all persisted trees in the data directory.
    pub fn list_keys(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.data_dir) else {
            return Vec::new();
        };
        let mut keys: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().into_string().ok()?;
                let stem = name.strip_suffix(".json")?;
                stem.strip_prefix(TREE_FILE_PREFIX).map(|k| k.to_string())
            })
            .collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_store() -> TreeStore {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("reader-store-{}-{}", std::process::id(), n));
        TreeStore::new(dir)
    }

    #[test]
    fn load_missing_returns_empty() {
        let store = temp_store();
        let tree = store.load("nothing-here").unwrap();
        assert!(tree.is_empty());
        assert_eq!(tree.key, "nothing-here");
    }

    #[test]
    fn save_load_round_trip_is_byte_identical() {
        let store = temp_store();
        let mut tree = Tree::new("paper");
        let r = tree.add_node("q1", "a1", "s1", None).unwrap();
        tree.add_node("q2", "a2", "s2", Some(r)).unwrap();
        store.save(&tree).unwrap();

        let first = fs::read(store.record_path("paper")).unwrap();
        let loaded = store.load("paper").unwrap();
        store.save(&loaded).unwrap();
        let second = fs::read(store.record_path("paper")).unwrap();
        assert_eq!(first, second);

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(r).unwrap().children.len(), 1);
    }

    #[test]
    fn corrupt_json_is_surfaced_and_left_on_disk() {
        let store = temp_store();
        fs::create_dir_all(&store.data_dir).unwrap();
        let path = store.record_path("bad");
        fs::write(&path, "{ not json").unwrap();
        match store.load("bad") {
            Err(StoreError::CorruptRecord { .. }) => {}
            other => panic!("expected CorruptRecord, got {:?}", other.map(|t| t.key)),
        }
        // the original bytes survive
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn structurally_invalid_record_is_corrupt() {
        let store = temp_store();
        fs::create_dir_all(&store.data_dir).unwrap();
        // parses as a Tree but child #1 does not exist
        let json = r#"{
            "key": "bad2",
            "nodes": [{
                "id": 0, "question": "q", "answer": "a", "summary": "s",
                "created_at": "2026-01-02T03:04:05+00:00",
                "parent": null, "children": [1]
            }],
            "roots": [0]
        }"#;
        fs::write(store.record_path("bad2"), json).unwrap();
        assert!(matches!(store.load("bad2"), Err(StoreError::CorruptRecord { .. })));
    }

    #[test]
    fn save_leaves_no_temp_file() {
        let store = temp_store();
        let tree = Tree::new("tidy");
        store.save(&tree).unwrap();
        assert!(!store.record_path("tidy").with_extension("json.tmp").exists());
    }

    #[test]
    fn list_keys_finds_saved_records() {
        let store = temp_store();
        store.save(&Tree::new("alpha")).unwrap();
        store.save(&Tree::new("beta")).unwrap();
        assert_eq!(store.list_keys(), vec!["alpha", "beta"]);
    }

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("Attention Is All You Need"), "attention-is-all-you-need");
        assert_eq!(slugify("  a//b?? "), "a-b");
        assert_eq!(slugify("2024_survey.pdf"), "2024-survey-pdf");
    }
}
