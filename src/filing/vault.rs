//! Notes vault scanning and markdown note generation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::config::VaultConfig;
use crate::state::Node;

use super::FilingSuggestion;

/// Folder and note layout of the vault, fed into the filing prompt.
#[derive(Debug, Clone, Default)]
pub struct VaultStructure {
    /// Folder paths relative to the vault root.
    pub folders: Vec<String>,
    /// Markdown note paths relative to the vault root.
    pub notes: Vec<String>,
}

/// Walk the vault, skipping hidden directories and the assets folder.
pub fn scan_vault_structure(vault_path: &Path, assets_folder: &str) -> io::Result<VaultStructure> {
    let mut structure = VaultStructure::default();
    walk(vault_path, vault_path, assets_folder, &mut structure)?;
    structure.folders.sort();
    structure.notes.sort();
    info!(
        folders = structure.folders.len(),
        notes = structure.notes.len(),
        "vault scanned"
    );
    Ok(structure)
}

fn walk(
    root: &Path,
    dir: &Path,
    assets_folder: &str,
    structure: &mut VaultStructure,
) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if name.starts_with('.') || name == assets_folder {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(root) {
                structure.folders.push(rel.to_string_lossy().into_owned());
            }
            walk(root, &path, assets_folder, structure)?;
        } else if name.ends_with(".md")
            && let Ok(rel) = path.strip_prefix(root)
        {
            structure.notes.push(rel.to_string_lossy().into_owned());
        }
    }
    Ok(())
}

/// Write the chain as one markdown note at the suggested path.
/// Returns the absolute path of the written note.
pub fn write_note(
    vault: &VaultConfig,
    vault_path: &Path,
    chain: &[&Node],
    source_title: &str,
    suggestion: &FilingSuggestion,
) -> io::Result<PathBuf> {
    let full_path = vault_path.join(&suggestion.target_path);
    if let Some(parent) = full_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let content = note_content(vault, chain, source_title, suggestion);
    fs::write(&full_path, content)?;
    info!(path = %full_path.display(), "note written");
    Ok(full_path)
}

fn note_content(
    vault: &VaultConfig,
    chain: &[&Node],
    source_title: &str,
    suggestion: &FilingSuggestion,
) -> String {
    let mut tags = vault.default_tags.clone();
    tags.extend(suggestion.tags.iter().cloned());
    let now = Local::now();

    let mut out = format!(
        "---\ntags: [{}]\nsource: {}\ncreated: {}\n---\n\n",
        tags.join(", "),
        source_title,
        now.to_rfc3339(),
    );

    let main_title = chain.first().map(|n| n.question.as_str()).unwrap_or("Untitled note");
    out.push_str(&format!("# {}\n\n", main_title));

    for (i, node) in chain.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("{}\n\n", node.answer));
        } else {
            out.push_str(&format!("## Follow-up {}: {}\n\n{}\n\n", i, node.question, node.answer));
        }
        out.push_str("---\n\n");
    }

    out.push_str("## Source\n\n");
    out.push_str(&format!("- **Document**: [[{}]]\n", source_title));
    out.push_str(&format!("- **Asked**: {}\n", now.format("%Y-%m-%d %H:%M")));
    if chain.len() > 1 {
        out.push_str(&format!("- **Thread length**: {} follow-ups\n", chain.len() - 1));
    }
    out.push('\n');

    if !suggestion.suggested_links.is_empty() {
        out.push_str("## Related\n\n");
        for link in &suggestion.suggested_links {
            out.push_str(&format!("- [[{}]]\n", link));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Tree;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn temp_vault() -> PathBuf {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("reader-vault-{}-{}", std::process::id(), n));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn suggestion(path: &str) -> FilingSuggestion {
        FilingSuggestion {
            target_path: path.to_string(),
            is_new_folder: true,
            reasoning: String::new(),
            suggested_links: vec!["Transformer".to_string()],
            tags: vec!["ml".to_string()],
        }
    }

    #[test]
    fn scan_skips_hidden_and_assets() {
        let vault = temp_vault();
        fs::create_dir_all(vault.join("ml/deep")).unwrap();
        fs::create_dir_all(vault.join(".obsidian")).unwrap();
        fs::create_dir_all(vault.join("attachments")).unwrap();
        fs::write(vault.join("ml/note.md"), "x").unwrap();
        fs::write(vault.join("ml/data.csv"), "x").unwrap();
        fs::write(vault.join(".obsidian/state.md"), "x").unwrap();

        let s = scan_vault_structure(&vault, "attachments").unwrap();
        assert_eq!(s.folders, vec!["ml".to_string(), "ml/deep".to_string()]);
        assert_eq!(s.notes, vec!["ml/note.md".to_string()]);
    }

    #[test]
    fn note_contains_chain_and_frontmatter() {
        let vault_cfg = VaultConfig {
            path: None,
            assets_folder: "attachments".to_string(),
            default_tags: vec!["paper".to_string()],
        };
        let mut tree = Tree::new("attention");
        let root = tree.add_node("What is attention?", "A weighting scheme.", "s", None).unwrap();
        let child = tree.add_node("Why softmax?", "Normalization.", "s", Some(root)).unwrap();

        let content =
            note_content(&vault_cfg, &tree.chain(child), "attention", &suggestion("ml/a.md"));
        assert!(content.starts_with("---\ntags: [paper, ml]\n"));
        assert!(content.contains("# What is attention?"));
        assert!(content.contains("A weighting scheme."));
        assert!(content.contains("## Follow-up 1: Why softmax?"));
        assert!(content.contains("- **Document**: [[attention]]"));
        assert!(content.contains("- [[Transformer]]"));
    }

    #[test]
    fn write_note_creates_missing_folders() {
        let vault = temp_vault();
        let vault_cfg = VaultConfig {
            path: Some(vault.clone()),
            assets_folder: "attachments".to_string(),
            default_tags: Vec::new(),
        };
        let mut tree = Tree::new("t");
        let root = tree.add_node("Q?", "A.", "s", None).unwrap();

        let path =
            write_note(&vault_cfg, &vault, &tree.chain(root), "t", &suggestion("new/deep/n.md"))
                .unwrap();
        assert_eq!(path, vault.join("new/deep/n.md"));
        assert!(fs::read_to_string(path).unwrap().contains("# Q?"));
    }
}
