//! Filing: classify a Q&A chain into the notes vault.
//!
//! The model proposes where a chain belongs given the vault's folder
//! layout; a parse or provider failure falls back to a fixed inbox
//! location so filing never blocks on the API.

pub mod vault;

use serde::Deserialize;
use tracing::{error, info};

use crate::constants::{FILING_ANSWER_EXCERPT_CHARS, FILING_MAX_FOLDERS};
use crate::llms::Answerer;
use crate::state::{Node, NodeId, Tree};

pub use vault::{VaultStructure, scan_vault_structure, write_note};

/// Placement proposal for one Q&A chain.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct FilingSuggestion {
    /// Note path relative to the vault root.
    pub target_path: String,
    #[serde(default)]
    pub is_new_folder: bool,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub suggested_links: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Ask the model where the chain ending at `id` belongs. Falls back to
/// the inbox suggestion when the call or the parse fails.
pub fn analyze_placement(
    answerer: &dyn Answerer,
    tree: &Tree,
    id: NodeId,
    structure: &VaultStructure,
) -> FilingSuggestion {
    let chain = tree.chain(id);
    let prompt = build_prompt(&chain, &tree.key, structure);
    match answerer.complete(&prompt) {
        Ok(response) => match parse_response(&response) {
            Ok(suggestion) => {
                info!(path = %suggestion.target_path, "placement suggested");
                suggestion
            }
            Err(detail) => {
                error!(%detail, "placement response unusable, filing to inbox");
                default_suggestion(&chain)
            }
        },
        Err(e) => {
            error!(error = %e, "placement call failed, filing to inbox");
            default_suggestion(&chain)
        }
    }
}

fn build_prompt(chain: &[&Node], title: &str, structure: &VaultStructure) -> String {
    let mut qa_text = String::new();
    for (i, node) in chain.iter().enumerate() {
        let excerpt: String = node.answer.chars().take(FILING_ANSWER_EXCERPT_CHARS).collect();
        qa_text.push_str(&format!("Question {}: {}\n", i + 1, node.question));
        qa_text.push_str(&format!("Answer {}: {}...\n\n", i + 1, excerpt));
    }
    let folders: Vec<&str> = structure
        .folders
        .iter()
        .take(FILING_MAX_FOLDERS)
        .map(String::as_str)
        .collect();

    format!(
        "Decide where the following Q&A thread belongs in a notes vault.\n\n\
         ## Thread\n{qa}\n\
         ## Source document\n{title}\n\n\
         ## Existing vault folders\n{folders}\n\n\
         ## Task\n\
         1. Identify the topic of the thread.\n\
         2. Pick the best-matching existing folder, or propose a new one when none fits.\n\
         3. Choose a short, descriptive note filename.\n\n\
         Reply with ONLY this JSON, no other text:\n\
         {{\n\
           \"target_path\": \"relative/path/to/note.md\",\n\
           \"is_new_folder\": false,\n\
           \"reasoning\": \"one sentence\",\n\
           \"suggested_links\": [\"related note\"],\n\
           \"tags\": [\"tag\"]\n\
         }}",
        qa = qa_text,
        title = title,
        folders = folders.join("\n"),
    )
}

/// Parse the model reply, stripping a markdown code fence if present.
pub fn parse_response(response: &str) -> Result<FilingSuggestion, String> {
    let json_str = if let Some(rest) = response.split("```json").nth(1) {
        rest.split("```").next().unwrap_or("").trim()
    } else if let Some(rest) = response.split("```").nth(1) {
        rest.trim()
    } else {
        response.trim()
    };
    let suggestion: FilingSuggestion =
        serde_json::from_str(json_str).map_err(|e| e.to_string())?;
    if suggestion.target_path.trim().is_empty() {
        return Err("empty target_path".to_string());
    }
    Ok(suggestion)
}

/// Inbox placement used when classification is unavailable.
pub fn default_suggestion(chain: &[&Node]) -> FilingSuggestion {
    let filename = chain
        .first()
        .map(|node| {
            let stem: String = node
                .question
                .chars()
                .take(30)
                .map(|c| if c == '/' || c == '?' { '-' } else { c })
                .collect();
            format!("{}.md", stem.trim())
        })
        .unwrap_or_else(|| "untitled.md".to_string());
    FilingSuggestion {
        target_path: format!("inbox/{}", filename),
        is_new_folder: false,
        reasoning: "classification unavailable".to_string(),
        suggested_links: Vec::new(),
        tags: vec!["unsorted".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Tree;

    #[test]
    fn parse_bare_json() {
        let raw = r#"{"target_path": "ml/attention.md", "is_new_folder": true,
                      "reasoning": "about attention", "suggested_links": ["Transformer"],
                      "tags": ["ml"]}"#;
        let s = parse_response(raw).unwrap();
        assert_eq!(s.target_path, "ml/attention.md");
        assert!(s.is_new_folder);
        assert_eq!(s.suggested_links, vec!["Transformer"]);
    }

    #[test]
    fn parse_fenced_json() {
        let raw = "Here you go:\n```json\n{\"target_path\": \"a/b.md\"}\n```\nHope that helps!";
        let s = parse_response(raw).unwrap();
        assert_eq!(s.target_path, "a/b.md");
        assert!(!s.is_new_folder);
        assert!(s.tags.is_empty());
    }

    #[test]
    fn parse_unfenced_garbage_is_error() {
        assert!(parse_response("I think it should go in ml/").is_err());
        assert!(parse_response("{\"target_path\": \"\"}").is_err());
    }

    #[test]
    fn default_uses_first_question() {
        let mut tree = Tree::new("paper");
        let root = tree.add_node("What is attention?", "a", "s", None).unwrap();
        let chain = tree.chain(root);
        let s = default_suggestion(&chain);
        assert_eq!(s.target_path, "inbox/What is attention-.md");
        assert_eq!(s.tags, vec!["unsorted"]);
    }

    #[test]
    fn prompt_includes_chain_and_folders() {
        let mut tree = Tree::new("paper");
        let root = tree.add_node("What is X?", "X is a thing.", "s", None).unwrap();
        let child = tree.add_node("Why X?", "Because.", "s", Some(root)).unwrap();
        let structure = VaultStructure {
            folders: vec!["ml".to_string(), "physics".to_string()],
            notes: Vec::new(),
        };
        let prompt = build_prompt(&tree.chain(child), &tree.key, &structure);
        assert!(prompt.contains("Question 1: What is X?"));
        assert!(prompt.contains("Question 2: Why X?"));
        assert!(prompt.contains("ml\nphysics"));
        assert!(prompt.contains("paper"));
    }
}
