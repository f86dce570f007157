//! Shared limits and defaults.

/// Maximum characters for a node's display summary.
pub const SUMMARY_MAX_CHARS: usize = 48;

/// Maximum characters of a question shown in queue listings.
pub const QUEUE_PREVIEW_CHARS: usize = 70;

/// Maximum characters of each answer included in the filing prompt.
pub const FILING_ANSWER_EXCERPT_CHARS: usize = 500;

/// Maximum vault folders listed in the filing prompt.
pub const FILING_MAX_FOLDERS: usize = 50;

/// Maximum characters of a local document inlined into the first prompt.
pub const SOURCE_INLINE_MAX_CHARS: usize = 60_000;

/// Tokens requested from providers for a single answer.
pub const MAX_RESPONSE_TOKENS: u32 = 4096;

/// Default config file path.
pub const CONFIG_FILE: &str = "config.yaml";

/// On-disk record prefix: `qa_tree_<key>.json`.
pub const TREE_FILE_PREFIX: &str = "qa_tree_";
