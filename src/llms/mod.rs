//! Answerer abstraction layer.
//!
//! One capability interface over interchangeable providers: `answer`
//! continues a single external conversation per loaded content item,
//! `summarize` is a one-shot call used for tree captions. The core
//! never cares which provider is behind it.

pub mod anthropic;
mod error;
pub mod ollama;
pub mod openai;

use std::fs;
use std::path::PathBuf;

pub use error::LlmError;

use crate::config::{Config, ProviderKind};
use crate::constants::{SOURCE_INLINE_MAX_CHARS, SUMMARY_MAX_CHARS};

/// The loaded content item, attached to the first call of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    File(PathBuf),
    Url(String),
}

impl DocumentSource {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim().trim_matches(|c| c == '\'' || c == '"');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            DocumentSource::Url(trimmed.to_string())
        } else {
            DocumentSource::File(PathBuf::from(trimmed))
        }
    }

    /// Title used to derive the tree key: file stem or URL.
    pub fn title(&self) -> String {
        match self {
            DocumentSource::File(path) => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            DocumentSource::Url(url) => url.clone(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            DocumentSource::File(path) => path.display().to_string(),
            DocumentSource::Url(url) => url.clone(),
        }
    }
}

/// External capability that turns a prompt into markdown text.
pub trait Answerer {
    /// Answer `question`. `source` is present only on the first call for
    /// a freshly loaded content item; later calls continue the same
    /// conversation.
    fn answer(&self, question: &str, source: Option<&DocumentSource>) -> Result<String, LlmError>;

    /// Short caption for a finished exchange.
    fn summarize(&self, question: &str, answer: &str) -> Result<String, LlmError>;

    /// One-shot utility call outside the running conversation. Used for
    /// vault filing analysis.
    fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

pub fn get_answerer(config: &Config) -> Box<dyn Answerer> {
    match config.provider {
        ProviderKind::Openai => Box::new(openai::OpenAiCompatClient::new(&config.openai)),
        ProviderKind::Anthropic => Box::new(anthropic::AnthropicClient::new(&config.anthropic)),
        ProviderKind::Ollama => Box::new(ollama::OllamaClient::new(&config.ollama)),
    }
}

/// Build the user-visible prompt for the first question of a session:
/// the document travels inline (readable text files) or by reference
/// (URLs, binary files). PDF and transcript parsing is out of scope.
pub(crate) fn prompt_with_source(question: &str, source: Option<&DocumentSource>) -> String {
    let Some(source) = source else {
        return question.to_string();
    };
    match source {
        DocumentSource::Url(url) => {
            format!("We are reading this page/video: {}\n\n{}", url, question)
        }
        DocumentSource::File(path) => match fs::read_to_string(path) {
            Ok(text) => {
                let mut text = text;
                if text.chars().count() > SOURCE_INLINE_MAX_CHARS {
                    text = text.chars().take(SOURCE_INLINE_MAX_CHARS).collect();
                    text.push_str("\n[document truncated]");
                }
                format!("Here is the document we are reading:\n\n{}\n\n---\n\n{}", text, question)
            }
            Err(_) => {
                format!("We are reading the document \"{}\".\n\n{}", path.display(), question)
            }
        },
    }
}

/// Prompt for `summarize`. Providers return the raw reply; callers clamp
/// it to the caption length.
pub(crate) fn summary_prompt(question: &str) -> String {
    format!(
        "Condense the core point of this question into at most {} characters:\n\n\
         Question: {}\n\n\
         Return only the condensed text, nothing else.",
        SUMMARY_MAX_CHARS, question
    )
}

/// Clamp a summarizer reply to the caption length.
pub(crate) fn clamp_summary(reply: &str) -> String {
    let trimmed = reply.trim();
    if trimmed.chars().count() <= SUMMARY_MAX_CHARS {
        trimmed.to_string()
    } else {
        trimmed.chars().take(SUMMARY_MAX_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_url_source() {
        let s = DocumentSource::parse("https://example.com/talk");
        assert_eq!(s, DocumentSource::Url("https://example.com/talk".into()));
        assert_eq!(s.title(), "https://example.com/talk");
    }

    #[test]
    fn parse_file_source_strips_drag_quotes() {
        let s = DocumentSource::parse("'/papers/attention.pdf'");
        assert_eq!(s, DocumentSource::File(PathBuf::from("/papers/attention.pdf")));
        assert_eq!(s.title(), "attention");
    }

    #[test]
    fn prompt_without_source_is_question() {
        assert_eq!(prompt_with_source("why?", None), "why?");
    }

    #[test]
    fn prompt_with_url_references_it() {
        let src = DocumentSource::Url("https://example.com".into());
        let p = prompt_with_source("why?", Some(&src));
        assert!(p.contains("https://example.com"));
        assert!(p.ends_with("why?"));
    }

    #[test]
    fn clamp_summary_respects_limit() {
        assert_eq!(clamp_summary("  short  "), "short");
        let long = "y".repeat(200);
        assert_eq!(clamp_summary(&long).chars().count(), SUMMARY_MAX_CHARS);
    }
}
