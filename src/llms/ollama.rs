//! Ollama local model client. No API key; history rides on /api/chat.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Answerer, DocumentSource, LlmError, clamp_summary, prompt_with_source, summary_prompt};
use crate::config::OllamaConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

pub struct OllamaClient {
    config: OllamaConfig,
    history: Mutex<Vec<ChatMessage>>,
}

impl OllamaClient {
    pub fn new(config: &OllamaConfig) -> Self {
        Self { config: config.clone(), history: Mutex::new(Vec::new()) }
    }

    fn call(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        let body =
            ChatRequest { model: self.config.model.clone(), messages, stream: false };

        let mut last_err = LlmError::Network("no attempts made".into());
        for attempt in 1..=self.config.max_retries.max(1) {
            let result =
                client.post(format!("{}/api/chat", self.config.base_url)).json(&body).send();
            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: ChatResponse =
                        response.json().map_err(|e| LlmError::Parse(e.to_string()))?;
                    return Ok(parsed.message.content);
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let api_body = response.text().unwrap_or_default();
                    warn!(attempt, status, "ollama call failed");
                    last_err = LlmError::Api { status, body: api_body };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "ollama call failed");
                    last_err = e.into();
                }
            }
        }
        Err(last_err)
    }
}

impl Answerer for OllamaClient {
    fn answer(&self, question: &str, source: Option<&DocumentSource>) -> Result<String, LlmError> {
        let user = ChatMessage {
            role: "user".to_string(),
            content: prompt_with_source(question, source),
        };
        let mut messages = self.history.lock().expect("history poisoned").clone();
        messages.push(user.clone());
        let reply = self.call(messages)?;
        let mut history = self.history.lock().expect("history poisoned");
        history.push(user);
        history.push(ChatMessage { role: "assistant".to_string(), content: reply.clone() });
        Ok(reply)
    }

    fn summarize(&self, question: &str, _answer: &str) -> Result<String, LlmError> {
        self.complete(&summary_prompt(question)).map(|r| clamp_summary(&r))
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call(vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }])
    }
}
