//! OpenAI-compatible chat completions client.
//!
//! Also covers DeepSeek, Qianfan and other endpoints that speak the same
//! format; only `base_url` differs.

use std::env;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Answerer, DocumentSource, LlmError, clamp_summary, prompt_with_source, summary_prompt};
use crate::config::OpenAiConfig;
use crate::constants::MAX_RESPONSE_TOKENS;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct OpenAiCompatClient {
    config: OpenAiConfig,
    api_key: Option<SecretBox<String>>,
    /// Conversation so far; answering continues this thread.
    history: Mutex<Vec<ChatMessage>>,
}

impl OpenAiCompatClient {
    pub fn new(config: &OpenAiConfig) -> Self {
        dotenvy::dotenv().ok();
        let api_key = env::var("OPENAI_API_KEY").ok().map(|k| SecretBox::new(Box::new(k)));
        Self { config: config.clone(), api_key, history: Mutex::new(Vec::new()) }
    }

    fn call(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let api_key =
            self.api_key.as_ref().ok_or_else(|| LlmError::Auth("OPENAI_API_KEY not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: 0.3,
            max_tokens: MAX_RESPONSE_TOKENS,
        };

        let mut last_err = LlmError::Network("no attempts made".into());
        for attempt in 1..=self.config.max_retries.max(1) {
            let result = client
                .post(format!("{}/chat/completions", self.config.base_url))
                .header("Authorization", format!("Bearer {}", api_key.expose_secret()))
                .header("Content-Type", "application/json")
                .json(&body)
                .send();
            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: ChatResponse =
                        response.json().map_err(|e| LlmError::Parse(e.to_string()))?;
                    return parsed
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| LlmError::Parse("empty choices".into()));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let api_body = response.text().unwrap_or_default();
                    warn!(attempt, status, "chat completions call failed");
                    last_err = LlmError::Api { status, body: api_body };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "chat completions call failed");
                    last_err = e.into();
                }
            }
        }
        Err(last_err)
    }
}

impl Answerer for OpenAiCompatClient {
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
        // one-shot, outside the conversation thread
        self.complete(&summary_prompt(question)).map(|r| clamp_summary(&r))
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call(vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }])
    }
}
