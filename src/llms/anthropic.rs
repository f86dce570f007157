//! Anthropic messages API client.

use std::env;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Answerer, DocumentSource, LlmError, clamp_summary, prompt_with_source, summary_prompt};
use crate::config::AnthropicConfig;
use crate::constants::MAX_RESPONSE_TOKENS;

const ANTHROPIC_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

pub struct AnthropicClient {
    config: AnthropicConfig,
    api_key: Option<SecretBox<String>>,
    history: Mutex<Vec<ApiMessage>>,
}

impl AnthropicClient {
    pub fn new(config: &AnthropicConfig) -> Self {
        dotenvy::dotenv().ok();
        let api_key = env::var("ANTHROPIC_API_KEY").ok().map(|k| SecretBox::new(Box::new(k)));
        Self { config: config.clone(), api_key, history: Mutex::new(Vec::new()) }
    }

    fn call(&self, messages: Vec<ApiMessage>) -> Result<String, LlmError> {
        let api_key =
            self.api_key.as_ref().ok_or_else(|| LlmError::Auth("ANTHROPIC_API_KEY not set".into()))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        let body = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: MAX_RESPONSE_TOKENS,
            messages,
        };

        let mut last_err = LlmError::Network("no attempts made".into());
        for attempt in 1..=self.config.max_retries.max(1) {
            let result = client
                .post(ANTHROPIC_ENDPOINT)
                .header("x-api-key", api_key.expose_secret())
                .header("anthropic-version", API_VERSION)
                .header("Content-Type", "application/json")
                .json(&body)
                .send();
            match result {
                Ok(response) if response.status().is_success() => {
                    let parsed: MessagesResponse =
                        response.json().map_err(|e| LlmError::Parse(e.to_string()))?;
                    return parsed
                        .content
                        .into_iter()
                        .next()
                        .map(|b| b.text)
                        .ok_or_else(|| LlmError::Parse("empty content".into()));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let api_body = response.text().unwrap_or_default();
                    warn!(attempt, status, "anthropic call failed");
                    last_err = LlmError::Api { status, body: api_body };
                }
                Err(e) => {
                    warn!(attempt, error = %e, "anthropic call failed");
                    last_err = e.into();
                }
            }
        }
        Err(last_err)
    }
}

impl Answerer for AnthropicClient {
    fn answer(&self, question: &str, source: Option<&DocumentSource>) -> Result<String, LlmError> {
        let user =
            ApiMessage { role: "user".to_string(), content: prompt_with_source(question, source) };
        let mut messages = self.history.lock().expect("history poisoned").clone();
        messages.push(user.clone());
        let reply = self.call(messages)?;
        let mut history = self.history.lock().expect("history poisoned");
        history.push(user);
        history.push(ApiMessage { role: "assistant".to_string(), content: reply.clone() });
        Ok(reply)
    }

    fn summarize(&self, question: &str, _answer: &str) -> Result<String, LlmError> {
        self.complete(&summary_prompt(question)).map(|r| clamp_summary(&r))
    }

    fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        self.call(vec![ApiMessage { role: "user".to_string(), content: prompt.to_string() }])
    }
}
