//! AI - Client verso i modelli linguistici e logiche costruite sopra di essi
//!
//! Tutte le chiamate passano dal trait [`LanguageModel`]; le funzioni di alto livello
//! (spiegazioni, chat, sintesi) degradano a testi deterministici quando il modello fallisce.

pub mod anonymize;
pub mod chatbot;
pub mod explanations;
pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod synthesis;

pub use anonymize::anonymize_text;
pub use chatbot::ChatAssistant;
pub use explanations::{Explanation, ExplanationInput, generate_report_explanations};
pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use synthesis::{SynthesisResult, generate_synthesis};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("no language model configured")]
    NotConfigured,

    #[error("LLM request failed: {0}")]
    Http(reqwest::Error),

    #[error("LLM provider returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned an empty response")]
    EmptyResponse,

    #[error("LLM returned invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Richiesta indipendente dal provider
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub messages: Vec<ChatTurn>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Chiede al provider una risposta JSON (response_format / responseMimeType)
    pub json_mode: bool,
    pub stop: Vec<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<ChatTurn>) -> Self {
        Self {
            system: None,
            messages,
            temperature: 0.7,
            max_tokens: 1024,
            json_mode: false,
            stop: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_stop(mut self, stop: &[&str]) -> Self {
        self.stop = stop.iter().map(|s| s.to_string()).collect();
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;

    fn name(&self) -> &'static str;
}

/// Modello usato quando nessun provider è configurato
pub struct DisabledModel;

#[async_trait]
impl LanguageModel for DisabledModel {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }

    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// Rimuove un eventuale blocco markdown (```json ... ```) attorno alla risposta
pub fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```JSON"))
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

pub fn parse_json_reply<T: DeserializeOwned>(text: &str) -> Result<T, LlmError> {
    Ok(serde_json::from_str(strip_code_fences(text))?)
}
