//! Oracle: the language model that answers anything the puzzle engine does not.
//!
//! The dispatcher only sees the [`Oracle`] trait. [`GeminiOracle`] implements it
//! against the Generative Language `generateContent` REST call. Timeouts and the
//! single retry live in the dispatcher so they apply to any implementation.

use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::OracleConfig;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle disabled by configuration")]
    Disabled,

    #[error("API key not configured")]
    NotConfigured,

    #[error("request timed out after {0}s")]
    Timeout(u32),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("response contained no text")]
    Empty,
}

impl OracleError {
    /// Failures worth one more attempt: the provider may answer next time.
    pub fn is_transient(&self) -> bool {
        matches!(self, OracleError::Timeout(_) | OracleError::Network(_))
    }
}

/// Everything the oracle is told about one free-form message.
#[derive(Debug, Clone, Default)]
pub struct OraclePrompt {
    pub message: String,
    pub persona: Option<String>,
    /// Session memory facts, key then value.
    pub facts: Vec<(String, String)>,
}

impl OraclePrompt {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// Persona followed by the remembered facts, if there is anything to say.
    pub fn system_instruction(&self) -> Option<String> {
        let mut out = self.persona.clone().unwrap_or_default();
        if !self.facts.is_empty() {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str("Facts the agent asked you to remember:");
            for (key, value) in &self.facts {
                out.push_str(&format!("\n- {}: {}", key, value));
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(out)
        }
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini-backed oracle.
pub struct GeminiOracle {
    config: OracleConfig,
    client: reqwest::Client,
}

impl GeminiOracle {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn build_api_url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            API_BASE,
            urlencoding::encode(&self.config.model)
        )
    }

    fn build_request(prompt: &OraclePrompt) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.message.clone()),
                }],
            }],
            system_instruction: prompt.system_instruction().map(|text| Content {
                role: None,
                parts: vec![Part { text: Some(text) }],
            }),
        }
    }

    fn extract_text(response: GenerateResponse) -> Result<String, OracleError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(OracleError::Empty);
        }
        Ok(text)
    }
}

#[async_trait]
impl Oracle for GeminiOracle {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        if !self.config.enabled {
            return Err(OracleError::Disabled);
        }
        if self.config.api_key.is_empty() {
            return Err(OracleError::NotConfigured);
        }
        let url = self.build_api_url();
        debug!("Consulting oracle model={}", self.config.model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .timeout(Duration::from_secs(u64::from(self.config.timeout_seconds)))
            .json(&Self::build_request(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout_seconds)
                } else {
                    OracleError::Network(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(OracleError::Api { status, message });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Parse(e.to_string()))?;

        Self::extract_text(parsed)
    }
}
