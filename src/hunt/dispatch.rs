//! Chat dispatcher: one request in, one reply payload out.
//!
//! Validates the request, resolves the session, runs the puzzle engine while holding
//! that session's lock, and only when the engine falls through consults the oracle
//! (after releasing the lock). Oracle calls are bounded by a timeout and may be
//! retried once after a transient failure.
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use super::commands::normalize;
use super::engine::{Outcome, PuzzleEngine};
use super::oracle::{GeminiOracle, Oracle, OracleError, OraclePrompt};
use super::store::{MemorySessionStore, SessionStore};
use crate::config::Config;
use crate::logutil::{escape_log, short_id};
use crate::metrics;

/// In-character line returned (with a 500) whenever the oracle cannot answer.
pub const ORACLE_FAILURE_REPLY: &str =
    "SIGNAL LOST. OMEGA is not responding on this channel. Try again, agent.";
pub const MESSAGE_REQUIRED: &str = "Message is required and must be a string.";
pub const SESSION_ID_INVALID: &str = "sessionId must be a string of at most 128 characters.";
pub const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub session_id: Option<String>,
}

impl ChatRequest {
    /// Validate a decoded JSON body: `message` must be a non-blank string and
    /// `sessionId`, when present and not null, a bounded string.
    pub fn from_json(body: &Value) -> Result<Self, DispatchError> {
        let message = match body.get("message") {
            Some(Value::String(m)) if !m.trim().is_empty() => m.clone(),
            _ => return Err(DispatchError::BadRequest(MESSAGE_REQUIRED.to_string())),
        };
        let session_id = match body.get("sessionId") {
            None | Some(Value::Null) => None,
            Some(Value::String(id)) if id.trim().is_empty() => None,
            Some(Value::String(id)) if id.chars().count() <= MAX_SESSION_ID_LEN => {
                Some(id.clone())
            }
            Some(_) => return Err(DispatchError::BadRequest(SESSION_ID_INVALID.to_string())),
        };
        Ok(ChatRequest {
            message,
            session_id,
        })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub reply: String,
    pub session_id: String,
    pub found_fragments: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mission_complete: Option<bool>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("oracle failure for session {session_id}: {source}")]
    Oracle {
        session_id: String,
        #[source]
        source: OracleError,
    },
}

impl DispatchError {
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::BadRequest(_) => 400,
            DispatchError::Oracle { .. } => 500,
        }
    }

    /// Text safe to show the caller. Provider details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            DispatchError::BadRequest(msg) => msg.clone(),
            DispatchError::Oracle { .. } => ORACLE_FAILURE_REPLY.to_string(),
        }
    }
}

/// Timeout, retry and persona applied to every oracle call.
#[derive(Debug, Clone)]
pub struct OraclePolicy {
    pub persona: Option<String>,
    pub timeout: Duration,
    pub retry: bool,
    pub backoff: Duration,
}

impl OraclePolicy {
    pub fn from_config(config: &Config) -> Self {
        let persona = config.oracle.persona.trim();
        Self {
            persona: if persona.is_empty() {
                None
            } else {
                Some(persona.to_string())
            },
            timeout: Duration::from_secs(u64::from(config.oracle.timeout_seconds.max(1))),
            retry: config.oracle.retry,
            backoff: Duration::from_millis(config.oracle.retry_backoff_ms),
        }
    }
}

pub struct ChatDispatcher {
    engine: PuzzleEngine,
    store: Arc<dyn SessionStore>,
    oracle: Arc<dyn Oracle>,
    policy: OraclePolicy,
}

impl ChatDispatcher {
    pub fn new(
        engine: PuzzleEngine,
        store: Arc<dyn SessionStore>,
        oracle: Arc<dyn Oracle>,
        policy: OraclePolicy,
    ) -> Self {
        Self {
            engine,
            store,
            oracle,
            policy,
        }
    }

    /// In-memory store and the Gemini oracle, as configured.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            PuzzleEngine::new(config.hunt.help_order),
            Arc::new(MemorySessionStore::new()),
            Arc::new(GeminiOracle::new(config.oracle.clone())),
            OraclePolicy::from_config(config),
        )
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub async fn handle(&self, request: ChatRequest) -> Result<ChatReply, DispatchError> {
        let session_id = request
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let line = normalize(&request.message);
        debug!(
            "chat session={} line='{}'",
            short_id(&session_id),
            escape_log(&line)
        );

        let handle = self.store.get_or_create(&session_id).await;
        let mut session = handle.lock().await;

        let outcome = self.engine.evaluate(&mut session, &line);
        match outcome {
            Outcome::Reply(reply) => Ok(ChatReply {
                reply: reply.text,
                session_id,
                found_fragments: session.fragments_in_order(),
                mission_complete: (reply.mission_complete || session.mission_complete)
                    .then_some(true),
            }),
            Outcome::Fallthrough => {
                let prompt = OraclePrompt {
                    message: request.message,
                    persona: self.policy.persona.clone(),
                    facts: session
                        .memory
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect(),
                };
                let found_fragments = session.fragments_in_order();
                let mission_complete = session.mission_complete.then_some(true);
                drop(session);

                match self.consult(&prompt).await {
                    Ok(text) => Ok(ChatReply {
                        reply: text,
                        session_id,
                        found_fragments,
                        mission_complete,
                    }),
                    Err(source) => {
                        warn!(
                            "oracle failed session={} error={}",
                            short_id(&session_id),
                            escape_log(&source.to_string())
                        );
                        Err(DispatchError::Oracle { session_id, source })
                    }
                }
            }
        }
    }

    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            metrics::inc_oracle_call();
            let call = self.oracle.consult(prompt);
            let result = match tokio::time::timeout(self.policy.timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(OracleError::Timeout(self.policy.timeout.as_secs() as u32)),
            };
            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt == 1 && self.policy.retry && e.is_transient() => {
                    metrics::inc_oracle_retry();
                    warn!("oracle attempt failed ({}); retrying in {:?}", e, self.policy.backoff);
                    tokio::time::sleep(self.policy.backoff).await;
                }
                Err(e) => {
                    metrics::inc_oracle_failure();
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_must_be_a_nonblank_string() {
        for body in [
            json!({}),
            json!({"message": 5}),
            json!({"message": ""}),
            json!({"message": "   "}),
            json!("text"),
        ] {
            let err = ChatRequest::from_json(&body).unwrap_err();
            assert_eq!(err.status_code(), 400);
            assert_eq!(err.public_message(), MESSAGE_REQUIRED);
        }
    }

    #[test]
    fn session_id_is_optional_but_typed() {
        let req = ChatRequest::from_json(&json!({"message": "hi", "sessionId": null})).unwrap();
        assert_eq!(req.session_id, None);
        let req = ChatRequest::from_json(&json!({"message": "hi", "sessionId": "abc"})).unwrap();
        assert_eq!(req.session_id.as_deref(), Some("abc"));
        assert!(ChatRequest::from_json(&json!({"message": "hi", "sessionId": 7})).is_err());
        let long = "x".repeat(MAX_SESSION_ID_LEN + 1);
        assert!(ChatRequest::from_json(&json!({"message": "hi", "sessionId": long})).is_err());
    }

    #[test]
    fn reply_serializes_camel_case_and_omits_absent_flag() {
        let reply = ChatReply {
            reply: "ok".into(),
            session_id: "s".into(),
            found_fragments: vec!["NOW".into()],
            mission_complete: None,
        };
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["sessionId"], "s");
        assert_eq!(json["foundFragments"], json!(["NOW"]));
        assert!(json.get("missionComplete").is_none());
    }

    #[test]
    fn oracle_errors_hide_provider_detail() {
        let err = DispatchError::Oracle {
            session_id: "s".into(),
            source: OracleError::Api { status: 403, message: "key leaked?".into() },
        };
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.public_message(), ORACLE_FAILURE_REPLY);
    }
}
