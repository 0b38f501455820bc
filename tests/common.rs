//! Test utilities & fixtures.
//! Scripted oracles stand in for the language model so dispatcher tests stay offline.
#![allow(dead_code)] // each test binary uses a different subset

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use omegahunt::config::{Config, HelpOrder};
use omegahunt::hunt::dispatch::{ChatDispatcher, ChatRequest, OraclePolicy};
use omegahunt::hunt::engine::PuzzleEngine;
use omegahunt::hunt::oracle::{Oracle, OracleError, OraclePrompt};
use omegahunt::hunt::store::MemorySessionStore;

/// Replies with a fixed line and records every prompt it saw.
#[derive(Default)]
pub struct ScriptedOracle {
    pub reply: String,
    pub prompts: Mutex<Vec<OraclePrompt>>,
}

impl ScriptedOracle {
    pub fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn consult(&self, prompt: &OraclePrompt) -> Result<String, OracleError> {
        self.prompts.lock().unwrap().push(prompt.clone());
        Ok(self.reply.clone())
    }
}

/// Fails the first `failures` calls with the error built by `make_error`, then answers.
pub struct FlakyOracle {
    pub failures: usize,
    pub calls: AtomicUsize,
    pub make_error: fn() -> OracleError,
}

impl FlakyOracle {
    pub fn new(failures: usize, make_error: fn() -> OracleError) -> Arc<Self> {
        Arc::new(Self {
            failures,
            calls: AtomicUsize::new(0),
            make_error,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for FlakyOracle {
    async fn consult(&self, _prompt: &OraclePrompt) -> Result<String, OracleError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            Err((self.make_error)())
        } else {
            Ok("Signal restored.".to_string())
        }
    }
}

/// Never answers inside any reasonable timeout.
pub struct StalledOracle;

#[async_trait]
impl Oracle for StalledOracle {
    async fn consult(&self, _prompt: &OraclePrompt) -> Result<String, OracleError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".to_string())
    }
}

pub fn policy(retry: bool) -> OraclePolicy {
    OraclePolicy {
        persona: Some("You are OMEGA.".to_string()),
        timeout: Duration::from_secs(1),
        retry,
        backoff: Duration::from_millis(10),
    }
}

pub fn dispatcher_with(oracle: Arc<dyn Oracle>, retry: bool) -> ChatDispatcher {
    ChatDispatcher::new(
        PuzzleEngine::new(HelpOrder::Catalog),
        Arc::new(MemorySessionStore::new()),
        oracle,
        policy(retry),
    )
}

pub fn dispatcher(oracle: Arc<dyn Oracle>) -> ChatDispatcher {
    dispatcher_with(oracle, false)
}

pub fn request(message: &str, session_id: Option<&str>) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        session_id: session_id.map(str::to_string),
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.oracle.api_key.clear();
    config
}
