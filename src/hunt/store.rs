//! Session store seam.
//!
//! The dispatcher never touches a global map directly; it asks a [`SessionStore`]
//! for a [`SessionHandle`] and locks that handle for the whole read-modify-write of
//! one puzzle step. Two requests for the same id therefore serialize on the same
//! mutex, while different ids proceed in parallel.
//!
//! [`MemorySessionStore`] keeps everything in process memory for the lifetime of the
//! process. There is no eviction: the table grows with every new id until restart.

use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::session::HuntSession;
use crate::logutil::short_id;

pub type SessionHandle = Arc<tokio::sync::Mutex<HuntSession>>;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Return the session for `id`, allocating a fresh one on first reference.
    /// Concurrent callers with the same id always receive the same handle.
    async fn get_or_create(&self, id: &str) -> SessionHandle;

    /// Number of sessions currently held.
    async fn session_count(&self) -> usize;
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get_or_create(&self, id: &str) -> SessionHandle {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                debug!("session.create id={}", short_id(id));
                Arc::new(tokio::sync::Mutex::new(HuntSession::new(id.to_string())))
            })
            .clone()
    }

    async fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
