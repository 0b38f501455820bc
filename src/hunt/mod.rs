//! # Hunt Core Module
//!
//! The puzzle hunt: a chat front end posts player lines here, scripted puzzle
//! events are resolved locally, and everything else is answered by the oracle.
//!
//! ## Components
//!
//! - [`cipher`] - ROT13 used to obfuscate fragments
//! - [`catalog`] - the four command chains and their fragments
//! - [`session`] - per-player progress
//! - [`store`] - session store seam and the in-memory implementation
//! - [`commands`] - verb/argument grammar for chat lines
//! - [`engine`] - puzzle decision logic
//! - [`oracle`] - language model collaborator
//! - [`dispatch`] - request orchestration and reply shaping
//! - [`server`] - HTTP endpoint
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  HuntServer     │ ← HTTP, POST-only chat endpoint
//! └─────────────────┘
//!          │
//! ┌─────────────────┐    ┌─────────────────┐
//! │  ChatDispatcher │───→│  Oracle         │ ← fallthrough only
//! └─────────────────┘    └─────────────────┘
//!          │
//! ┌─────────────────┐    ┌─────────────────┐
//! │  PuzzleEngine   │───→│  SessionStore   │ ← one lock per session id
//! └─────────────────┘    └─────────────────┘
//! ```
//!
//! ## Solving
//!
//! 1. Work a chain's three commands in order; the last reply shows an enciphered fragment
//! 2. `/decode <fragment>` turns it into plaintext and records it
//! 3. `/unlock <phrase>` with the four fragments, in catalog order, ends the mission

pub mod catalog;
pub mod cipher;
pub mod commands;
pub mod dispatch;
pub mod engine;
pub mod oracle;
pub mod server;
pub mod session;
pub mod store;

pub use dispatch::ChatDispatcher;
pub use server::HuntServer;
