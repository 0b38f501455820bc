//! # Omegahunt - Puzzle Hunt Chat Server
//!
//! Omegahunt is the server half of a chat-style puzzle hunt. Players type commands
//! into a terminal-looking web page; the server advances scripted command chains,
//! hands out enciphered fragments, checks the final unlock phrase, and passes any
//! other chatter to a language model.
//!
//! ## Features
//!
//! - **Command Chains**: Four independent three-step chains, each rewarding one fragment.
//! - **Cipher Fragments**: Fragments are revealed ROT13-enciphered and decoded with `/decode`.
//! - **Anonymous Sessions**: Progress keyed by a round-tripped session id; no login required.
//! - **Oracle Fallback**: Free-form messages go to a Gemini model with a bounded timeout.
//! - **Serialized Updates**: Each session is mutated under its own lock, so double submits
//!   cannot double-advance a chain.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use omegahunt::config::Config;
//! use omegahunt::hunt::HuntServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     HuntServer::new(config).run().await
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`hunt`] - puzzle catalog, sessions, engine, oracle, dispatcher and HTTP server
//! - [`config`] - configuration management
//! - [`logutil`] - single-line log sanitizing
//! - [`metrics`] - process-wide counters
//!
//! Sessions live in process memory only. A restart starts every player over.

pub mod config;
pub mod hunt;
pub mod logutil;
pub mod metrics;
