//! Process-wide hunt counters.
//! Cheap atomics read by the health endpoint and the `status` command.
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

static CHAIN_ADVANCES: AtomicU64 = AtomicU64::new(0);
static DECODE_HITS: AtomicU64 = AtomicU64::new(0);
static DECODE_MISSES: AtomicU64 = AtomicU64::new(0);
static UNLOCK_HITS: AtomicU64 = AtomicU64::new(0);
static UNLOCK_MISSES: AtomicU64 = AtomicU64::new(0);
static ORACLE_CALLS: AtomicU64 = AtomicU64::new(0);
static ORACLE_FAILURES: AtomicU64 = AtomicU64::new(0);
static ORACLE_RETRIES: AtomicU64 = AtomicU64::new(0);
static REQUESTS_REJECTED: AtomicU64 = AtomicU64::new(0);

static CHAIN_COMPLETIONS: OnceLock<Mutex<BTreeMap<String, u64>>> = OnceLock::new();

pub fn inc_chain_advance() {
    CHAIN_ADVANCES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_decode_hit() {
    DECODE_HITS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_decode_miss() {
    DECODE_MISSES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_unlock_hit() {
    UNLOCK_HITS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_unlock_miss() {
    UNLOCK_MISSES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_oracle_call() {
    ORACLE_CALLS.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_oracle_failure() {
    ORACLE_FAILURES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_oracle_retry() {
    ORACLE_RETRIES.fetch_add(1, Ordering::Relaxed);
}
pub fn inc_request_rejected() {
    REQUESTS_REJECTED.fetch_add(1, Ordering::Relaxed);
}

fn completion_lock() -> &'static Mutex<BTreeMap<String, u64>> {
    CHAIN_COMPLETIONS.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Count one more session finishing every step of `chain`. Returns the new total.
pub fn record_chain_completion(chain: &str) -> u64 {
    let mut guard = completion_lock().lock().unwrap_or_else(|e| e.into_inner());
    let counter = guard.entry(chain.to_string()).or_default();
    *counter = counter.saturating_add(1);
    *counter
}

pub fn chain_completions_snapshot() -> BTreeMap<String, u64> {
    completion_lock()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clone()
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct Snapshot {
    pub chain_advances: u64,
    pub decode_hits: u64,
    pub decode_misses: u64,
    pub unlock_hits: u64,
    pub unlock_misses: u64,
    pub oracle_calls: u64,
    pub oracle_failures: u64,
    pub oracle_retries: u64,
    pub requests_rejected: u64,
    pub chain_completions: BTreeMap<String, u64>,
}

pub fn snapshot() -> Snapshot {
    Snapshot {
        chain_advances: CHAIN_ADVANCES.load(Ordering::Relaxed),
        decode_hits: DECODE_HITS.load(Ordering::Relaxed),
        decode_misses: DECODE_MISSES.load(Ordering::Relaxed),
        unlock_hits: UNLOCK_HITS.load(Ordering::Relaxed),
        unlock_misses: UNLOCK_MISSES.load(Ordering::Relaxed),
        oracle_calls: ORACLE_CALLS.load(Ordering::Relaxed),
        oracle_failures: ORACLE_FAILURES.load(Ordering::Relaxed),
        oracle_retries: ORACLE_RETRIES.load(Ordering::Relaxed),
        requests_rejected: REQUESTS_REJECTED.load(Ordering::Relaxed),
        chain_completions: chain_completions_snapshot(),
    }
}
