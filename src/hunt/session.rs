use std::collections::{BTreeMap, HashMap, HashSet};

use super::catalog::{Catalog, Chain};

/// Most memory facts a single session may hold.
pub const MAX_MEMORY_FACTS: usize = 16;
pub const MAX_FACT_KEY_LEN: usize = 32;
pub const MAX_FACT_VALUE_LEN: usize = 200;

/// # Hunt Session
///
/// Server-side progress bucket for one anonymous player, keyed by the opaque
/// session id the caller round-trips on every request.
///
/// ## Progress
///
/// - `puzzle_progress` - per-chain cursor; `0` means no steps completed, `N`
///   means every step of an `N`-step chain is done. Cursors only move forward
///   and never pass the chain's step count.
/// - `found_fragments` - plaintext fragments decoded so far (a set).
/// - `mission_complete` - set once a correct unlock phrase is submitted.
///
/// ## Memory
///
/// `memory` holds small key/value facts the player asked the oracle to keep in
/// mind. They ride along as context on free-form chat.
#[derive(Debug, Clone)]
pub struct HuntSession {
    pub id: String,
    pub found_fragments: HashSet<String>,
    pub puzzle_progress: HashMap<String, usize>,
    pub memory: BTreeMap<String, String>,
    pub mission_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemoryOutcome {
    Stored,
    Replaced,
    Full,
}

impl HuntSession {
    /// Fresh session with every catalog chain at cursor 0 and nothing found.
    pub fn new(id: String) -> Self {
        let puzzle_progress = Catalog::standard()
            .chains()
            .iter()
            .map(|c| (c.name.to_string(), 0))
            .collect();

        HuntSession {
            id,
            found_fragments: HashSet::new(),
            puzzle_progress,
            memory: BTreeMap::new(),
            mission_complete: false,
        }
    }

    pub fn cursor(&self, chain: &str) -> usize {
        self.puzzle_progress.get(chain).copied().unwrap_or(0)
    }

    /// Move a chain's cursor forward by one. Returns false if the chain was already finished.
    pub fn advance(&mut self, chain: &Chain) -> bool {
        let cursor = self.puzzle_progress.entry(chain.name.to_string()).or_insert(0);
        if *cursor >= chain.step_count() {
            return false;
        }
        *cursor += 1;
        true
    }

    pub fn chain_finished(&self, chain: &Chain) -> bool {
        self.cursor(chain.name) >= chain.step_count()
    }

    /// Record a decoded fragment. Returns true only the first time it is seen.
    pub fn add_fragment(&mut self, fragment: &str) -> bool {
        self.found_fragments.insert(fragment.to_string())
    }

    pub fn has_fragment(&self, fragment: &str) -> bool {
        self.found_fragments.contains(fragment)
    }

    /// Found fragments listed in catalog order rather than set order.
    pub fn fragments_in_order(&self) -> Vec<String> {
        Catalog::standard()
            .chains()
            .iter()
            .filter(|c| self.found_fragments.contains(c.fragment))
            .map(|c| c.fragment.to_string())
            .collect()
    }

    pub fn all_fragments_found(&self) -> bool {
        Catalog::standard()
            .chains()
            .iter()
            .all(|c| self.found_fragments.contains(c.fragment))
    }

    pub fn mark_complete(&mut self) {
        self.mission_complete = true;
    }

    /// Store a memory fact. Existing keys may be overwritten even when the table is full.
    pub fn remember(&mut self, key: &str, value: &str) -> MemoryOutcome {
        if self.memory.contains_key(key) {
            self.memory.insert(key.to_string(), value.to_string());
            return MemoryOutcome::Replaced;
        }
        if self.memory.len() >= MAX_MEMORY_FACTS {
            return MemoryOutcome::Full;
        }
        self.memory.insert(key.to_string(), value.to_string());
        MemoryOutcome::Stored
    }
}
