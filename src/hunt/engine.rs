//! Puzzle engine: the decision logic behind every chat line.
//!
//! [`PuzzleEngine::evaluate`] takes a locked session and a normalized line and
//! resolves it in a fixed priority order:
//!
//! 1. `/help` - list directives (no mutation)
//! 2. chain step - the whole line equals the next expected command of a chain
//! 3. `/decode <fragment>` - cipher-text lookup, adds the plaintext fragment
//! 4. `/unlock <phrase>` - compares against the plaintext final phrase
//! 5. `/status`, `/remember` - progress readout and memory facts
//! 6. anything else falls through to the oracle
//!
//! The engine has no failure states. Wrong answers are ordinary replies.
//! Decode does not look at chain progress and unlock does not look at found
//! fragments: holding the cipher text or the phrase is enough.
use log::info;
use rand::seq::SliceRandom;

use super::catalog::Catalog;
use super::commands::{self, CommandParser, HuntCommand};
use super::session::{HuntSession, MemoryOutcome, MAX_FACT_KEY_LEN, MAX_FACT_VALUE_LEN};
use crate::config::HelpOrder;
use crate::logutil::{escape_log, short_id};
use crate::metrics;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineReply {
    pub text: String,
    pub mission_complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Reply(EngineReply),
    /// Not a puzzle event; hand the raw message to the oracle.
    Fallthrough,
}

impl Outcome {
    fn reply(text: impl Into<String>) -> Self {
        Outcome::Reply(EngineReply {
            text: text.into(),
            mission_complete: false,
        })
    }
}

pub struct PuzzleEngine {
    catalog: &'static Catalog,
    parser: CommandParser,
    help_order: HelpOrder,
}

impl PuzzleEngine {
    pub fn new(help_order: HelpOrder) -> Self {
        PuzzleEngine {
            catalog: Catalog::standard(),
            parser: CommandParser::new(),
            help_order,
        }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    /// Resolve one normalized line against `session`, mutating it in place.
    pub fn evaluate(&self, session: &mut HuntSession, line: &str) -> Outcome {
        match self.parser.parse(line) {
            HuntCommand::Help => Outcome::reply(self.help_text()),
            command => match self.advance_chain(session, line) {
                Some(text) => Outcome::reply(text),
                None => self.dispatch(session, command),
            },
        }
    }

    fn dispatch(&self, session: &mut HuntSession, command: HuntCommand) -> Outcome {
        match command {
            HuntCommand::Help => Outcome::reply(self.help_text()),
            HuntCommand::Decode(token) => Outcome::reply(self.decode(session, &token)),
            HuntCommand::Unlock(phrase) => self.unlock(session, &phrase),
            HuntCommand::Status => Outcome::reply(self.status_text(session)),
            HuntCommand::Remember { key, value } => {
                Outcome::reply(self.remember(session, &key, &value))
            }
            HuntCommand::Invalid(usage) => Outcome::reply(usage),
            HuntCommand::Directive(_) | HuntCommand::Chatter => Outcome::Fallthrough,
        }
    }

    /// Directive listing. Display order follows the configured policy; matching never does.
    pub fn help_text(&self) -> String {
        let mut directives: Vec<String> = self
            .catalog
            .all_commands()
            .into_iter()
            .map(str::to_string)
            .collect();
        directives.push(format!("{} <fragment>", commands::DECODE));
        directives.push(format!("{} <phrase>", commands::UNLOCK));
        directives.push(commands::STATUS.to_string());
        directives.push(format!("{} <key> <value>", commands::REMEMBER));
        directives.push(commands::HELP.to_string());
        if self.help_order == HelpOrder::Shuffled {
            directives.shuffle(&mut rand::thread_rng());
        }
        let mut out = String::from("AVAILABLE DIRECTIVES:\n");
        for d in directives {
            out.push_str("  ");
            out.push_str(&d);
            out.push('\n');
        }
        out.pop();
        out
    }

    /// Apply at most one step of one chain: the first chain, in catalog order,
    /// whose next expected command equals `line`.
    fn advance_chain(&self, session: &mut HuntSession, line: &str) -> Option<String> {
        let (chain, step) = self.catalog.chains().iter().find_map(|chain| {
            chain
                .step_at(session.cursor(chain.name))
                .filter(|step| step.command == line)
                .map(|step| (chain, step))
        })?;
        session.advance(chain);
        metrics::inc_chain_advance();
        let cursor = session.cursor(chain.name);
        info!(
            target: "omegahunt::hunt",
            "chain.advance chain={} step={}/{} session={}",
            chain.name,
            cursor,
            chain.step_count(),
            short_id(&session.id)
        );
        if session.chain_finished(chain) {
            metrics::record_chain_completion(chain.name);
        }
        Some(step.response.clone())
    }

    fn decode(&self, session: &mut HuntSession, token: &str) -> String {
        let Some(chain) = self.catalog.chain_by_encoded(token) else {
            metrics::inc_decode_miss();
            return format!(
                "DECRYPTION FAILED. [ {} ] does not match any intercepted fragment.",
                token.trim().to_uppercase()
            );
        };
        metrics::inc_decode_hit();
        let newly_found = session.add_fragment(chain.fragment);
        if newly_found {
            info!(
                target: "omegahunt::hunt",
                "fragment.decoded fragment={} found={} session={}",
                chain.fragment,
                session.found_fragments.len(),
                short_id(&session.id)
            );
        }
        let mut reply = format!(
            "DECRYPTION SUCCESSFUL. Fragment [ {} ] added to the sequence.",
            chain.fragment
        );
        if newly_found && session.all_fragments_found() {
            reply.push_str(" All fragments recovered. Assemble the sequence and use /unlock.");
        }
        reply
    }

    fn unlock(&self, session: &mut HuntSession, phrase: &str) -> Outcome {
        let submission = phrase.trim().to_uppercase();
        if submission != self.catalog.final_phrase() {
            metrics::inc_unlock_miss();
            info!(
                target: "omegahunt::hunt",
                "unlock.denied attempt='{}' session={}",
                escape_log(&submission),
                short_id(&session.id)
            );
            return Outcome::reply("ACCESS DENIED. Incorrect sequence.");
        }
        metrics::inc_unlock_hit();
        session.mark_complete();
        info!(
            target: "omegahunt::hunt",
            "mission.complete fragments={} session={}",
            session.found_fragments.len(),
            short_id(&session.id)
        );
        Outcome::Reply(EngineReply {
            text: format!(
                "ACCESS GRANTED. Directive {} confirmed. OMEGA protocol disengaged. Mission complete, agent.",
                self.catalog.final_phrase()
            ),
            mission_complete: true,
        })
    }

    fn status_text(&self, session: &HuntSession) -> String {
        let mut out = String::from("MISSION STATUS:\n");
        for chain in self.catalog.chains() {
            out.push_str(&format!(
                "  {} {}/{}\n",
                chain.name,
                session.cursor(chain.name),
                chain.step_count()
            ));
        }
        let found = session.fragments_in_order();
        if found.is_empty() {
            out.push_str("  Fragments: none\n");
        } else {
            out.push_str(&format!("  Fragments: {}\n", found.join(", ")));
        }
        out.push_str(if session.mission_complete {
            "  Mission: COMPLETE"
        } else {
            "  Mission: ACTIVE"
        });
        out
    }

    fn remember(&self, session: &mut HuntSession, key: &str, value: &str) -> String {
        if key.chars().count() > MAX_FACT_KEY_LEN || value.chars().count() > MAX_FACT_VALUE_LEN {
            return format!(
                "MEMORY REJECTED. Keys hold {} characters, values {}.",
                MAX_FACT_KEY_LEN, MAX_FACT_VALUE_LEN
            );
        }
        match session.remember(key, value) {
            MemoryOutcome::Stored => format!("MEMORY LOGGED. {} = {}", key, value),
            MemoryOutcome::Replaced => format!("MEMORY UPDATED. {} = {}", key, value),
            MemoryOutcome::Full => {
                "MEMORY BANK FULL. Overwrite an existing key instead.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunt::commands::normalize;

    fn engine() -> PuzzleEngine {
        PuzzleEngine::new(HelpOrder::Catalog)
    }

    fn say(engine: &PuzzleEngine, session: &mut HuntSession, raw: &str) -> Outcome {
        engine.evaluate(session, &normalize(raw))
    }

    fn text(outcome: Outcome) -> String {
        match outcome {
            Outcome::Reply(r) => r.text,
            Outcome::Fallthrough => panic!("expected a puzzle reply, got fallthrough"),
        }
    }

    #[test]
    fn help_lists_every_command_without_mutation() {
        let e = engine();
        let mut s = HuntSession::new("h".into());
        let help = text(say(&e, &mut s, "/help"));
        for cmd in e.catalog().all_commands() {
            assert!(help.contains(cmd), "missing {cmd}");
        }
        for fixed in ["/unlock", "/decode", "/help"] {
            assert!(help.contains(fixed));
        }
        assert_eq!(s.cursor("DECRYPT"), 0);
    }

    #[test]
    fn shuffled_help_has_the_same_entries() {
        let catalog_help = engine().help_text();
        let shuffled_help = PuzzleEngine::new(HelpOrder::Shuffled).help_text();
        let mut a: Vec<_> = catalog_help.lines().collect();
        let mut b: Vec<_> = shuffled_help.lines().collect();
        a.sort();
        b.sort();
        assert_eq!(a, b);
    }

    #[test]
    fn steps_must_come_in_order() {
        let e = engine();
        let mut s = HuntSession::new("o".into());
        assert_eq!(say(&e, &mut s, "/isolate_frequency 77.5"), Outcome::Fallthrough);
        assert_eq!(s.cursor("DECRYPT"), 0);
        assert!(text(say(&e, &mut s, "/scan_network")).contains("77.5 MHz"));
        assert_eq!(s.cursor("DECRYPT"), 1);
        assert_eq!(say(&e, &mut s, "/scan_network"), Outcome::Fallthrough);
        assert_eq!(s.cursor("DECRYPT"), 1);
    }

    #[test]
    fn chains_do_not_share_progress() {
        let e = engine();
        let mut s = HuntSession::new("x".into());
        assert_eq!(say(&e, &mut s, "/exploit_port 192.168.1.101"), Outcome::Fallthrough);
        say(&e, &mut s, "/trace_signal");
        assert_eq!(s.cursor("PROTOCOL"), 1);
        assert_eq!(s.cursor("DECRYPT"), 0);
        assert_eq!(s.cursor("OMEGA"), 0);
        assert_eq!(s.cursor("NOW"), 0);
    }

    #[test]
    fn finished_chain_stops_matching() {
        let e = engine();
        let mut s = HuntSession::new("f".into());
        for cmd in ["/execute_payload", "/scan_biometrics", "/force_override"] {
            say(&e, &mut s, cmd);
        }
        assert_eq!(s.cursor("NOW"), 3);
        assert_eq!(say(&e, &mut s, "/force_override"), Outcome::Fallthrough);
        assert_eq!(s.cursor("NOW"), 3);
    }

    #[test]
    fn decode_ignores_chain_progress() {
        let e = engine();
        let mut s = HuntSession::new("d".into());
        let reply = text(say(&e, &mut s, "/decode QRPELCG"));
        assert!(reply.contains("DECRYPT"));
        assert!(s.has_fragment("DECRYPT"));
        assert_eq!(s.cursor("DECRYPT"), 0);
    }

    #[test]
    fn decode_failure_leaves_state() {
        let e = engine();
        let mut s = HuntSession::new("d".into());
        let reply = text(say(&e, &mut s, "/decode DECRYPT"));
        assert!(reply.starts_with("DECRYPTION FAILED"));
        assert!(s.found_fragments.is_empty());
    }

    #[test]
    fn last_fragment_adds_unlock_hint_once() {
        let e = engine();
        let mut s = HuntSession::new("d".into());
        for token in ["qrpelcg", "cebgbpby", "bzrtn"] {
            assert!(!text(say(&e, &mut s, &format!("/decode {token}"))).contains("/unlock"));
        }
        assert!(text(say(&e, &mut s, "/decode abj")).contains("/unlock"));
        assert!(!text(say(&e, &mut s, "/decode abj")).contains("/unlock"));
        assert_eq!(s.found_fragments.len(), 4);
    }

    #[test]
    fn unlock_needs_only_the_phrase() {
        let e = engine();
        let mut s = HuntSession::new("u".into());
        match say(&e, &mut s, "/unlock Decrypt Protocol Omega Now") {
            Outcome::Reply(r) => assert!(r.mission_complete),
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.mission_complete);
        assert!(s.found_fragments.is_empty());
    }

    #[test]
    fn wrong_unlock_changes_nothing() {
        let e = engine();
        let mut s = HuntSession::new("u".into());
        match say(&e, &mut s, "/unlock decrypt protocol omega later") {
            Outcome::Reply(r) => {
                assert!(!r.mission_complete);
                assert!(r.text.contains("DENIED"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!s.mission_complete);
    }

    #[test]
    fn status_reports_progress() {
        let e = engine();
        let mut s = HuntSession::new("st".into());
        say(&e, &mut s, "/breach_firewall");
        say(&e, &mut s, "/decode abj");
        let status = text(say(&e, &mut s, "/status"));
        assert!(status.contains("OMEGA 1/3"));
        assert!(status.contains("Fragments: NOW"));
        assert!(status.contains("ACTIVE"));
    }

    #[test]
    fn remember_validates_lengths() {
        let e = engine();
        let mut s = HuntSession::new("m".into());
        assert!(text(say(&e, &mut s, "/remember codename night owl")).starts_with("MEMORY LOGGED"));
        assert_eq!(s.memory.get("codename").map(String::as_str), Some("night owl"));
        let long_key = "k".repeat(MAX_FACT_KEY_LEN + 1);
        let rejected = text(say(&e, &mut s, &format!("/remember {long_key} v")));
        assert!(rejected.starts_with("MEMORY REJECTED"));
    }

    #[test]
    fn usage_for_bare_verbs_and_fallthrough_for_chatter() {
        let e = engine();
        let mut s = HuntSession::new("z".into());
        assert_eq!(text(say(&e, &mut s, "/decode")), commands::DECODE_USAGE);
        assert_eq!(say(&e, &mut s, "who are you?"), Outcome::Fallthrough);
        assert_eq!(say(&e, &mut s, "/self_destruct"), Outcome::Fallthrough);
    }

    #[test]
    fn help_with_trailing_text_falls_through() {
        let e = engine();
        let mut s = HuntSession::new("h".into());
        assert_eq!(say(&e, &mut s, "/help me"), Outcome::Fallthrough);
        assert!(s.found_fragments.is_empty());
    }
}
