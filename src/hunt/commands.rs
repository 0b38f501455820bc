//! Chat command grammar.
//!
//! Player input is normalized (trimmed, lower-cased) and split into a verb and an
//! optional argument. The verb decides the variant; nothing downstream probes raw
//! string prefixes. Chain step commands are not part of the grammar: they are
//! matched against the whole normalized line by the engine before any verb is
//! dispatched, so they surface here as [`HuntCommand::Directive`].
use log::trace;

pub const HELP: &str = "/help";
pub const DECODE: &str = "/decode";
pub const UNLOCK: &str = "/unlock";
pub const STATUS: &str = "/status";
pub const REMEMBER: &str = "/remember";

pub const DECODE_USAGE: &str = "Usage: /decode <fragment>";
pub const UNLOCK_USAGE: &str = "Usage: /unlock <phrase>";
pub const REMEMBER_USAGE: &str = "Usage: /remember <key> <value>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HuntCommand {
    Help,
    Decode(String),
    Unlock(String),
    Status,
    Remember { key: String, value: String },
    /// Recognized verb with a missing or malformed argument; carries the usage line.
    Invalid(&'static str),
    /// Any other slash-prefixed line (chain steps, unknown directives).
    Directive(String),
    /// Free-form chat with no slash prefix.
    Chatter,
}

/// Trim and lower-case a raw chat line.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Split a normalized line into its verb and trimmed, non-empty argument.
pub fn split_verb(line: &str) -> (&str, Option<&str>) {
    match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => {
            let rest = rest.trim();
            (verb, if rest.is_empty() { None } else { Some(rest) })
        }
        None => (line, None),
    }
}

pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse an already-normalized line.
    pub fn parse(&self, line: &str) -> HuntCommand {
        if !line.starts_with('/') {
            return HuntCommand::Chatter;
        }
        let (verb, arg) = split_verb(line);
        let cmd = match (verb, arg) {
            (HELP, None) => HuntCommand::Help,
            (STATUS, _) => HuntCommand::Status,
            (DECODE, Some(token)) => HuntCommand::Decode(token.to_string()),
            (DECODE, None) => HuntCommand::Invalid(DECODE_USAGE),
            (UNLOCK, Some(phrase)) => HuntCommand::Unlock(phrase.to_string()),
            (UNLOCK, None) => HuntCommand::Invalid(UNLOCK_USAGE),
            (REMEMBER, Some(rest)) => match split_verb(rest) {
                (key, Some(value)) => HuntCommand::Remember {
                    key: key.to_string(),
                    value: value.to_string(),
                },
                _ => HuntCommand::Invalid(REMEMBER_USAGE),
            },
            (REMEMBER, None) => HuntCommand::Invalid(REMEMBER_USAGE),
            _ => HuntCommand::Directive(line.to_string()),
        };
        trace!("Parsed {:?} from '{}'", cmd, line);
        cmd
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> HuntCommand {
        CommandParser::new().parse(&normalize(raw))
    }

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  /Scan_Network \n"), "/scan_network");
    }

    #[test]
    fn help_is_only_the_bare_verb() {
        assert_eq!(parse("/HELP"), HuntCommand::Help);
        assert_eq!(parse("/help me"), HuntCommand::Directive("/help me".into()));
    }

    #[test]
    fn decode_and_unlock_take_arguments() {
        assert_eq!(parse("/decode QRPELCG"), HuntCommand::Decode("qrpelcg".into()));
        assert_eq!(
            parse("/unlock Decrypt  Protocol Omega Now "),
            HuntCommand::Unlock("decrypt  protocol omega now".into())
        );
    }

    #[test]
    fn bare_verbs_are_invalid() {
        assert_eq!(parse("/decode"), HuntCommand::Invalid(DECODE_USAGE));
        assert_eq!(parse("/unlock   "), HuntCommand::Invalid(UNLOCK_USAGE));
        assert_eq!(parse("/remember name"), HuntCommand::Invalid(REMEMBER_USAGE));
    }

    #[test]
    fn prefix_without_separator_is_not_the_verb() {
        assert_eq!(parse("/decodeqrpelcg"), HuntCommand::Directive("/decodeqrpelcg".into()));
    }

    #[test]
    fn remember_splits_key_and_value() {
        assert_eq!(
            parse("/remember codename Night Owl"),
            HuntCommand::Remember { key: "codename".into(), value: "night owl".into() }
        );
    }

    #[test]
    fn other_lines() {
        assert_eq!(parse("/scan_network"), HuntCommand::Directive("/scan_network".into()));
        assert_eq!(parse("hello there"), HuntCommand::Chatter);
        assert_eq!(parse("/status"), HuntCommand::Status);
    }
}
