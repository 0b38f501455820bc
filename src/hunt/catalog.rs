//! Static puzzle catalog: four named chains of three command/response steps each.
//!
//! Each chain rewards one data fragment. The final step's response surfaces the
//! fragment in its enciphered form; the plaintext only enters a session through
//! `/decode`. Concatenating the plaintext fragments in catalog order, space-joined,
//! yields the final unlock phrase.

use std::sync::OnceLock;

use super::cipher::rot13;

/// Chain names in catalog order. Each name doubles as its fragment's plaintext.
pub const CHAIN_NAMES: [&str; 4] = ["DECRYPT", "PROTOCOL", "OMEGA", "NOW"];

/// A single step: an exact, lower-cased command and the reply it earns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: &'static str,
    pub response: String,
}

#[derive(Debug, Clone)]
pub struct Chain {
    pub name: &'static str,
    pub fragment: &'static str,
    pub encoded: String,
    pub steps: Vec<Step>,
}

impl Chain {
    fn new(fragment: &'static str, script: [(&'static str, &str); 3]) -> Self {
        let encoded = rot13(fragment);
        let steps = script
            .into_iter()
            .map(|(command, response)| Step {
                command,
                response: response.replace("{fragment}", &encoded),
            })
            .collect();
        Chain {
            name: fragment,
            fragment,
            encoded,
            steps,
        }
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The step expected next for a given cursor, if the chain is not finished.
    pub fn step_at(&self, cursor: usize) -> Option<&Step> {
        self.steps.get(cursor)
    }
}

#[derive(Debug)]
pub struct Catalog {
    chains: Vec<Chain>,
}

static CATALOG: OnceLock<Catalog> = OnceLock::new();

const ACQUIRED: &str = "DATA FRAGMENT ACQUIRED: [ {fragment} ]. Use the DECODE terminal.";

impl Catalog {
    /// The process-wide catalog, built on first use.
    pub fn standard() -> &'static Catalog {
        CATALOG.get_or_init(Catalog::build)
    }

    fn build() -> Catalog {
        let chains = vec![
            Chain::new(
                "DECRYPT",
                [
                    ("/scan_network", "Network scan initiated... Encrypted node detected at frequency 77.5 MHz. Recommend: /isolate_frequency [frequency]"),
                    ("/isolate_frequency 77.5", "Frequency isolated. Repeating data packet found. Recommend: /capture_packet"),
                    ("/capture_packet", &format!("Packet captured. Payload is encrypted. {ACQUIRED}")),
                ],
            ),
            Chain::new(
                "PROTOCOL",
                [
                    ("/trace_signal", "Signal trace active... Vulnerable entry point detected at IP 192.168.1.101. Recommend: /exploit_port [ip_address]"),
                    ("/exploit_port 192.168.1.101", "Exploit successful. System logs acquired. Recommend: /parse_logs"),
                    ("/parse_logs", &format!("Logs parsed. Hidden directive found. {ACQUIRED}")),
                ],
            ),
            Chain::new(
                "OMEGA",
                [
                    ("/breach_firewall", "Firewall breach initiated... Security requires a decryption key. Intel suggests it's a project name. Recommend: /query_directives"),
                    ("/query_directives", "Directives queried. Found reference to 'Project Chimera'. Recommend: /use_key [key]"),
                    ("/use_key chimera", &format!("Key accepted. Firewall bypassed. {ACQUIRED}")),
                ],
            ),
            Chain::new(
                "NOW",
                [
                    ("/execute_payload", "Payload execution requires authentication. A biometric signature is needed. Recommend: /scan_biometrics"),
                    ("/scan_biometrics", "Biometric scan active... Signature does not match authorized personnel. An override is possible. Recommend: /force_override"),
                    ("/force_override", &format!("Override successful. Payload executed. {ACQUIRED}")),
                ],
            ),
        ];
        Catalog { chains }
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Find the chain whose enciphered fragment matches `token` (case-insensitive).
    pub fn chain_by_encoded(&self, token: &str) -> Option<&Chain> {
        let wanted = token.trim().to_uppercase();
        self.chains.iter().find(|c| c.encoded == wanted)
    }

    /// Plaintext unlock phrase: every fragment in catalog order, space-joined.
    pub fn final_phrase(&self) -> String {
        self.chains
            .iter()
            .map(|c| c.fragment)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Enciphered unlock phrase. Surfaced for reference only; unlock compares plaintext.
    pub fn encoded_phrase(&self) -> String {
        rot13(&self.final_phrase())
    }

    /// Every chain step command in catalog order.
    pub fn all_commands(&self) -> Vec<&'static str> {
        self.chains
            .iter()
            .flat_map(|c| c.steps.iter().map(|s| s.command))
            .collect()
    }
}
