//! Command allow/block pattern filter
//!
//! Built per decision from the `allowed-cmds` / `blocked-cmds` flags of the
//! actor's current region set. Patterns are glob-style or exact,
//! case-insensitive, leading-slash-normalized; a non-wildcard pattern also
//! matches its sub-commands, so `region` covers `/region claim`.

use regex::Regex;
use std::collections::BTreeSet;

/// Evaluates allow/block pattern sets against a command string
///
/// Block entries take precedence over allow entries. An empty allow-set
/// means "allow unless blocked"; a non-empty allow-set means "deny unless
/// explicitly allowed, and not blocked".
pub struct CommandFilter {
    allowed: Vec<Regex>,
    blocked: Vec<Regex>,
}

impl CommandFilter {
    pub fn new(allowed: Option<&BTreeSet<String>>, blocked: Option<&BTreeSet<String>>) -> Self {
        Self {
            allowed: compile_patterns(allowed),
            blocked: compile_patterns(blocked),
        }
    }

    /// Whether the command is permitted
    pub fn permits(&self, command: &str) -> bool {
        let normalized = normalize(command);

        if self.blocked.iter().any(|p| p.is_match(&normalized)) {
            return false;
        }
        if self.allowed.is_empty() {
            return true;
        }
        self.allowed.iter().any(|p| p.is_match(&normalized))
    }
}

fn normalize(command: &str) -> String {
    command.trim().trim_start_matches('/').to_lowercase()
}

fn compile_patterns(patterns: Option<&BTreeSet<String>>) -> Vec<Regex> {
    patterns
        .into_iter()
        .flatten()
        .filter_map(|p| {
            let regex = pattern_to_regex(&normalize(p));
            match Regex::new(&regex) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!("Ignoring unparseable command pattern '{}': {}", p, e);
                    None
                }
            }
        })
        .collect()
}

/// Translate a glob-style command pattern into an anchored regex
///
/// `*` matches any run of characters, `?` a single character. A pattern
/// without a trailing wildcard also matches sub-commands separated by
/// whitespace.
fn pattern_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }
    out.push_str(r"(\s.*)?$");
    out
}
