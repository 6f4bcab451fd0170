//! Typed flag descriptors and the process-wide flag registry
//!
//! Flags are immutable after registration. The registry enforces key
//! uniqueness and requires a fallback flag to be registered before any
//! flag that names it, which keeps fallback chains acyclic by construction.

mod builtin;

pub use builtin::{register_builtins, BuiltinFlags};

use crate::types::{FlagRegistryError, GameMode};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Allow/deny state carried by protection flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Allow,
    Deny,
}

impl State {
    /// Logical AND of permission: deny beats allow
    pub fn combine(self, other: State) -> State {
        if self == State::Deny || other == State::Deny {
            State::Deny
        } else {
            State::Allow
        }
    }
}

/// The value type a flag declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlagKind {
    State,
    Bool,
    Int,
    GameMode,
    Text,
    StringSet,
}

/// A flag value as stored in a region override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlagValue {
    State(State),
    Bool(bool),
    Int(i64),
    GameMode(GameMode),
    Text(String),
    StringSet(BTreeSet<String>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::State(_) => FlagKind::State,
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::GameMode(_) => FlagKind::GameMode,
            FlagValue::Text(_) => FlagKind::Text,
            FlagValue::StringSet(_) => FlagKind::StringSet,
        }
    }

    pub fn as_state(&self) -> Option<State> {
        match self {
            FlagValue::State(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_game_mode(&self) -> Option<GameMode> {
        match self {
            FlagValue::GameMode(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FlagValue::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_string_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            FlagValue::StringSet(s) => Some(s),
            _ => None,
        }
    }
}

/// An immutable flag descriptor
///
/// Identity is the string key. A flag may declare a fallback flag that is
/// consulted when this flag resolves to unset, and a default applied by
/// callers when resolution yields nothing at all.
#[derive(Debug, Clone)]
pub struct Flag {
    key: String,
    kind: FlagKind,
    default: Option<FlagValue>,
    fallback: Option<Arc<Flag>>,
    member_overridable: bool,
}

impl Flag {
    pub fn new(key: impl Into<String>, kind: FlagKind) -> Self {
        Self {
            key: key.into(),
            kind,
            default: None,
            fallback: None,
            member_overridable: false,
        }
    }

    /// State flag shorthand with a default state
    pub fn state(key: impl Into<String>, default: State) -> Self {
        Self::new(key, FlagKind::State).with_default(FlagValue::State(default))
    }

    pub fn with_default(mut self, default: FlagValue) -> Self {
        debug_assert_eq!(default.kind(), self.kind);
        self.default = Some(default);
        self
    }

    /// Declare a fallback flag consulted when this flag resolves to unset
    ///
    /// The fallback must already be registered when this flag is, which
    /// rules out fallback cycles among registered flags.
    pub fn with_fallback(mut self, fallback: &Arc<Flag>) -> Self {
        self.fallback = Some(Arc::clone(fallback));
        self
    }

    /// Mark this flag as overridable by region membership: owners and
    /// members of an applicable region are permitted regardless of the
    /// resolved value.
    pub fn member_overridable(mut self) -> Self {
        self.member_overridable = true;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn kind(&self) -> FlagKind {
        self.kind
    }

    pub fn default(&self) -> Option<&FlagValue> {
        self.default.as_ref()
    }

    pub fn fallback(&self) -> Option<&Flag> {
        self.fallback.as_deref()
    }

    pub fn is_member_overridable(&self) -> bool {
        self.member_overridable
    }
}

/// Process-wide catalog of registered flags
pub struct FlagRegistry {
    flags: DashMap<String, Arc<Flag>>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self {
            flags: DashMap::new(),
        }
    }

    /// Register a flag
    ///
    /// Fails if the key is taken or the declared fallback is unknown.
    pub fn register(&self, flag: Flag) -> Result<Arc<Flag>, FlagRegistryError> {
        if let Some(fallback) = flag.fallback() {
            if !self.flags.contains_key(fallback.key()) {
                return Err(FlagRegistryError::UnknownFallback(fallback.key().to_string()));
            }
        }

        let key = flag.key().to_string();
        let flag = Arc::new(flag);

        // Entry-based insert so concurrent duplicate registration cannot race
        match self.flags.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(FlagRegistryError::DuplicateKey(key))
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&flag));
                tracing::debug!("Registered flag '{}'", flag.key());
                Ok(flag)
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<Flag>> {
        self.flags.get(key).map(|f| Arc::clone(f.value()))
    }

    pub fn count(&self) -> usize {
        self.flags.len()
    }
}

impl Default for FlagRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_registration_fails() {
        let registry = FlagRegistry::new();
        registry
            .register(Flag::state("pvp", State::Allow))
            .unwrap();
        let err = registry.register(Flag::state("pvp", State::Deny));
        assert!(matches!(err, Err(FlagRegistryError::DuplicateKey(k)) if k == "pvp"));
    }

    #[test]
    fn fallback_must_exist() {
        let registry = FlagRegistry::new();
        let unregistered = Arc::new(Flag::state("enderpearl", State::Allow));
        let err = registry.register(
            Flag::state("chorus-teleport", State::Allow).with_fallback(&unregistered),
        );
        assert!(matches!(err, Err(FlagRegistryError::UnknownFallback(_))));

        let enderpearl = registry
            .register(Flag::state("enderpearl", State::Allow))
            .unwrap();
        registry
            .register(Flag::state("chorus-teleport", State::Allow).with_fallback(&enderpearl))
            .unwrap();
    }

    #[test]
    fn deny_beats_allow_when_combined() {
        assert_eq!(State::Allow.combine(State::Deny), State::Deny);
        assert_eq!(State::Deny.combine(State::Allow), State::Deny);
        assert_eq!(State::Allow.combine(State::Allow), State::Allow);
    }
}
