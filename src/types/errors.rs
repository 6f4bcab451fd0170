//! Error types for the palisade runtime

use super::ids::{ActorId, WorldId};
use thiserror::Error;

/// Runtime bootstrap errors
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Flag registration failed: {0}")]
    FlagRegistration(#[from] FlagRegistryError),

    #[error("Initialization failed: {0}")]
    InitializationFailed(String),
}

/// Runtime shutdown errors
#[derive(Debug, Error)]
pub enum ShutdownError {
    #[error("Failed to persist state: {0}")]
    PersistenceError(String),
}

/// Flag registry errors - fatal at registration time
#[derive(Debug, Error)]
pub enum FlagRegistryError {
    #[error("Flag key already registered: {0}")]
    DuplicateKey(String),

    #[error("Fallback flag not registered: {0}")]
    UnknownFallback(String),
}

/// Region configuration errors - fatal at registration time
#[derive(Debug, Error)]
pub enum RegionError {
    #[error("Parent chain for region '{0}' would contain a cycle")]
    CyclicParent(String),

    #[error("Parent region not found: {0}")]
    UnknownParent(String),

    #[error("No region '{id}' in {world}")]
    NoSuchRegion { world: WorldId, id: String },

    #[error("Value for flag '{flag}' has kind {actual:?}, expected {expected:?}")]
    ValueKind {
        flag: String,
        expected: crate::flags::FlagKind,
        actual: crate::flags::FlagKind,
    },

    #[error("The global region cannot be removed or re-parented")]
    GlobalRegion,
}

/// Session engine errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Actor {0} is not a player")]
    NotAPlayer(ActorId),

    #[error("No session for actor {0}")]
    NoSession(ActorId),
}

/// Task submission errors
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Supervisor capacity exceeded (max concurrent + queue bound)")]
    CapacityExceeded,

    #[error("Supervisor is shutting down")]
    ShuttingDown,
}

/// Profile cache errors
#[derive(Debug, Error)]
pub enum ProfileCacheError {
    #[error("Failed to open persistent profile store: {0}")]
    StoreUnavailable(String),
}
