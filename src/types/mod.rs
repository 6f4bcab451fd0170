//! Core type definitions for the palisade runtime

mod errors;
mod ids;
mod location;

pub use ids::*;
pub use location::*;

pub use errors::{
    BootstrapError, FlagRegistryError, ProfileCacheError, RegionError, SessionError,
    ShutdownError, SubmitError,
};
