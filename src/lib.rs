//! Palisade: region-based action authorization for virtual worlds
//!
//! The runtime answers one question on the hot path: may this actor
//! perform this action at this location, right now? Worlds are covered by
//! overlapping, prioritized [`regions::ProtectedRegion`]s carrying typed
//! flag overrides; per-actor [`session`] handlers enforce the resolved
//! rules continuously as actors move, teleport, chat and change game mode.
//!
//! ```no_run
//! use palisade::{Collaborators, GuardRuntime, RuntimeConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let runtime = GuardRuntime::bootstrap(RuntimeConfig::default(), Collaborators::default())
//!         .await
//!         .unwrap();
//!     // wire the runtime into the dispatcher's event hooks...
//!     runtime.shutdown().await.unwrap();
//! }
//! ```

pub mod config;
pub mod filter;
pub mod flags;
pub mod profile;
pub mod regions;
pub mod runtime;
pub mod session;
pub mod supervisor;
pub mod telemetry;
pub mod types;

pub use config::RuntimeConfig;
pub use filter::CommandFilter;
pub use flags::{Flag, FlagKind, FlagValue, State};
pub use regions::{ApplicableRegionSet, Bounds, ProtectedRegion, RegionIndex, GLOBAL_REGION};
pub use runtime::{Collaborators, GuardRuntime};
pub use session::{Denial, Handler, HandlerContext, HandlerKind, Session, SessionManager};
pub use supervisor::{CancelSignal, Supervisor, Task, TaskState};
pub use types::{Actor, ActorId, GameMode, Location, MoveType, Point, WorldId};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
