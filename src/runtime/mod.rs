//! Runtime assembly and lifecycle
//!
//! [`GuardRuntime`] wires the flag registry, region index, session engine,
//! supervisor and profile service together, in that order, so that every
//! subsystem's dependencies exist before it does. The handle is cheap to
//! clone and shared with the embedding dispatcher.

use crate::config::RuntimeConfig;
use crate::filter::CommandFilter;
use crate::flags::{register_builtins, BuiltinFlags, FlagRegistry};
use crate::profile::{MemoryProfileCache, Profile, ProfileCache, ProfileResolver, ProfileService};
use crate::regions::RegionIndex;
use crate::session::{default_factories, BypassProvider, Denial, NoBypass, Session, SessionManager};
use crate::supervisor::Supervisor;
use crate::telemetry::RuntimeTelemetry;
use crate::types::{
    Actor, ActorId, BootstrapError, GameMode, Location, MoveType, ProfileCacheError, SessionError,
    ShutdownError,
};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Opens the persistent profile store; failure falls back to memory
pub type ProfileStoreOpener =
    Box<dyn FnOnce() -> Result<Arc<dyn ProfileCache>, ProfileCacheError> + Send>;

/// Host-provided collaborators injected at bootstrap
///
/// Everything here is optional; the defaults grant bypass to nobody and
/// keep profiles in memory only.
pub struct Collaborators {
    pub bypass: Arc<dyn BypassProvider>,
    pub profile_store: Option<ProfileStoreOpener>,
    pub profile_resolver: Option<Arc<dyn ProfileResolver>>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            bypass: Arc::new(NoBypass),
            profile_store: None,
            profile_resolver: None,
        }
    }
}

/// The region authorization runtime
#[derive(Clone)]
pub struct GuardRuntime {
    inner: Arc<RuntimeInner>,
}

struct RuntimeInner {
    flag_registry: Arc<FlagRegistry>,
    flags: BuiltinFlags,
    regions: Arc<RegionIndex>,
    sessions: Arc<SessionManager>,
    supervisor: Arc<Supervisor>,
    profiles: Arc<ProfileService>,
    telemetry: Arc<RuntimeTelemetry>,
    shutdown: RwLock<bool>,
}

impl GuardRuntime {
    /// Bootstrap the runtime
    ///
    /// Initializes all subsystems in dependency order. A failing persistent
    /// profile store degrades to the in-memory cache instead of failing
    /// bootstrap; flag registration failures are fatal.
    pub async fn bootstrap(
        config: RuntimeConfig,
        collaborators: Collaborators,
    ) -> Result<Self, BootstrapError> {
        tracing::info!("Bootstrapping region authorization runtime");

        // Phase 1: Observability first, so later phases can emit
        tracing::debug!("Phase 1: Initializing telemetry");
        let telemetry = Arc::new(RuntimeTelemetry::new(&config.telemetry));

        // Phase 2: Flag registry and the built-in flag set
        tracing::debug!("Phase 2: Registering built-in flags");
        let flag_registry = Arc::new(FlagRegistry::new());
        let flags = register_builtins(&flag_registry)?;

        // Phase 3: Region index
        tracing::debug!("Phase 3: Initializing region index");
        let regions = Arc::new(RegionIndex::new());

        // Phase 4: Task supervisor
        tracing::debug!("Phase 4: Initializing task supervisor");
        let supervisor = Arc::new(Supervisor::new(&config.supervisor));

        // Phase 5: Profile service, with store fallback
        tracing::debug!("Phase 5: Initializing profile service");
        let cache: Arc<dyn ProfileCache> = match collaborators.profile_store {
            Some(open) => match open() {
                Ok(store) => store,
                Err(e) => {
                    tracing::warn!("Profile store unavailable, using memory cache: {}", e);
                    Arc::new(MemoryProfileCache::new())
                }
            },
            None => Arc::new(MemoryProfileCache::new()),
        };
        let profiles = Arc::new(ProfileService::new(
            cache,
            collaborators.profile_resolver,
            Arc::clone(&telemetry),
        ));

        // Phase 6: Session engine
        tracing::debug!("Phase 6: Initializing session engine");
        let sessions = Arc::new(SessionManager::new(
            &config.sessions,
            Arc::clone(&regions),
            flags.clone(),
            collaborators.bypass,
            Arc::clone(&telemetry),
            default_factories(),
        ));

        tracing::info!("Runtime bootstrapped");

        Ok(Self {
            inner: Arc::new(RuntimeInner {
                flag_registry,
                flags,
                regions,
                sessions,
                supervisor,
                profiles,
                telemetry,
                shutdown: RwLock::new(false),
            }),
        })
    }

    /// Shut down gracefully
    ///
    /// Idempotent. Cancels outstanding background work, waits up to the
    /// configured grace period, then flushes telemetry. Tasks still running
    /// after the grace period are abandoned and logged, never waited on
    /// indefinitely.
    pub async fn shutdown(&self) -> Result<(), ShutdownError> {
        {
            let mut shutdown = self.inner.shutdown.write().await;
            if *shutdown {
                tracing::warn!("Runtime already shut down");
                return Ok(());
            }
            *shutdown = true;
        }

        tracing::info!("Shutting down region authorization runtime");
        let abandoned = self.inner.supervisor.shutdown().await;
        if abandoned > 0 {
            tracing::warn!("{} background tasks abandoned at shutdown", abandoned);
        }
        self.inner.telemetry.flush();
        tracing::info!("Runtime shutdown complete");
        Ok(())
    }

    pub async fn is_shutting_down(&self) -> bool {
        *self.inner.shutdown.read().await
    }

    /// Connect trigger: create the session and write the profile through in
    /// the background
    pub async fn handle_join(&self, actor: &Actor) -> Result<Arc<Session>, SessionError> {
        let session = self.inner.sessions.handle_join(actor)?;
        self.inner
            .profiles
            .record(
                &self.inner.supervisor,
                Profile::new(actor.id, actor.name.clone()),
            )
            .await;
        Ok(session)
    }

    /// Disconnect trigger: destroy the session
    pub fn handle_disconnect(&self, actor: ActorId) {
        self.inner.sessions.handle_disconnect(actor);
    }

    /// Validate a positional change; `Some` means the movement must be
    /// reverted or cancelled
    pub fn test_move_to(&self, actor: &Actor, to: &Location, move_type: MoveType) -> Option<Denial> {
        self.inner.sessions.test_move_to(actor, to, move_type)
    }

    /// Route an externally reported game-mode change; `false` vetoes it
    pub fn handle_game_mode_change(&self, actor: &Actor, new_mode: GameMode) -> bool {
        self.inner.sessions.handle_game_mode_change(actor, new_mode)
    }

    /// Validate a chat send at the actor's current location
    pub fn test_send_chat(&self, actor: &Actor) -> Option<Denial> {
        self.inner.sessions.test_send_chat(actor)
    }

    /// Whether the actor may receive chat at their current location; used
    /// to filter recipients
    pub fn test_receive_chat(&self, actor: &Actor) -> bool {
        self.inner.sessions.test_receive_chat(actor)
    }

    /// Command filter for the actor's current region set
    pub fn command_filter(&self, actor: &Actor) -> CommandFilter {
        self.inner.sessions.command_filter(actor)
    }

    // Subsystem accessors

    pub fn flag_registry(&self) -> &Arc<FlagRegistry> {
        &self.inner.flag_registry
    }

    pub fn flags(&self) -> &BuiltinFlags {
        &self.inner.flags
    }

    pub fn regions(&self) -> &Arc<RegionIndex> {
        &self.inner.regions
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.inner.sessions
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.inner.supervisor
    }

    pub fn profiles(&self) -> &Arc<ProfileService> {
        &self.inner.profiles
    }

    pub fn telemetry(&self) -> &Arc<RuntimeTelemetry> {
        &self.inner.telemetry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_failure_degrades_to_memory_cache() {
        let collaborators = Collaborators {
            profile_store: Some(Box::new(|| {
                Err(ProfileCacheError::StoreUnavailable("disk full".into()))
            })),
            ..Collaborators::default()
        };
        let runtime = GuardRuntime::bootstrap(RuntimeConfig::default(), collaborators)
            .await
            .unwrap();

        let id = ActorId::new();
        runtime.profiles().cache().put(Profile::new(id, "alex"));
        assert_eq!(
            runtime.profiles().cache().get(id).map(|p| p.name),
            Some("alex".to_string())
        );
        runtime.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let runtime = GuardRuntime::bootstrap(RuntimeConfig::default(), Collaborators::default())
            .await
            .unwrap();
        runtime.shutdown().await.unwrap();
        runtime.shutdown().await.unwrap();
        assert!(runtime.is_shutting_down().await);
    }
}
