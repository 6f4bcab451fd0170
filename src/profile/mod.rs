//! Profile cache and asynchronous profile resolution
//!
//! The cache maps actor ids to display names. Persistence is collaborator
//! owned: the runtime accepts an externally opened store and falls back to
//! the in-memory cache when opening fails, degrading instead of failing
//! startup. Population happens through the supervisor, never on the
//! decision path.

use crate::supervisor::Supervisor;
use crate::telemetry::RuntimeTelemetry;
use crate::types::{ActorId, SubmitError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A cached actor profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ActorId,
    pub name: String,
}

impl Profile {
    pub fn new(id: ActorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Write-through profile cache collaborator
pub trait ProfileCache: Send + Sync {
    fn put(&self, profile: Profile);
    fn get(&self, id: ActorId) -> Option<Profile>;
}

/// In-memory cache, also the fallback when a persistent store is unavailable
pub struct MemoryProfileCache {
    entries: DashMap<ActorId, CachedProfile>,
}

struct CachedProfile {
    profile: Profile,
    #[allow(dead_code)]
    cached_at: DateTime<Utc>,
}

impl MemoryProfileCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCache for MemoryProfileCache {
    fn put(&self, profile: Profile) {
        self.entries.insert(
            profile.id,
            CachedProfile {
                profile,
                cached_at: Utc::now(),
            },
        );
    }

    fn get(&self, id: ActorId) -> Option<Profile> {
        self.entries.get(&id).map(|e| e.profile.clone())
    }
}

/// External resolver for profiles not known locally
#[async_trait]
pub trait ProfileResolver: Send + Sync {
    async fn resolve(&self, id: ActorId) -> Option<Profile>;
}

/// Asynchronously populates the cache through the supervisor
pub struct ProfileService {
    cache: Arc<dyn ProfileCache>,
    resolver: Option<Arc<dyn ProfileResolver>>,
    telemetry: Arc<RuntimeTelemetry>,
}

impl ProfileService {
    pub fn new(
        cache: Arc<dyn ProfileCache>,
        resolver: Option<Arc<dyn ProfileResolver>>,
        telemetry: Arc<RuntimeTelemetry>,
    ) -> Self {
        Self {
            cache,
            resolver,
            telemetry,
        }
    }

    pub fn cache(&self) -> &Arc<dyn ProfileCache> {
        &self.cache
    }

    /// Write a known profile through to the cache in the background
    ///
    /// Used on join, when the dispatcher already knows the display name.
    /// Fire and forget: a rejected submission is logged, never surfaced to
    /// the join path.
    pub async fn record(&self, supervisor: &Supervisor, profile: Profile) {
        let cache = Arc::clone(&self.cache);
        let name = format!("profile-write:{}", profile.name);
        let result = supervisor
            .submit(name, move |_signal| async move {
                cache.put(profile);
                Ok(())
            })
            .await;

        if let Err(e) = result {
            tracing::warn!("Profile write-through rejected: {}", e);
            self.telemetry.task_rejected();
        }
    }

    /// Resolve and cache a profile by id in the background
    pub async fn lookup(&self, supervisor: &Supervisor, id: ActorId) -> Result<(), SubmitError> {
        let Some(resolver) = self.resolver.as_ref().map(Arc::clone) else {
            return Ok(());
        };
        let cache = Arc::clone(&self.cache);

        supervisor
            .submit(format!("profile-lookup:{}", id), move |signal| async move {
                if signal.is_cancelled() {
                    return Ok(());
                }
                match resolver.resolve(id).await {
                    Some(profile) => {
                        cache.put(profile);
                        Ok(())
                    }
                    None => {
                        tracing::debug!("No profile found for {}", id);
                        Ok(())
                    }
                }
            })
            .await
            .map_err(|e| {
                self.telemetry.task_rejected();
                e
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SupervisorConfig, TelemetryConfig};

    #[tokio::test]
    async fn rejected_write_through_is_counted() {
        let telemetry = Arc::new(RuntimeTelemetry::new(&TelemetryConfig::default()));
        let service = ProfileService::new(
            Arc::new(MemoryProfileCache::new()),
            None,
            Arc::clone(&telemetry),
        );

        let supervisor = Supervisor::new(&SupervisorConfig::default());
        supervisor.shutdown().await;

        service
            .record(&supervisor, Profile::new(ActorId::new(), "steve"))
            .await;
        assert_eq!(telemetry.counter("tasks_rejected"), 1);
    }

    #[test]
    fn memory_cache_round_trips() {
        let cache = MemoryProfileCache::new();
        let id = ActorId::new();
        cache.put(Profile::new(id, "steve"));
        assert_eq!(cache.get(id).map(|p| p.name), Some("steve".to_string()));
        assert_eq!(cache.get(ActorId::new()), None);
    }
}
