//! Flag resolution across an overlapping, prioritized region set
//!
//! Evaluation order is load-bearing: bypass short-circuits before any
//! region data is touched, membership exemption is checked next, and only
//! then are flag values resolved through priority groups and parent chains.

use super::index::RegionArena;
use super::{Association, ProtectedRegion};
use crate::flags::{Flag, FlagValue, State};
use crate::types::Actor;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// The resolved set of regions covering a point
///
/// Transient: rebuilt per query, never cached across index mutations. The
/// region list is ordered by descending priority (region id as tie-break)
/// and the arena snapshot backs parent-chain walks.
pub struct ApplicableRegionSet {
    regions: Vec<Arc<ProtectedRegion>>,
    arena: Arc<RegionArena>,
    lookups: AtomicUsize,
}

impl ApplicableRegionSet {
    pub(crate) fn new(regions: Vec<Arc<ProtectedRegion>>, arena: Arc<RegionArena>) -> Self {
        Self {
            regions,
            arena,
            lookups: AtomicUsize::new(0),
        }
    }

    /// Regions in the set, descending priority
    pub fn regions(&self) -> &[Arc<ProtectedRegion>] {
        &self.regions
    }

    /// Diagnostic count of region data reads performed by queries on this
    /// set; queries for bypassing actors perform none
    pub fn region_lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }

    /// The actor's strongest association with any region in the set,
    /// inherited through parent chains
    pub fn association(&self, actor: crate::types::ActorId) -> Association {
        let mut strongest = Association::NonMember;
        for region in &self.regions {
            let mut visited: HashSet<String> = HashSet::new();
            let mut current = Arc::clone(region);
            loop {
                if !visited.insert(current.id().to_string()) {
                    break;
                }
                self.lookups.fetch_add(1, Ordering::Relaxed);
                strongest = strongest.max(current.association(actor));
                match current.parent().and_then(|p| self.arena.get(p)) {
                    Some(parent) => current = Arc::clone(parent),
                    None => break,
                }
            }
            if strongest == Association::Owner {
                break;
            }
        }
        strongest
    }

    /// Test a state flag: true unless explicitly denied
    ///
    /// Bypass short-circuits before any region lookup. Membership-scoped
    /// flags permit owners and members regardless of the resolved value.
    pub fn test_state(&self, actor: &Actor, flag: &Flag) -> bool {
        if actor.bypass {
            return true;
        }
        if flag.is_member_overridable() && self.association(actor.id) >= Association::Member {
            return true;
        }

        let resolved = self
            .resolve_with_fallback(flag)
            .or_else(|| flag.default().cloned());

        !matches!(resolved.and_then(|v| v.as_state()), Some(State::Deny))
    }

    /// Effective value of a flag, or None if unset anywhere in scope
    ///
    /// Callers must treat None as the flag's own default. For bypassing
    /// actors this returns None without consulting region data.
    pub fn query_value(&self, actor: &Actor, flag: &Flag) -> Option<FlagValue> {
        if actor.bypass {
            return None;
        }
        self.resolve_with_fallback(flag)
    }

    /// The highest-priority region contributing an explicit deny for a
    /// state flag (directly or through its parent chain), for denial
    /// attribution
    pub fn find_denier(&self, flag: &Flag) -> Option<String> {
        let mut visited: Vec<&str> = Vec::new();
        let mut current = Some(flag);
        while let Some(f) = current {
            if visited.contains(&f.key()) {
                break;
            }
            visited.push(f.key());
            for region in &self.regions {
                if let Some(FlagValue::State(State::Deny)) = self.effective_value(region, f.key())
                {
                    return Some(region.id().to_string());
                }
            }
            current = f.fallback();
        }
        None
    }

    /// Resolve a flag, consulting its fallback chain when unset
    fn resolve_with_fallback(&self, flag: &Flag) -> Option<FlagValue> {
        let mut visited: Vec<&str> = Vec::new();
        let mut current = Some(flag);
        while let Some(f) = current {
            if visited.contains(&f.key()) {
                break;
            }
            visited.push(f.key());
            if let Some(value) = self.resolve(f.key()) {
                return Some(value);
            }
            current = f.fallback();
        }
        None
    }

    /// Priority-group resolution for a single flag key
    ///
    /// Walks groups of equal priority from the top. Within the first group
    /// where any region yields a value (directly or through its parent
    /// chain), state values combine with deny-wins; other kinds take the
    /// value from the lowest region id. Lower groups are never consulted.
    fn resolve(&self, key: &str) -> Option<FlagValue> {
        let mut i = 0;
        while i < self.regions.len() {
            let priority = self.regions[i].priority();
            let mut combined: Option<FlagValue> = None;

            while i < self.regions.len() && self.regions[i].priority() == priority {
                if let Some(value) = self.effective_value(&self.regions[i], key) {
                    combined = Some(match (combined, value) {
                        (None, v) => v,
                        (Some(FlagValue::State(a)), FlagValue::State(b)) => {
                            FlagValue::State(a.combine(b))
                        }
                        // Deterministic: the set is id-ordered within a group
                        (Some(existing), _) => existing,
                    });
                }
                i += 1;
            }

            if combined.is_some() {
                return combined;
            }
        }
        None
    }

    /// A region's own value or the nearest ancestor's
    ///
    /// Iterative arena walk with a visited-set guard; a cycle that slipped
    /// past construction-time validation is logged and treated as unset.
    fn effective_value(&self, region: &Arc<ProtectedRegion>, key: &str) -> Option<FlagValue> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut current = Arc::clone(region);
        loop {
            if !visited.insert(current.id().to_string()) {
                tracing::warn!(
                    "Parent chain cycle detected at region '{}'; treating flag '{}' as unset",
                    current.id(),
                    key
                );
                return None;
            }
            self.lookups.fetch_add(1, Ordering::Relaxed);
            if let Some(value) = current.flag(key) {
                return Some(value.clone());
            }
            match current.parent().and_then(|p| self.arena.get(p)) {
                Some(parent) => current = Arc::clone(parent),
                None => return None,
            }
        }
    }
}
