//! Per-world region index with copy-on-write snapshots
//!
//! Queries clone an `Arc` of the world's region arena, so a query in
//! progress never observes a partially-updated region set even if a
//! mutation lands concurrently.

use super::{ApplicableRegionSet, ProtectedRegion, GLOBAL_REGION};
use crate::types::{Point, RegionError, WorldId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type RegionArena = HashMap<String, Arc<ProtectedRegion>>;

/// Spatial index over all protected regions, keyed by world
pub struct RegionIndex {
    worlds: DashMap<WorldId, Arc<RegionArena>>,
}

impl RegionIndex {
    pub fn new() -> Self {
        Self {
            worlds: DashMap::new(),
        }
    }

    /// Snapshot of a world's arena, creating the implicit global region on
    /// first touch
    fn arena(&self, world: &WorldId) -> Arc<RegionArena> {
        if let Some(arena) = self.worlds.get(world) {
            return Arc::clone(arena.value());
        }
        let entry = self.worlds.entry(world.clone()).or_insert_with(|| {
            let mut arena = RegionArena::new();
            arena.insert(
                GLOBAL_REGION.to_string(),
                Arc::new(ProtectedRegion::global()),
            );
            Arc::new(arena)
        });
        Arc::clone(entry.value())
    }

    /// Walk the parent chain of `region` within `arena`, rejecting cycles
    fn validate_parent_chain(
        arena: &RegionArena,
        region: &ProtectedRegion,
    ) -> Result<(), RegionError> {
        let mut seen = vec![region.id().to_string()];
        let mut current = region.parent().map(str::to_string);

        while let Some(parent_id) = current {
            if seen.contains(&parent_id) {
                return Err(RegionError::CyclicParent(region.id().to_string()));
            }
            let parent = arena
                .get(&parent_id)
                .ok_or_else(|| RegionError::UnknownParent(parent_id.clone()))?;
            seen.push(parent_id);
            current = parent.parent().map(str::to_string);
        }

        Ok(())
    }

    /// Add a region (or replace the region with the same id)
    ///
    /// The parent, if declared, must already exist in the world and the
    /// resulting chain must be acyclic.
    pub fn add_region(
        &self,
        world: &WorldId,
        region: ProtectedRegion,
    ) -> Result<(), RegionError> {
        let arena = self.arena(world);

        // Validate against the arena as it will look after insertion, so a
        // replacement cannot introduce a cycle through its old entry.
        let mut next: RegionArena = (*arena).clone();
        let id = region.id().to_string();
        let region = Arc::new(region);
        next.insert(id.clone(), Arc::clone(&region));
        Self::validate_parent_chain(&next, &region)?;

        self.worlds.insert(world.clone(), Arc::new(next));
        tracing::debug!("Added region '{}' to {}", id, world);
        Ok(())
    }

    /// Remove a region by id
    ///
    /// The implicit global region cannot be removed.
    pub fn remove_region(&self, world: &WorldId, id: &str) -> Result<(), RegionError> {
        if id == GLOBAL_REGION {
            return Err(RegionError::GlobalRegion);
        }
        let arena = self.arena(world);
        if !arena.contains_key(id) {
            return Err(RegionError::NoSuchRegion {
                world: world.clone(),
                id: id.to_string(),
            });
        }
        let mut next: RegionArena = (*arena).clone();
        next.remove(id);
        self.worlds.insert(world.clone(), Arc::new(next));
        tracing::debug!("Removed region '{}' from {}", id, world);
        Ok(())
    }

    /// Re-parent an existing region, validating the new chain
    pub fn set_parent(
        &self,
        world: &WorldId,
        id: &str,
        parent: Option<&str>,
    ) -> Result<(), RegionError> {
        if id == GLOBAL_REGION {
            return Err(RegionError::GlobalRegion);
        }
        let arena = self.arena(world);
        let existing = arena.get(id).ok_or_else(|| RegionError::NoSuchRegion {
            world: world.clone(),
            id: id.to_string(),
        })?;

        let mut updated = (**existing).clone();
        updated.parent = parent.map(str::to_string);
        self.add_region(world, updated)
    }

    pub fn get(&self, world: &WorldId, id: &str) -> Option<Arc<ProtectedRegion>> {
        self.arena(world).get(id).map(Arc::clone)
    }

    /// Number of regions in a world, excluding the implicit global region
    pub fn count(&self, world: &WorldId) -> usize {
        self.arena(world).len() - 1
    }

    /// Every region whose bounds contain `point`
    ///
    /// Always includes the implicit global region, so the returned set can
    /// answer flag queries even in an otherwise empty world. The result is
    /// transient and must not be cached across index mutations.
    pub fn applicable_regions(&self, world: &WorldId, point: Point) -> ApplicableRegionSet {
        let arena = self.arena(world);
        let mut regions: Vec<Arc<ProtectedRegion>> = arena
            .values()
            .filter(|r| r.contains(point))
            .map(Arc::clone)
            .collect();

        // Descending priority; id as a stable tie-break so resolution is
        // deterministic across queries.
        regions.sort_by(|a, b| {
            b.priority()
                .cmp(&a.priority())
                .then_with(|| a.id().cmp(b.id()))
        });

        ApplicableRegionSet::new(regions, arena)
    }
}

impl Default for RegionIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regions::Bounds;

    fn world() -> WorldId {
        WorldId::new("overworld")
    }

    fn cuboid(min: f64, max: f64) -> Bounds {
        Bounds::Cuboid {
            min: Point::new(min, min, min),
            max: Point::new(max, max, max),
        }
    }

    #[test]
    fn query_returns_containing_regions_plus_global() {
        let index = RegionIndex::new();
        index
            .add_region(&world(), ProtectedRegion::new("inner", cuboid(0.0, 10.0)))
            .unwrap();
        index
            .add_region(&world(), ProtectedRegion::new("far", cuboid(100.0, 110.0)))
            .unwrap();

        let set = index.applicable_regions(&world(), Point::new(5.0, 5.0, 5.0));
        let ids: Vec<&str> = set.regions().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["inner", GLOBAL_REGION]);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let index = RegionIndex::new();
        let region = ProtectedRegion::new("child", cuboid(0.0, 1.0)).with_parent("ghost");
        let err = index.add_region(&world(), region);
        assert!(matches!(err, Err(RegionError::UnknownParent(p)) if p == "ghost"));
    }

    #[test]
    fn parent_cycle_is_rejected() {
        let index = RegionIndex::new();
        index
            .add_region(&world(), ProtectedRegion::new("a", cuboid(0.0, 1.0)))
            .unwrap();
        index
            .add_region(
                &world(),
                ProtectedRegion::new("b", cuboid(0.0, 1.0)).with_parent("a"),
            )
            .unwrap();

        // a -> b would close the loop a -> b -> a
        let err = index.set_parent(&world(), "a", Some("b"));
        assert!(matches!(err, Err(RegionError::CyclicParent(id)) if id == "a"));

        // Self-parenting is the degenerate cycle
        let err = index.set_parent(&world(), "a", Some("a"));
        assert!(matches!(err, Err(RegionError::CyclicParent(_))));
    }

    #[test]
    fn snapshots_survive_mutation() {
        let index = RegionIndex::new();
        index
            .add_region(&world(), ProtectedRegion::new("inner", cuboid(0.0, 10.0)))
            .unwrap();

        let set = index.applicable_regions(&world(), Point::new(5.0, 5.0, 5.0));
        index.remove_region(&world(), "inner").unwrap();

        // The snapshot taken before the removal still sees the region
        assert!(set.regions().iter().any(|r| r.id() == "inner"));
        let fresh = index.applicable_regions(&world(), Point::new(5.0, 5.0, 5.0));
        assert!(!fresh.regions().iter().any(|r| r.id() == "inner"));
    }

    #[test]
    fn global_region_is_protected() {
        let index = RegionIndex::new();
        assert!(matches!(
            index.remove_region(&world(), GLOBAL_REGION),
            Err(RegionError::GlobalRegion)
        ));
    }
}
