//! Protected region model
//!
//! A region is a named, prioritized, spatially-bounded rule container with
//! flag overrides. Parents are weak references by id; the index validates
//! the chain stays acyclic when regions are inserted or re-parented.

mod applicable;
mod index;

pub use applicable::ApplicableRegionSet;
pub use index::RegionIndex;

use crate::flags::{Flag, FlagValue};
use crate::types::{ActorId, Point, RegionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Id of the implicit global region present in every world
pub const GLOBAL_REGION: &str = "__global__";

/// Spatial predicate of a region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Bounds {
    /// Axis-aligned cuboid, inclusive on both corners
    Cuboid { min: Point, max: Point },
    /// Contains every point in the world
    Global,
}

impl Bounds {
    pub fn contains(&self, point: Point) -> bool {
        match self {
            Bounds::Cuboid { min, max } => {
                point.x >= min.x
                    && point.x <= max.x
                    && point.y >= min.y
                    && point.y <= max.y
                    && point.z >= min.z
                    && point.z <= max.z
            }
            Bounds::Global => true,
        }
    }
}

/// An actor's relationship to a region or region set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Association {
    NonMember,
    Member,
    Owner,
}

/// A prioritized spatial rule object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtectedRegion {
    id: String,
    priority: i32,
    parent: Option<String>,
    bounds: Bounds,
    flags: HashMap<String, FlagValue>,
    owners: HashSet<ActorId>,
    members: HashSet<ActorId>,
    created_at: DateTime<Utc>,
}

impl ProtectedRegion {
    pub fn new(id: impl Into<String>, bounds: Bounds) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            parent: None,
            bounds,
            flags: HashMap::new(),
            owners: HashSet::new(),
            members: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// The implicit world-spanning region at minimum priority
    pub(crate) fn global() -> Self {
        let mut region = Self::new(GLOBAL_REGION, Bounds::Global);
        region.priority = i32::MIN;
        region
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Declare the parent region by id
    ///
    /// Cycle validation happens when the region enters the index, where
    /// the full arena is visible.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set a flag override, kind-checked against the flag descriptor
    pub fn set_flag(&mut self, flag: &Flag, value: FlagValue) -> Result<(), RegionError> {
        if value.kind() != flag.kind() {
            return Err(RegionError::ValueKind {
                flag: flag.key().to_string(),
                expected: flag.kind(),
                actual: value.kind(),
            });
        }
        self.flags.insert(flag.key().to_string(), value);
        Ok(())
    }

    pub fn clear_flag(&mut self, flag: &Flag) {
        self.flags.remove(flag.key());
    }

    pub fn add_owner(&mut self, actor: ActorId) {
        self.owners.insert(actor);
    }

    pub fn add_member(&mut self, actor: ActorId) {
        self.members.insert(actor);
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    pub fn contains(&self, point: Point) -> bool {
        self.bounds.contains(point)
    }

    /// The region's own override for a flag key, ignoring parents
    pub fn flag(&self, key: &str) -> Option<&FlagValue> {
        self.flags.get(key)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// This region's association with an actor, ignoring parents
    pub fn association(&self, actor: ActorId) -> Association {
        if self.owners.contains(&actor) {
            Association::Owner
        } else if self.members.contains(&actor) {
            Association::Member
        } else {
            Association::NonMember
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::{Flag, FlagKind, State};

    #[test]
    fn cuboid_containment_is_inclusive() {
        let bounds = Bounds::Cuboid {
            min: Point::new(0.0, 0.0, 0.0),
            max: Point::new(10.0, 10.0, 10.0),
        };
        assert!(bounds.contains(Point::new(0.0, 0.0, 0.0)));
        assert!(bounds.contains(Point::new(10.0, 10.0, 10.0)));
        assert!(!bounds.contains(Point::new(10.1, 5.0, 5.0)));
    }

    #[test]
    fn flag_values_are_kind_checked() {
        let flag = Flag::new("game-mode", FlagKind::GameMode);
        let mut region = ProtectedRegion::new("spawn", Bounds::Global);
        let err = region.set_flag(&flag, FlagValue::State(State::Deny));
        assert!(matches!(err, Err(RegionError::ValueKind { .. })));
    }

    #[test]
    fn association_prefers_ownership() {
        let actor = ActorId::new();
        let mut region = ProtectedRegion::new("town", Bounds::Global);
        region.add_member(actor);
        assert_eq!(region.association(actor), Association::Member);
        region.add_owner(actor);
        assert_eq!(region.association(actor), Association::Owner);
    }
}
