//! Spatial and movement types

use super::ids::WorldId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in world space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// A position within a specific world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub world: WorldId,
    pub position: Point,
}

impl Location {
    pub fn new(world: impl Into<WorldId>, position: Point) -> Self {
        Self {
            world: world.into(),
            position,
        }
    }
}

/// Player game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GameMode::Survival => "survival",
            GameMode::Creative => "creative",
            GameMode::Adventure => "adventure",
            GameMode::Spectator => "spectator",
        };
        write!(f, "{}", name)
    }
}

/// Cause category for a positional change
///
/// Different region flags gate different causes: an ender pearl throw is
/// checked against a different flag than ordinary walking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveType {
    Walk,
    Teleport,
    EnderPearl,
    ChorusFruit,
    Respawn,
}

impl MoveType {
    /// Whether this cause is a discontinuous jump rather than contiguous movement
    pub fn is_teleport(&self) -> bool {
        matches!(
            self,
            MoveType::Teleport | MoveType::EnderPearl | MoveType::ChorusFruit | MoveType::Respawn
        )
    }
}

/// Whether an actor is a player or some other entity
///
/// Replaces exception-based type narrowing: callers match on the kind
/// instead of downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActorKind {
    Player,
    NonPlayer,
}

/// Snapshot of an actor as delivered by the hosting dispatcher
///
/// The `bypass` capability is resolved by the external bypass provider
/// before the snapshot enters the decision path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: super::ActorId,
    pub name: String,
    pub kind: ActorKind,
    pub location: Location,
    pub game_mode: GameMode,
    pub bypass: bool,
}

impl Actor {
    pub fn is_player(&self) -> bool {
        self.kind == ActorKind::Player
    }
}
