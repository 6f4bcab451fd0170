//! Handler capability model
//!
//! Handlers are registered per capability tag and routed by trigger kind,
//! so call sites never downcast to concrete handler types.

use crate::config::SessionConfig;
use crate::flags::BuiltinFlags;
use crate::regions::RegionIndex;
use crate::types::{Actor, GameMode, Location, MoveType};
use std::any::Any;

/// Capability tag identifying a handler within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Entry,
    Exit,
    Teleport,
    GameMode,
    Custom(&'static str),
}

/// Everything a handler may consult while evaluating a trigger
///
/// Passed explicitly; handlers hold no references to runtime state.
pub struct HandlerContext<'a> {
    pub index: &'a RegionIndex,
    pub flags: &'a BuiltinFlags,
    pub config: &'a SessionConfig,
}

/// A denial returned from the decision path
///
/// `message` carries configured flag-derived text for the external message
/// formatter; `None` means silent denial - the action simply does not occur.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub flag: String,
    pub region: Option<String>,
    pub message: Option<String>,
}

/// A pluggable unit reacting to discrete triggers within a session
///
/// Handlers are stateful and owned by their session. A handler that
/// panics during evaluation is treated as having no opinion; it never
/// denies by fault.
pub trait Handler: Send {
    fn kind(&self) -> HandlerKind;

    /// Called once when the session is created, with the actor's join
    /// world context
    fn initialize(&mut self, actor: &Actor, ctx: &HandlerContext<'_>) {
        let _ = (actor, ctx);
    }

    /// Vote on a positional change; the first denial across the session's
    /// handlers short-circuits
    fn test_move_to(
        &mut self,
        actor: &Actor,
        to: &Location,
        move_type: MoveType,
        ctx: &HandlerContext<'_>,
    ) -> Option<Denial> {
        let _ = (actor, to, move_type, ctx);
        None
    }

    /// Vote on an externally reported game-mode change; false vetoes the
    /// event
    fn on_game_mode_change(
        &mut self,
        actor: &Actor,
        new_mode: GameMode,
        ctx: &HandlerContext<'_>,
    ) -> bool {
        let _ = (actor, new_mode, ctx);
        true
    }

    /// Concrete-type access for state inspection (never used on the
    /// dispatch path)
    fn as_any(&self) -> &dyn Any;
}
