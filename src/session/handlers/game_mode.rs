//! Continuous game-mode enforcement
//!
//! Records the actor's original mode at session start and tracks the mode
//! last forced by a region's `game-mode` flag. An external mode change that
//! diverges from an active forced mode is vetoed outright, preventing a
//! mode escape.

use crate::session::handler::{Denial, Handler, HandlerContext, HandlerKind};
use crate::types::{Actor, GameMode, Location, MoveType};
use std::any::Any;

pub struct GameModeHandler {
    original: Option<GameMode>,
    set_by_region: Option<GameMode>,
}

impl GameModeHandler {
    pub fn new() -> Self {
        Self {
            original: None,
            set_by_region: None,
        }
    }

    /// The actor's game mode when the session was created
    pub fn original_game_mode(&self) -> Option<GameMode> {
        self.original
    }

    /// The mode last forced by region effect, if any is active
    pub fn forced_game_mode(&self) -> Option<GameMode> {
        self.set_by_region
    }

    fn update_forced(&mut self, actor: &Actor, location: &Location, ctx: &HandlerContext<'_>) {
        let set = ctx
            .index
            .applicable_regions(&location.world, location.position);
        self.set_by_region = set
            .query_value(actor, &ctx.flags.game_mode)
            .and_then(|v| v.as_game_mode());
    }
}

impl Default for GameModeHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for GameModeHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::GameMode
    }

    fn initialize(&mut self, actor: &Actor, ctx: &HandlerContext<'_>) {
        self.original = Some(actor.game_mode);
        let location = actor.location.clone();
        self.update_forced(actor, &location, ctx);
    }

    fn test_move_to(
        &mut self,
        actor: &Actor,
        to: &Location,
        _move_type: MoveType,
        ctx: &HandlerContext<'_>,
    ) -> Option<Denial> {
        // Movement never denies here; crossing a boundary just updates the
        // forced mode the dispatcher is expected to apply.
        self.update_forced(actor, to, ctx);
        None
    }

    fn on_game_mode_change(
        &mut self,
        actor: &Actor,
        new_mode: GameMode,
        _ctx: &HandlerContext<'_>,
    ) -> bool {
        if actor.bypass {
            return true;
        }
        match (self.original, self.set_by_region) {
            (Some(_), Some(expected)) if new_mode != expected => {
                tracing::info!(
                    "Vetoed game mode change for {}: region forces {}, change to {} rejected",
                    actor.name,
                    expected,
                    new_mode
                );
                false
            }
            _ => true,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
