//! Exit flag enforcement

use crate::session::handler::{Denial, Handler, HandlerContext, HandlerKind};
use crate::types::{Actor, Location, MoveType};
use std::any::Any;

/// Denies leaving regions whose `exit` flag resolves to deny
pub struct ExitHandler;

impl Handler for ExitHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Exit
    }

    fn test_move_to(
        &mut self,
        actor: &Actor,
        to: &Location,
        _move_type: MoveType,
        ctx: &HandlerContext<'_>,
    ) -> Option<Denial> {
        let from_set = ctx
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        if from_set.test_state(actor, &ctx.flags.exit) {
            return None;
        }

        let denier = from_set.find_denier(&ctx.flags.exit)?;

        // Blocked only when the denying region is actually being left
        let to_set = ctx.index.applicable_regions(&to.world, to.position);
        if to.world == actor.location.world && to_set.regions().iter().any(|r| r.id() == denier) {
            return None;
        }

        let message = from_set
            .query_value(actor, &ctx.flags.exit_deny_message)
            .and_then(|v| v.as_text().map(str::to_string));

        Some(Denial {
            flag: ctx.flags.exit.key().to_string(),
            region: Some(denier),
            message,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
