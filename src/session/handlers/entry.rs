//! Entry flag enforcement

use crate::session::handler::{Denial, Handler, HandlerContext, HandlerKind};
use crate::types::{Actor, Location, MoveType};
use std::any::Any;

/// Denies movement into regions whose `entry` flag resolves to deny
pub struct EntryHandler;

impl Handler for EntryHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Entry
    }

    fn test_move_to(
        &mut self,
        actor: &Actor,
        to: &Location,
        _move_type: MoveType,
        ctx: &HandlerContext<'_>,
    ) -> Option<Denial> {
        let to_set = ctx.index.applicable_regions(&to.world, to.position);
        if to_set.test_state(actor, &ctx.flags.entry) {
            return None;
        }

        let denier = to_set.find_denier(&ctx.flags.entry)?;

        // Only movement INTO the denying region is blocked; an actor
        // already inside may still move around within it.
        let from_set = ctx
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        if from_set.regions().iter().any(|r| r.id() == denier) {
            return None;
        }

        let message = to_set
            .query_value(actor, &ctx.flags.entry_deny_message)
            .and_then(|v| v.as_text().map(str::to_string));

        Some(Denial {
            flag: ctx.flags.entry.key().to_string(),
            region: Some(denier),
            message,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
