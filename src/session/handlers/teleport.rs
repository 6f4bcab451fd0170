//! Teleport-cause gating
//!
//! Different teleport causes are gated by different flags: ender pearls by
//! `enderpearl`, chorus fruit by `chorus-teleport` (which falls back to
//! `enderpearl` when unset). Both ends are checked: the origin set first,
//! then the destination set.

use crate::session::handler::{Denial, Handler, HandlerContext, HandlerKind};
use crate::types::{Actor, Location, MoveType};
use std::any::Any;

/// Gates teleport-cause movement on the destination's teleport flags
pub struct TeleportHandler;

impl Handler for TeleportHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Teleport
    }

    fn test_move_to(
        &mut self,
        actor: &Actor,
        to: &Location,
        move_type: MoveType,
        ctx: &HandlerContext<'_>,
    ) -> Option<Denial> {
        let flag = match move_type {
            MoveType::EnderPearl => &ctx.flags.enderpearl,
            MoveType::ChorusFruit => &ctx.flags.chorus_teleport,
            _ => return None,
        };

        // Pearling out of a deny region is blocked just like pearling in
        let from_set = ctx
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        if !from_set.test_state(actor, flag) {
            let message = from_set
                .query_value(actor, &ctx.flags.exit_deny_message)
                .and_then(|v| v.as_text().map(str::to_string));
            return Some(Denial {
                flag: flag.key().to_string(),
                region: from_set.find_denier(flag),
                message,
            });
        }

        let to_set = ctx.index.applicable_regions(&to.world, to.position);
        if to_set.test_state(actor, flag) {
            return None;
        }

        let message = to_set
            .query_value(actor, &ctx.flags.exit_deny_message)
            .and_then(|v| v.as_text().map(str::to_string));

        Some(Denial {
            flag: flag.key().to_string(),
            region: to_set.find_denier(flag),
            message,
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
