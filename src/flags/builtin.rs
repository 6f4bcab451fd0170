//! The built-in flag set registered at bootstrap

use super::{Flag, FlagKind, FlagRegistry, State};
use crate::types::FlagRegistryError;
use std::sync::Arc;

/// Handles to the flags every subsystem consults
///
/// Kept as a plain struct on the runtime so handlers receive flag handles
/// instead of doing string lookups on the hot path.
#[derive(Clone)]
pub struct BuiltinFlags {
    pub entry: Arc<Flag>,
    pub exit: Arc<Flag>,
    pub send_chat: Arc<Flag>,
    pub receive_chat: Arc<Flag>,
    pub enderpearl: Arc<Flag>,
    pub chorus_teleport: Arc<Flag>,
    pub game_mode: Arc<Flag>,
    pub allowed_cmds: Arc<Flag>,
    pub blocked_cmds: Arc<Flag>,
    pub deny_message: Arc<Flag>,
    pub entry_deny_message: Arc<Flag>,
    pub exit_deny_message: Arc<Flag>,
}

/// Register the built-in flags and return their handles
pub fn register_builtins(registry: &FlagRegistry) -> Result<BuiltinFlags, FlagRegistryError> {
    let entry = registry.register(Flag::state("entry", State::Allow))?;
    let exit = registry.register(Flag::state("exit", State::Allow))?;
    let send_chat =
        registry.register(Flag::state("send-chat", State::Allow).member_overridable())?;
    let receive_chat = registry.register(Flag::state("receive-chat", State::Allow))?;
    let enderpearl = registry.register(Flag::state("enderpearl", State::Allow))?;
    let chorus_teleport = registry.register(
        Flag::state("chorus-teleport", State::Allow).with_fallback(&enderpearl),
    )?;
    let game_mode = registry.register(Flag::new("game-mode", FlagKind::GameMode))?;
    let allowed_cmds = registry.register(Flag::new("allowed-cmds", FlagKind::StringSet))?;
    let blocked_cmds = registry.register(Flag::new("blocked-cmds", FlagKind::StringSet))?;
    let deny_message = registry.register(Flag::new("deny-message", FlagKind::Text))?;
    let entry_deny_message = registry.register(
        Flag::new("entry-deny-message", FlagKind::Text).with_fallback(&deny_message),
    )?;
    let exit_deny_message = registry.register(
        Flag::new("exit-deny-message", FlagKind::Text).with_fallback(&deny_message),
    )?;

    tracing::debug!("Registered {} built-in flags", registry.count());

    Ok(BuiltinFlags {
        entry,
        exit,
        send_chat,
        receive_chat,
        enderpearl,
        chorus_teleport,
        game_mode,
        allowed_cmds,
        blocked_cmds,
        deny_message,
        entry_deny_message,
        exit_deny_message,
    })
}
