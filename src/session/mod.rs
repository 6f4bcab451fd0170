//! Per-actor continuous enforcement state
//!
//! The session engine owns one [`Session`] per connected player actor.
//! Sessions own their handlers; the manager routes dispatcher events to
//! every handler declaring interest in the trigger kind. A faulting
//! handler never crashes the dispatch path and never denies by fault.

mod handler;
mod handlers;

pub use handler::{Denial, Handler, HandlerContext, HandlerKind};
pub use handlers::{
    default_factories, EntryHandler, ExitHandler, GameModeHandler, HandlerFactory,
    TeleportHandler,
};

use crate::config::SessionConfig;
use crate::filter::CommandFilter;
use crate::flags::BuiltinFlags;
use crate::regions::RegionIndex;
use crate::telemetry::RuntimeTelemetry;
use crate::types::{Actor, ActorId, GameMode, Location, MoveType, SessionError, WorldId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// External capability check: does this actor bypass all region checks in
/// this world?
pub trait BypassProvider: Send + Sync {
    fn has_bypass(&self, actor: ActorId, world: &WorldId) -> bool;
}

/// Provider granting bypass to nobody; the default collaborator
pub struct NoBypass;

impl BypassProvider for NoBypass {
    fn has_bypass(&self, _actor: ActorId, _world: &WorldId) -> bool {
        false
    }
}

/// Per-actor state container owning handler instances
pub struct Session {
    actor_id: ActorId,
    handlers: Mutex<Vec<Box<dyn Handler>>>,
    destroyed: AtomicBool,
    created_at: DateTime<Utc>,
}

impl Session {
    fn new(actor_id: ActorId, factories: &[HandlerFactory]) -> Self {
        Self {
            actor_id,
            handlers: Mutex::new(factories.iter().map(|f| f()).collect()),
            destroyed: AtomicBool::new(false),
            created_at: Utc::now(),
        }
    }

    pub fn actor_id(&self) -> ActorId {
        self.actor_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    /// Inspect a handler's concrete state by capability tag
    pub fn inspect<T: 'static, R>(
        &self,
        kind: HandlerKind,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        let handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers
            .iter()
            .find(|h| h.kind() == kind)
            .and_then(|h| h.as_any().downcast_ref::<T>())
            .map(f)
    }

    /// Ask handlers in registration order for a denial, stopping at the
    /// first one
    ///
    /// Handlers after the denying one are not consulted, so their state
    /// never advances for a movement that will be reverted.
    fn first_denial(
        &self,
        telemetry: &RuntimeTelemetry,
        mut call: impl FnMut(&mut Box<dyn Handler>) -> Option<Denial>,
    ) -> Option<Denial> {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        for handler in handlers.iter_mut() {
            let kind = handler.kind();
            match catch_unwind(AssertUnwindSafe(|| call(handler))) {
                Ok(Some(denial)) => return Some(denial),
                Ok(None) => {}
                Err(_) => telemetry.handler_fault(&format!("{:?}", kind)),
            }
        }
        None
    }

    /// Run `call` against every handler, recovering from panics
    ///
    /// A faulting handler's vote becomes `None`; dispatch continues with
    /// the remaining handlers.
    fn dispatch<R>(
        &self,
        telemetry: &RuntimeTelemetry,
        mut call: impl FnMut(&mut Box<dyn Handler>) -> R,
    ) -> Vec<Option<R>> {
        let mut handlers = self.handlers.lock().unwrap_or_else(|e| e.into_inner());
        handlers
            .iter_mut()
            .map(|handler| {
                let kind = handler.kind();
                match catch_unwind(AssertUnwindSafe(|| call(handler))) {
                    Ok(result) => Some(result),
                    Err(_) => {
                        telemetry.handler_fault(&format!("{:?}", kind));
                        None
                    }
                }
            })
            .collect()
    }
}

/// Creates, tracks and destroys sessions; routes triggers to handlers
pub struct SessionManager {
    sessions: DashMap<ActorId, Arc<Session>>,
    factories: Vec<HandlerFactory>,
    index: Arc<RegionIndex>,
    flags: BuiltinFlags,
    bypass: Arc<dyn BypassProvider>,
    config: SessionConfig,
    telemetry: Arc<RuntimeTelemetry>,
}

impl SessionManager {
    pub fn new(
        config: &SessionConfig,
        index: Arc<RegionIndex>,
        flags: BuiltinFlags,
        bypass: Arc<dyn BypassProvider>,
        telemetry: Arc<RuntimeTelemetry>,
        factories: Vec<HandlerFactory>,
    ) -> Self {
        Self {
            sessions: DashMap::new(),
            factories,
            index,
            flags,
            bypass,
            config: config.clone(),
            telemetry,
        }
    }

    fn context(&self) -> HandlerContext<'_> {
        HandlerContext {
            index: &self.index,
            flags: &self.flags,
            config: &self.config,
        }
    }

    /// Whether the external provider grants region bypass
    pub fn has_bypass(&self, actor: ActorId, world: &WorldId) -> bool {
        self.bypass.has_bypass(actor, world)
    }

    /// The session for an actor, created and initialized on first reference
    ///
    /// Non-player actors never get sessions.
    pub fn get_or_create(&self, actor: &Actor) -> Result<Arc<Session>, SessionError> {
        if !actor.is_player() {
            return Err(SessionError::NotAPlayer(actor.id));
        }
        if let Some(existing) = self.sessions.get(&actor.id) {
            return Ok(Arc::clone(existing.value()));
        }

        let session = Arc::new(Session::new(actor.id, &self.factories));
        let ctx = self.context();
        session.dispatch(&self.telemetry, |h| h.initialize(actor, &ctx));
        self.sessions.insert(actor.id, Arc::clone(&session));
        self.telemetry.session_created(&actor.name);
        Ok(session)
    }

    pub fn get_if_present(&self, actor: ActorId) -> Option<Arc<Session>> {
        self.sessions.get(&actor).map(|s| Arc::clone(s.value()))
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Connect trigger: create and initialize the session
    pub fn handle_join(&self, actor: &Actor) -> Result<Arc<Session>, SessionError> {
        self.get_or_create(actor)
    }

    /// Disconnect trigger: destroy the session and release its handlers
    pub fn handle_disconnect(&self, actor: ActorId) {
        if let Some((_, session)) = self.sessions.remove(&actor) {
            session.destroy();
            self.telemetry.session_destroyed(&actor.to_string());
        }
    }

    /// Validate a positional change
    ///
    /// Invoked on every move, teleport and respawn. Handlers vote in
    /// registration order; the first denial short-circuits and must cause
    /// the caller to revert or cancel the movement.
    pub fn test_move_to(
        &self,
        actor: &Actor,
        to: &Location,
        move_type: MoveType,
    ) -> Option<Denial> {
        if !self.config.use_regions {
            return None;
        }
        let session = self.get_or_create(actor).ok()?;
        if session.is_destroyed() {
            return None;
        }

        let ctx = self.context();
        let denial = session.first_denial(&self.telemetry, |h| {
            h.test_move_to(actor, to, move_type, &ctx)
        });

        if let Some(denial) = &denial {
            self.telemetry.action_denied(&denial.flag);
        }
        denial
    }

    /// Route an externally reported game-mode change; false vetoes it
    pub fn handle_game_mode_change(&self, actor: &Actor, new_mode: GameMode) -> bool {
        if !self.config.use_regions {
            return true;
        }
        let Some(session) = self.get_if_present(actor.id) else {
            return true;
        };
        if session.is_destroyed() {
            return true;
        }

        let ctx = self.context();
        let allowed = session
            .dispatch(&self.telemetry, |h| {
                h.on_game_mode_change(actor, new_mode, &ctx)
            })
            .into_iter()
            // A faulted handler has no opinion and does not veto
            .all(|vote| vote.unwrap_or(true));

        if !allowed {
            self.telemetry.action_denied(self.flags.game_mode.key());
        }
        allowed
    }

    /// Validate a chat send at the actor's current location
    pub fn test_send_chat(&self, actor: &Actor) -> Option<Denial> {
        if !self.config.use_regions {
            return None;
        }
        let set = self
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        if set.test_state(actor, &self.flags.send_chat) {
            return None;
        }
        let message = set
            .query_value(actor, &self.flags.deny_message)
            .and_then(|v| v.as_text().map(str::to_string));
        let denial = Denial {
            flag: self.flags.send_chat.key().to_string(),
            region: set.find_denier(&self.flags.send_chat),
            message,
        };
        self.telemetry.action_denied(&denial.flag);
        Some(denial)
    }

    /// Whether the actor may receive chat at their current location
    ///
    /// Used to filter chat recipients; removal is silent, so this returns
    /// a plain bool instead of a denial.
    pub fn test_receive_chat(&self, actor: &Actor) -> bool {
        if !self.config.use_regions {
            return true;
        }
        let set = self
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        set.test_state(actor, &self.flags.receive_chat)
    }

    /// Command filter for the actor's current region set
    ///
    /// Bypassing actors get a filter that permits everything.
    pub fn command_filter(&self, actor: &Actor) -> CommandFilter {
        if !self.config.use_regions || actor.bypass {
            return CommandFilter::new(None, None);
        }
        let set = self
            .index
            .applicable_regions(&actor.location.world, actor.location.position);
        let allowed = set.query_value(actor, &self.flags.allowed_cmds);
        let blocked = set.query_value(actor, &self.flags.blocked_cmds);
        CommandFilter::new(
            allowed.as_ref().and_then(|v| v.as_string_set()),
            blocked.as_ref().and_then(|v| v.as_string_set()),
        )
    }
}
