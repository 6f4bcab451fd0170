//! Built-in session handlers

mod entry;
mod exit;
mod game_mode;
mod teleport;

pub use entry::EntryHandler;
pub use exit::ExitHandler;
pub use game_mode::GameModeHandler;
pub use teleport::TeleportHandler;

use super::handler::Handler;

/// Factory producing a fresh handler instance for a new session
pub type HandlerFactory = fn() -> Box<dyn Handler>;

/// The default handler set attached to every session
pub fn default_factories() -> Vec<HandlerFactory> {
    vec![
        || Box::new(EntryHandler),
        || Box::new(ExitHandler),
        || Box::new(TeleportHandler),
        || Box::new(GameModeHandler::new()),
    ]
}
