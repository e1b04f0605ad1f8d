//! Messages and handlers of chordkv nodes.

pub mod handlers;
pub mod types;

pub use handlers::HandleMsg;
pub use handlers::MessageHandler;
pub use types::*;
