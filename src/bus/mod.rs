pub mod events;
pub mod listener;

pub use events::{ConnectionStatus, InboundMessage, SessionNotification};
pub use listener::{BusListener, SessionListener};
