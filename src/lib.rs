#![warn(clippy::pedantic)]
// Noisy doc/signature lints: would require annotating every pub function
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
// Style preference: keeping format!("{}", x) over format!("{x}") for readability with complex exprs
#![allow(clippy::uninlined_format_args)]
// Engine timestamps arrive as loosely typed numbers
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]

pub mod bus;
pub mod config;
pub mod errors;
pub mod jid;
pub mod media;
pub mod normalizer;
pub mod reconnect;
pub mod session;
pub mod transport;
pub(crate) mod utils;

pub use bus::{ConnectionStatus, InboundMessage, SessionListener};
pub use errors::BridgeError;
pub use session::{ConnectionState, SessionManager};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
