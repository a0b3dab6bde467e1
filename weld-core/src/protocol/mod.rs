//! Line-oriented ASCII command protocol.

pub mod catalog;
pub mod commands;
pub mod grammar;
pub mod reply;
pub mod status;

pub use commands::{CommandTarget, Outcome, ProtocolError, execute, execute_line};
pub use reply::{Ack, Event, MAX_REPLY_LEN, OutboundLine, Reply};
pub use status::{StatusFormatter, StatusSnapshot};
