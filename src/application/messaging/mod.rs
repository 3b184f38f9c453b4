//! Message handling - Command parsing and dispatch

pub mod dispatcher;
pub mod parser;

pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use parser::{CommandParser, ParsedCommand};
