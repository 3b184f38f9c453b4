//! Domain entities - Core business objects

pub mod message;
pub mod command;

pub use message::{InboundMessage, QuotedMessage};
pub use command::{
    handler_fn, reply_fn, CommandArgs, CommandDescriptor, CommandHandler, FnHandler, ReplyFn,
    DEFAULT_TAG,
};
