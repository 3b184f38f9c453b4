//! Platform adapters
//!
//! Real messaging protocols live outside this crate; the console adapter is
//! for local development.

pub mod console;

pub use console::ConsoleAdapter;
