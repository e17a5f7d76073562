//! Text command framework: argument cursor, transformers, command trait and dispatcher.

pub mod args;
pub mod command;
pub mod dispatcher;
pub mod transformer;

pub use args::Args;
pub use command::{Command, Group, Requirements, UserError};
pub use dispatcher::Dispatcher;
