//! CLI commands module.

mod config;
mod info;
mod util;
mod voice;

pub use config::ConfigCommand;
pub use info::InfoCommand;
pub use voice::{ListCommand, ResolveCommand, SpeakCommand, SupportCommand};

// Re-export utils for use in commands
pub(crate) use util::*;
