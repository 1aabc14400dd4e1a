//! voxfill CLI - argument parsing, prompts and terminal output for the
//! `voxfill` binary.

pub mod config;
pub mod console;
pub mod prompt;
pub mod render;

pub use config::{Command, Config, ConfigCommand, FetchArgs};
pub use console::Console;
pub use prompt::{FixedPrompt, LineSource, TerminalPrompt};
