//! Wiring and terminal front end for the `blogdesk` binary.

pub mod app;
pub mod config;
pub mod terminal;

pub use app::{App, EntryInput};
pub use config::AppConfig;
pub use terminal::TerminalUi;
