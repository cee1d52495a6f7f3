//! Command-line layer: argument parsing, the non-serve commands and their
//! terminal output.

mod args;
pub mod commands;
mod exit_status;
mod report;
mod run;

pub use args::{Arguments, Command, ConnectionArgs, DraftsArgs};
pub use exit_status::ExitStatus;
pub use report::{FAILURE_MARK, SUCCESS_MARK};
pub use run::run_cli;
