use std::env;

use anyhow::{Context, Result};

use super::{
    args::{Arguments, Command},
    commands::{drafts::drafts, init::init, sections::sections},
    exit_status::ExitStatus,
};
use crate::config::resolve_config;

/// Runs every command except `serve`, which `main` starts directly.
pub fn run_cli(args: Arguments) -> Result<ExitStatus> {
    let Arguments {
        command,
        connection,
        ..
    } = args;
    let cwd = env::current_dir().context("Failed to read current directory")?;

    match command {
        Some(Command::Init) => init(&cwd),
        Some(Command::Drafts(drafts_args)) => {
            let config = resolve_config(&cwd, connection.into())?;
            drafts(&config, drafts_args)
        }
        Some(Command::Sections) => {
            let config = resolve_config(&cwd, connection.into())?;
            sections(&config)
        }
        Some(Command::Serve) | None => {
            anyhow::bail!("serve is handled before run_cli()")
        }
    }
}
