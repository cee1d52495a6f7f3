use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use substack_mcp::cli::{Arguments, ExitStatus, FAILURE_MARK};
use substack_mcp::config::resolve_config;

fn main() -> ExitCode {
    let args = Arguments::parse();
    let serving = args.is_serve();
    substack_mcp::logging::init(args.verbose, !serving);

    let result = if serving {
        std::env::current_dir()
            .map_err(anyhow::Error::from)
            .and_then(|cwd| resolve_config(&cwd, args.connection.into()))
            .and_then(substack_mcp::mcp::run_server)
            .map(|()| ExitStatus::Success)
    } else {
        substack_mcp::cli::run_cli(args)
    };

    match result {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("{} Error: {:#}", FAILURE_MARK.red(), err);
            ExitStatus::Error.into()
        }
    }
}
