use anyhow::Result;

use super::super::args::DraftsArgs;
use super::super::exit_status::ExitStatus;
use super::super::report::print_drafts;
use super::connect;
use crate::config::Config;

pub fn drafts(config: &Config, args: DraftsArgs) -> Result<ExitStatus> {
    let conn = connect(config)?;
    let drafts = conn
        .runtime
        .block_on(conn.api.get_drafts_limited(args.query.as_deref(), args.limit))?;

    print_drafts(&drafts);
    Ok(ExitStatus::Success)
}
