use anyhow::Result;

use super::super::exit_status::ExitStatus;
use super::super::report::print_sections;
use super::connect;
use crate::config::Config;

pub fn sections(config: &Config) -> Result<ExitStatus> {
    let conn = connect(config)?;
    let sections = conn.runtime.block_on(conn.api.get_sections())?;

    print_sections(&sections);
    Ok(ExitStatus::Success)
}
