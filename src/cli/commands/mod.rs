pub mod drafts;
pub mod init;
pub mod sections;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;

use crate::api::SubstackApi;
use crate::config::Config;

/// A logged-in client plus the runtime to drive it from synchronous code.
pub(crate) struct Connection {
    pub runtime: Runtime,
    pub api: SubstackApi,
}

pub(crate) fn connect(config: &Config) -> Result<Connection> {
    let api = SubstackApi::new(config.api_config()?)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(api.ensure_authenticated())?;
    Ok(Connection { runtime, api })
}
