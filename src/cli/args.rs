//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `serve`: Start the MCP server on stdio (default)
//! - `init`: Write a `.substackrc.json` template
//! - `drafts`: List drafts of the publication
//! - `sections`: List sections of the publication

use clap::{Args, Parser, Subcommand};

use crate::config::ConfigOverrides;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Arguments {
    /// True when the MCP server should run, which is also the default.
    pub fn is_serve(&self) -> bool {
        matches!(self.command, None | Some(Command::Serve))
    }
}

/// Connection settings. Each one overrides the matching config file value.
#[derive(Debug, Clone, Default, Args)]
pub struct ConnectionArgs {
    /// Publication root, e.g. https://example.substack.com
    #[arg(long, env = "SUBSTACK_PUBLICATION_URL", global = true)]
    pub publication_url: Option<String>,

    /// Substack API root
    #[arg(long, env = "SUBSTACK_BASE_URL", global = true, hide = true)]
    pub base_url: Option<String>,

    /// Author id used in draft bylines
    #[arg(long, env = "SUBSTACK_USER_ID", global = true)]
    pub user_id: Option<u64>,

    /// Value of the substack.sid cookie
    #[arg(long, env = "SUBSTACK_SID", global = true, hide_env_values = true)]
    pub sid: Option<String>,

    /// Value of the connect.sid cookie
    #[arg(long, env = "SUBSTACK_CONNECT_SID", global = true, hide_env_values = true)]
    pub connect_sid: Option<String>,

    /// Login email, used when no sid is given
    #[arg(long, env = "SUBSTACK_EMAIL", global = true)]
    pub email: Option<String>,

    /// Login password, used when no sid is given
    #[arg(long, env = "SUBSTACK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

impl From<ConnectionArgs> for ConfigOverrides {
    fn from(args: ConnectionArgs) -> Self {
        Self {
            publication_url: args.publication_url,
            base_url: args.base_url,
            user_id: args.user_id,
            auth_token: args.sid,
            auth_legacy_token: args.connect_sid,
            email: args.email,
            password: args.password,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DraftsArgs {
    /// Only drafts matching this search text
    #[arg(long, short)]
    pub query: Option<String>,

    /// Maximum number of drafts to show
    #[arg(long, short, default_value_t = 10)]
    pub limit: usize,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the MCP server on stdio (default)
    Serve,
    /// Initialize a new .substackrc.json configuration file
    Init,
    /// List drafts of the publication
    Drafts(DraftsArgs),
    /// List sections of the publication
    Sections,
}
