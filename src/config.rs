use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::ApiConfig;
use crate::post::Audience;

pub const CONFIG_FILE_NAME: &str = ".substackrc.json";

pub const DEFAULT_BASE_URL: &str = "https://substack.com/api/v1";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Publication root, e.g. `https://example.substack.com`.
    #[serde(default)]
    pub publication_url: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Author id placed in the byline of new drafts.
    #[serde(default)]
    pub user_id: Option<u64>,
    /// Value of the `substack.sid` cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Value of the `connect.sid` cookie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_legacy_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub default_audience: Audience,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            publication_url: None,
            base_url: default_base_url(),
            user_id: None,
            auth_token: None,
            auth_legacy_token: None,
            email: None,
            password: None,
            default_audience: Audience::default(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Values given on the command line or through the environment. They win
/// over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub publication_url: Option<String>,
    pub base_url: Option<String>,
    pub user_id: Option<u64>,
    pub auth_token: Option<String>,
    pub auth_legacy_token: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Config {
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        let ConfigOverrides {
            publication_url,
            base_url,
            user_id,
            auth_token,
            auth_legacy_token,
            email,
            password,
        } = overrides;

        if publication_url.is_some() {
            self.publication_url = publication_url;
        }
        if let Some(base_url) = base_url {
            self.base_url = base_url;
        }
        if user_id.is_some() {
            self.user_id = user_id;
        }
        if auth_token.is_some() {
            self.auth_token = auth_token;
        }
        if auth_legacy_token.is_some() {
            self.auth_legacy_token = auth_legacy_token;
        }
        if email.is_some() {
            self.email = email;
        }
        if password.is_some() {
            self.password = password;
        }
    }

    /// Validate configuration values.
    ///
    /// Returns an error if the publication URL is missing or not http(s), or
    /// if no credentials are configured.
    pub fn validate(&self) -> Result<()> {
        let Some(publication_url) = &self.publication_url else {
            bail!(
                "Missing 'publicationUrl' (set it in {} or SUBSTACK_PUBLICATION_URL)",
                CONFIG_FILE_NAME
            );
        };
        let url = Url::parse(publication_url)
            .with_context(|| format!("Invalid 'publicationUrl': \"{}\"", publication_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("'publicationUrl' must be an http(s) URL: \"{}\"", publication_url);
        }

        Url::parse(&self.base_url)
            .with_context(|| format!("Invalid 'baseUrl': \"{}\"", self.base_url))?;

        if !self.has_credentials() {
            bail!(
                "No Substack credentials configured: set 'authToken' (substack.sid cookie) or 'email' and 'password'"
            );
        }

        Ok(())
    }

    pub fn has_credentials(&self) -> bool {
        let has_token = self.auth_token.as_deref().is_some_and(|t| !t.is_empty());
        let has_login = self.email.as_deref().is_some_and(|e| !e.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty());
        has_token || has_login
    }

    /// The author id, required before any draft can be created.
    pub fn require_user_id(&self) -> Result<u64> {
        self.user_id.with_context(|| {
            format!(
                "Missing 'userId' (set it in {} or SUBSTACK_USER_ID)",
                CONFIG_FILE_NAME
            )
        })
    }

    /// Client settings for [`crate::api::SubstackApi`].
    pub fn api_config(&self) -> Result<ApiConfig> {
        self.validate()?;
        let publication_url = self.publication_url.clone().unwrap_or_default();
        Ok(ApiConfig {
            email: self.email.clone(),
            password: self.password.clone(),
            base_url: Some(self.base_url.clone()),
            publication_url,
            auth_token: self.auth_token.clone().filter(|t| !t.is_empty()),
            auth_legacy_token: self.auth_legacy_token.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        })
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config {
        publication_url: Some("https://example.substack.com".to_string()),
        user_id: Some(0),
        auth_token: Some(String::new()),
        ..Default::default()
    };
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
    pub path: Option<PathBuf>,
}

/// Loads the nearest config file, falling back to defaults. Values are not
/// validated here because overrides may still fill them in.
pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(ConfigLoadResult {
                config,
                from_file: true,
                path: Some(path),
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
            path: None,
        }),
    }
}

/// Loads the config file from `start_dir` and applies `overrides` on top.
pub fn resolve_config(start_dir: &Path, overrides: ConfigOverrides) -> Result<Config> {
    let mut config = load_config(start_dir)?.config;
    config.apply_overrides(overrides);
    Ok(config)
}
