use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Yaml},
};
use longboard_types::{LongboardError, has_text};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};

const ENV_PREFIX: &str = "LONGBOARD_";

fn default_marketplace_base() -> String {
    "https://www.upwork.com".to_string()
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_read_timeout() -> u64 {
    60
}
fn default_graphql_url() -> String {
    "https://gql.waveapps.com/graphql/public".to_string()
}
fn default_login_url() -> String {
    "https://api.waveapps.com/oauth2/authorize/".to_string()
}
fn default_token_url() -> String {
    "https://api.waveapps.com/oauth2/token/".to_string()
}
fn default_redacted() -> Vec<String> {
    vec![
        "authorization".to_string(),
        "cookie".to_string(),
        "set-cookie".to_string(),
    ]
}
fn default_max_body() -> usize {
    1024 * 1024
}
fn default_level() -> String {
    "info".to_string()
}

/// Work-marketplace consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceConfig {
    /// Site root; OAuth, `api` and `gds` endpoints hang off it.
    #[serde(default = "default_marketplace_base")]
    pub base_url: String,
    /// OAuth1 consumer key.
    #[serde(default)]
    pub client_id: Option<String>,
    /// OAuth1 consumer secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Callback handed to the request-token call.
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default)]
    pub http: HttpDebugConfig,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_marketplace_base(),
            client_id: None,
            client_secret: None,
            callback_url: None,
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            http: HttpDebugConfig::default(),
        }
    }
}

impl MarketplaceConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Whole-request timeout: connect plus read, saturating.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.connect_timeout().saturating_add(self.read_timeout())
    }

    /// Checks the settings needed to sign marketplace requests.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] naming the first missing setting.
    pub fn validate(&self) -> Result<(), LongboardError> {
        require("marketplace.base_url", Some(self.base_url.as_str()))?;
        require("marketplace.client_id", self.client_id.as_deref())?;
        require("marketplace.client_secret", self.client_secret.as_deref())
    }
}

/// Accounting platform OAuth2 and GraphQL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingConfig {
    #[serde(default = "default_graphql_url")]
    pub graphql_url: String,
    /// Authorization endpoint the user is sent to.
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_token_url")]
    pub token_url: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Extra headers attached to every GraphQL request.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    #[serde(default)]
    pub http: HttpDebugConfig,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            graphql_url: default_graphql_url(),
            login_url: default_login_url(),
            token_url: default_token_url(),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            scopes: Vec::new(),
            headers: BTreeMap::new(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            http: HttpDebugConfig::default(),
        }
    }
}

impl AccountingConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Whole-request timeout: connect plus read, saturating.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.connect_timeout().saturating_add(self.read_timeout())
    }

    /// Checks the settings needed for the OAuth2 exchange and GraphQL calls.
    ///
    /// # Errors
    ///
    /// Returns [`LongboardError::Config`] naming the first missing setting.
    pub fn validate(&self) -> Result<(), LongboardError> {
        require("accounting.graphql_url", Some(self.graphql_url.as_str()))?;
        require("accounting.login_url", Some(self.login_url.as_str()))?;
        require("accounting.token_url", Some(self.token_url.as_str()))?;
        require("accounting.client_id", self.client_id.as_deref())?;
        require("accounting.client_secret", self.client_secret.as_deref())
    }
}

/// Request/response dumping for a provider's HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpDebugConfig {
    /// Log every request and response at TRACE.
    #[serde(default)]
    pub debug: bool,
    /// Header names shown as `<redacted>` in dumps (case-insensitive).
    #[serde(default = "default_redacted")]
    pub redact_headers: Vec<String>,
    /// Bodies are truncated to this many bytes in dumps.
    #[serde(default = "default_max_body")]
    pub max_body_size: usize,
}

impl Default for HttpDebugConfig {
    fn default() -> Self {
        Self {
            debug: false,
            redact_headers: default_redacted(),
            max_body_size: default_max_body(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub accounting: AccountingConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Config {
    /// Parses configuration from a YAML string, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the YAML is invalid or extraction fails.
    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::string(yaml))
            .extract()
    }

    /// Loads configuration from a file path, merged with defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if the file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn from_file(path: &Path) -> Result<Self, figment::Error> {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .extract()
    }

    /// Loads defaults, then `path` when given, then `LONGBOARD_*` environment
    /// variables (`__` separates nested keys, e.g. `LONGBOARD_MARKETPLACE__CLIENT_ID`).
    ///
    /// # Errors
    ///
    /// Returns a [`figment::Error`] if any layer fails to parse.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "loading config file");
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
    }
}

fn require(name: &str, value: Option<&str>) -> Result<(), LongboardError> {
    if has_text(value) {
        Ok(())
    } else {
        Err(LongboardError::Config(format!("{name} is not set")))
    }
}
