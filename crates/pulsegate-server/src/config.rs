use anyhow::Context;
use pulsegate_egress::GarminConfig;
use pulsegate_egress::client::HttpClientConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Service key required as `Authorization: Bearer <key>`; empty disables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// Location of the default tenant's token state
    #[serde(default = "default_credential_dir")]
    pub default_dir: String,

    /// Parent directory of per-user token state
    #[serde(default = "default_users_dir")]
    pub users_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_pool_max_idle")]
    pub pool_max_idle_per_host: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
            credentials: CredentialsConfig::default(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            default_dir: default_credential_dir(),
            users_dir: default_users_dir(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            pool_max_idle_per_host: default_pool_max_idle(),
            user_agent: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl UpstreamConfig {
    pub fn to_garmin_config(&self) -> GarminConfig {
        let defaults = HttpClientConfig::default();
        GarminConfig {
            client_config: HttpClientConfig {
                timeout_secs: self.timeout_secs,
                connect_timeout_secs: self.connect_timeout_secs,
                pool_max_idle_per_host: self.pool_max_idle_per_host,
                user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            },
            ..GarminConfig::default().with_base_url(self.base_url.clone())
        }
    }
}

impl ServerConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        // Deployment platform conventions, no PULSEGATE_ prefix
        if let Ok(val) = std::env::var("HOST") {
            self.host = val;
        }

        if let Ok(val) = std::env::var("PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid PORT '{}', keeping {}", val, self.port),
            }
        }

        if let Ok(val) = std::env::var("GARMIN_SERVICE_API_KEY") {
            self.api_key = Some(val);
        }

        // Credential locations
        if let Ok(val) = std::env::var("PULSEGATE_CREDENTIALS_DIR") {
            self.credentials.default_dir = val;
        }

        if let Ok(val) = std::env::var("PULSEGATE_USERS_DIR") {
            self.credentials.users_dir = val;
        }

        // Upstream
        if let Ok(val) = std::env::var("PULSEGATE_UPSTREAM_URL") {
            self.upstream.base_url = val;
        }

        if let Ok(val) = std::env::var("PULSEGATE_UPSTREAM_TIMEOUT_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.upstream.timeout_secs = secs;
        }

        // Logging
        if let Ok(val) = std::env::var("PULSEGATE_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("PULSEGATE_LOG_JSON")
            && let Ok(json) = val.parse::<bool>()
        {
            self.logging.json = json;
        }
    }

    /// The configured service key, if it enables the gate
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|key| !key.is_empty())
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_credential_dir() -> String {
    pulsegate_storage::paths::DEFAULT_CREDENTIAL_DIR.to_string()
}

fn default_users_dir() -> String {
    pulsegate_storage::paths::DEFAULT_USERS_DIR.to_string()
}

fn default_base_url() -> String {
    GarminConfig::default().base_url
}

fn default_timeout_secs() -> u64 {
    HttpClientConfig::default().timeout_secs
}

fn default_connect_timeout_secs() -> u64 {
    HttpClientConfig::default().connect_timeout_secs
}

fn default_pool_max_idle() -> usize {
    HttpClientConfig::default().pool_max_idle_per_host
}

fn default_log_level() -> String {
    "info".to_string()
}
