use std::path::PathBuf;

use anyhow::{anyhow, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "SHELF_ENV";
const CONFIG_DIR_ENV: &str = "SHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "SHELF";

/// Conventional variable names honored on top of the `SHELF_` prefixed ones.
const WELL_KNOWN_OVERRIDES: &[(&str, &str)] = &[
    ("SUPABASE_URL", "store.url"),
    ("SUPABASE_ANON_KEY", "store.api_key"),
    ("RAKUTEN_APP_ID", "feed.application_id"),
];

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and env vars.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            );

        for (var, key) in WELL_KNOWN_OVERRIDES {
            builder = builder
                .set_override_option(*key, std::env::var(var).ok())
                .with_context(|| format!("failed to apply {} override", var))?;
        }

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parse_environment(&environment)?;

        Ok(settings)
    }
}

fn parse_environment(raw: &str) -> anyhow::Result<Environment> {
    match raw {
        "local" => Ok(Environment::Local),
        "staging" => Ok(Environment::Staging),
        "production" => Ok(Environment::Production),
        other => Err(anyhow!(
            "unsupported environment '{}'; expected local/staging/production",
            other
        )),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

/// Which catalog store implementation to wire up.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Postgrest,
}

/// Connection details for the catalog store. `url` and `api_key` are the two
/// store credentials; both are required for the `postgrest` backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "StoreSettings::default_table")]
    pub table: String,
    #[serde(default = "StoreSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl StoreSettings {
    fn default_table() -> String {
        "books".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10000
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            url: None,
            api_key: None,
            table: Self::default_table(),
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Ranking feed endpoint. The application id is checked when a sync runs, not at load.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSettings {
    #[serde(default = "FeedSettings::default_endpoint")]
    pub endpoint: String,
    #[serde(default = "FeedSettings::default_genre_id")]
    pub genre_id: String,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default = "FeedSettings::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl FeedSettings {
    fn default_endpoint() -> String {
        "https://app.rakuten.co.jp/services/api/BooksTotal/Search/20170404".to_string()
    }

    fn default_genre_id() -> String {
        "001004".to_string()
    }

    fn default_timeout_ms() -> u64 {
        10000
    }
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            genre_id: Self::default_genre_id(),
            application_id: None,
            timeout_ms: Self::default_timeout_ms(),
        }
    }
}

/// Scheduled sync. Disabled unless `interval_secs` is set.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SyncSettings {
    #[serde(default)]
    pub interval_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminSettings {
    /// Admin login is disabled while unset.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "AdminSettings::default_session_ttl_secs")]
    pub session_ttl_secs: u64,
}

impl AdminSettings {
    fn default_session_ttl_secs() -> u64 {
        3600
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            password: None,
            session_ttl_secs: Self::default_session_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,tower_http=debug".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
