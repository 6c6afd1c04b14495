use std::path::PathBuf;

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";

/// Top-level configuration loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Layers `.env`, `config/base.toml`, `config/<env>.toml` and `BOOKSHELF_*` variables.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .with_context(|| "unable to resolve current directory")?
                .join("config"),
        };

        config::Config::builder()
            .add_source(config::File::from(config_dir.join("base.toml")).required(false))
            .add_source(config::File::from(config_dir.join(format!("{environment}.toml"))).required(false))
            .add_source(
                config::Environment::with_prefix("BOOKSHELF")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("auth.superusers")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| "failed to build configuration")?
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_static_dir() -> PathBuf {
        PathBuf::from("assets/static")
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: Self::default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "StoreSettings::default_path")]
    pub path: PathBuf,
}

impl StoreSettings {
    fn default_path() -> PathBuf {
        PathBuf::from("store")
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { path: Self::default_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "AuthSettings::default_session_max_age_days")]
    pub session_max_age_days: i64,
    /// Usernames granted superuser rights at startup.
    #[serde(default)]
    pub superusers: Vec<String>,
}

impl AuthSettings {
    fn default_session_max_age_days() -> i64 {
        30
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_max_age_days: Self::default_session_max_age_days(),
            superusers: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "TelemetrySettings::default_log_filter")]
    pub log_filter: String,
}

impl TelemetrySettings {
    fn default_log_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self { log_filter: Self::default_log_filter() }
    }
}
