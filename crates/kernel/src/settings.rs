use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "BOOKSHELF_ENV";
const CONFIG_DIR_ENV: &str = "BOOKSHELF_CONFIG_DIR";
const ENV_PREFIX: &str = "BOOKSHELF";

/// Plain `PORT` variable honored by most hosting platforms.
const PORT_ENV: &str = "PORT";
/// Connection string variable kept for compatibility with existing deployments.
const MONGODB_URI_ENV: &str = "MONGODB_URI";
/// Legacy production switch; `PROD=true` also skips `.env`.
const PROD_ENV: &str = "PROD";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl Environment {
    fn parse(raw: &str) -> anyhow::Result<Self> {
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
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// `BOOKSHELF_*` variables and finally the `PORT` / `MONGODB_URI` overrides.
    pub fn load() -> anyhow::Result<Self> {
        let raw_env = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let environment = Environment::parse(&raw_env)?;

        // Production reads its environment from the platform only.
        if loads_dotenv(environment, std::env::var(PROD_ENV).ok().as_deref()) {
            // Allow missing `.env` files without failing.
            let _ = dotenvy::dotenv();
        }

        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .map(|cwd| cwd.join("config"))
                .context("unable to resolve current directory")?,
        };

        let mut settings = Self::from_sources(&config_dir, &raw_env)?;
        settings.environment = environment;
        settings.apply_overrides(
            std::env::var(PORT_ENV).ok().as_deref(),
            std::env::var(MONGODB_URI_ENV).ok().as_deref(),
        )?;

        Ok(settings)
    }

    /// Build settings from the config directory and `BOOKSHELF_*` variables.
    fn from_sources(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        cfg.try_deserialize()
            .with_context(|| "failed to deserialize configuration")
    }

    /// Apply the plain `PORT` and `MONGODB_URI` overrides.
    ///
    /// A set, non-empty `PORT` wins over the configured port; an unset or
    /// empty one leaves it alone.
    pub fn apply_overrides(
        &mut self,
        port: Option<&str>,
        mongodb_uri: Option<&str>,
    ) -> anyhow::Result<()> {
        if let Some(port) = port.map(str::trim).filter(|p| !p.is_empty()) {
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid {} value '{}'", PORT_ENV, port))?;
        }

        if let Some(uri) = mongodb_uri.map(str::trim).filter(|u| !u.is_empty()) {
            self.database.uri = uri.to_string();
        }

        Ok(())
    }
}

fn loads_dotenv(environment: Environment, prod: Option<&str>) -> bool {
    let prod_flag = prod.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"));
    environment != Environment::Production && !prod_flag
}

#[derive(Debug, Clone, Deserialize, Serialize)]
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

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
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

/// Which store implementation backs the books collection.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongodb,
    Memory,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_name() -> String {
        "bookshelf".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            uri: Self::default_uri(),
            name: Self::default_name(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info".to_string()
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

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_environment_is_local() {
        let settings = Settings::default();
        assert_eq!(settings.environment, Environment::Local);
    }

    #[test]
    fn default_database_uri_is_localhost() {
        let settings = Settings::default();
        assert_eq!(settings.database.uri, "mongodb://127.0.0.1:27017");
        assert_eq!(settings.database.backend, StoreBackend::Mongodb);
    }

    #[test]
    fn default_port_is_8080() {
        let settings = Settings::default();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.server.bind_address(), "0.0.0.0:8080");
    }

    #[test]
    fn port_override_is_honored_when_set() {
        let mut settings = Settings::default();
        settings.apply_overrides(Some("9090"), None).unwrap();
        assert_eq!(settings.server.port, 9090);
    }

    #[test]
    fn empty_or_missing_port_keeps_configured_value() {
        let mut settings = Settings::default();
        settings.server.port = 3000;
        settings.apply_overrides(None, None).unwrap();
        assert_eq!(settings.server.port, 3000);
        settings.apply_overrides(Some("  "), None).unwrap();
        assert_eq!(settings.server.port, 3000);
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.apply_overrides(Some("eighty"), None).is_err());
    }

    #[test]
    fn mongodb_uri_override_replaces_default() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(None, Some("mongodb://db.internal:27017"))
            .unwrap();
        assert_eq!(settings.database.uri, "mongodb://db.internal:27017");
    }

    #[test]
    fn dotenv_is_skipped_in_production_or_with_prod_flag() {
        assert!(loads_dotenv(Environment::Local, None));
        assert!(loads_dotenv(Environment::Staging, Some("false")));
        assert!(!loads_dotenv(Environment::Production, None));
        assert!(!loads_dotenv(Environment::Local, Some("true")));
        assert!(!loads_dotenv(Environment::Local, Some("TRUE")));
    }

    #[test]
    fn unknown_environment_is_rejected() {
        assert!(Environment::parse("qa").is_err());
        assert_eq!(Environment::parse("staging").unwrap(), Environment::Staging);
    }

    #[test]
    fn missing_config_dir_falls_back_to_defaults() {
        let settings =
            Settings::from_sources(Path::new("/nonexistent/bookshelf-config"), "local").unwrap();
        assert_eq!(settings.database.name, "bookshelf");
        assert_eq!(settings.telemetry.filter, "info");
    }
}
