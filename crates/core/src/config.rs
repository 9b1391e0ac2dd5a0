use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_HUBSPOT_API_BASE: &str = "https://api.hubapi.com";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub hubspot: HubSpotSettings,
    pub aggregation: AggregationConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct HubSpotSettings {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl HubSpotSettings {
    pub fn is_configured(&self) -> bool {
        self.access_token
            .as_ref()
            .map(|token| !token.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct AggregationConfig {
    pub dashboard_page_limit: usize,
    pub context_page_limit: usize,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub hubspot_access_token: Option<String>,
    pub hubspot_refresh_token: Option<String>,
    pub hubspot_client_id: Option<String>,
    pub hubspot_client_secret: Option<String>,
    pub hubspot_api_base: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                graceful_shutdown_secs: 15,
            },
            hubspot: HubSpotSettings {
                access_token: None,
                refresh_token: None,
                client_id: None,
                client_secret: None,
                api_base: DEFAULT_HUBSPOT_API_BASE.to_string(),
                timeout_secs: 30,
            },
            aggregation: AggregationConfig { dashboard_page_limit: 100, context_page_limit: 50 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("compass.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(hubspot) = patch.hubspot {
            if let Some(access_token) = hubspot.access_token {
                self.hubspot.access_token = Some(secret_value(access_token));
            }
            if let Some(refresh_token) = hubspot.refresh_token {
                self.hubspot.refresh_token = Some(secret_value(refresh_token));
            }
            if let Some(client_id) = hubspot.client_id {
                self.hubspot.client_id = Some(client_id);
            }
            if let Some(client_secret) = hubspot.client_secret {
                self.hubspot.client_secret = Some(secret_value(client_secret));
            }
            if let Some(api_base) = hubspot.api_base {
                self.hubspot.api_base = api_base;
            }
            if let Some(timeout_secs) = hubspot.timeout_secs {
                self.hubspot.timeout_secs = timeout_secs;
            }
        }

        if let Some(aggregation) = patch.aggregation {
            if let Some(limit) = aggregation.dashboard_page_limit {
                self.aggregation.dashboard_page_limit = limit;
            }
            if let Some(limit) = aggregation.context_page_limit {
                self.aggregation.context_page_limit = limit;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("COMPASS_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("COMPASS_SERVER_PORT") {
            self.server.port = parse_u16("COMPASS_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("COMPASS_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("COMPASS_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        // Bare HUBSPOT_* names are what HubSpot private-app setups usually export.
        let access_token =
            read_env("COMPASS_HUBSPOT_ACCESS_TOKEN").or_else(|| read_env("HUBSPOT_ACCESS_TOKEN"));
        if let Some(value) = access_token {
            self.hubspot.access_token = Some(secret_value(value));
        }
        let refresh_token =
            read_env("COMPASS_HUBSPOT_REFRESH_TOKEN").or_else(|| read_env("HUBSPOT_REFRESH_TOKEN"));
        if let Some(value) = refresh_token {
            self.hubspot.refresh_token = Some(secret_value(value));
        }
        let client_id =
            read_env("COMPASS_HUBSPOT_CLIENT_ID").or_else(|| read_env("HUBSPOT_CLIENT_ID"));
        if let Some(value) = client_id {
            self.hubspot.client_id = Some(value);
        }
        let client_secret =
            read_env("COMPASS_HUBSPOT_CLIENT_SECRET").or_else(|| read_env("HUBSPOT_CLIENT_SECRET"));
        if let Some(value) = client_secret {
            self.hubspot.client_secret = Some(secret_value(value));
        }
        if let Some(value) = read_env("COMPASS_HUBSPOT_API_BASE") {
            self.hubspot.api_base = value;
        }
        if let Some(value) = read_env("COMPASS_HUBSPOT_TIMEOUT_SECS") {
            self.hubspot.timeout_secs = parse_u64("COMPASS_HUBSPOT_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("COMPASS_AGGREGATION_DASHBOARD_PAGE_LIMIT") {
            self.aggregation.dashboard_page_limit =
                parse_usize("COMPASS_AGGREGATION_DASHBOARD_PAGE_LIMIT", &value)?;
        }
        if let Some(value) = read_env("COMPASS_AGGREGATION_CONTEXT_PAGE_LIMIT") {
            self.aggregation.context_page_limit =
                parse_usize("COMPASS_AGGREGATION_CONTEXT_PAGE_LIMIT", &value)?;
        }

        let log_level = read_env("COMPASS_LOGGING_LEVEL").or_else(|| read_env("COMPASS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("COMPASS_LOGGING_FORMAT").or_else(|| read_env("COMPASS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(access_token) = overrides.hubspot_access_token {
            self.hubspot.access_token = Some(secret_value(access_token));
        }
        if let Some(refresh_token) = overrides.hubspot_refresh_token {
            self.hubspot.refresh_token = Some(secret_value(refresh_token));
        }
        if let Some(client_id) = overrides.hubspot_client_id {
            self.hubspot.client_id = Some(client_id);
        }
        if let Some(client_secret) = overrides.hubspot_client_secret {
            self.hubspot.client_secret = Some(secret_value(client_secret));
        }
        if let Some(api_base) = overrides.hubspot_api_base {
            self.hubspot.api_base = api_base;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_hubspot(&self.hubspot)?;
        validate_aggregation(&self.aggregation)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("compass.toml"), PathBuf::from("config/compass.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_hubspot(hubspot: &HubSpotSettings) -> Result<(), ConfigError> {
    let base = hubspot.api_base.trim();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "hubspot.api_base must start with http:// or https://".to_string(),
        ));
    }

    if hubspot.timeout_secs == 0 || hubspot.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "hubspot.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if hubspot.refresh_token.is_some() {
        let missing_client = hubspot.client_id.as_deref().map(str::trim).unwrap_or("").is_empty()
            || hubspot
                .client_secret
                .as_ref()
                .map(|secret| secret.expose_secret().trim().is_empty())
                .unwrap_or(true);
        if missing_client {
            return Err(ConfigError::Validation(
                "hubspot.refresh_token requires hubspot.client_id and hubspot.client_secret"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_aggregation(aggregation: &AggregationConfig) -> Result<(), ConfigError> {
    if aggregation.dashboard_page_limit == 0 || aggregation.context_page_limit == 0 {
        return Err(ConfigError::Validation(
            "aggregation page limits must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    hubspot: Option<HubSpotPatch>,
    aggregation: Option<AggregationPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct HubSpotPatch {
    access_token: Option<String>,
    refresh_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    api_base: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct AggregationPatch {
    dashboard_page_limit: Option<usize>,
    context_page_limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_any_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.hubspot.is_configured(), "hubspot should be unconfigured by default")?;
        ensure(config.aggregation.dashboard_page_limit == 100, "dashboard limit defaults to 100")?;
        ensure(config.aggregation.context_page_limit == 50, "context limit defaults to 50")?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "compact logging default")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_HUBSPOT_TOKEN", "pat-na1-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("compass.toml");
            fs::write(
                &path,
                r#"
[hubspot]
access_token = "${TEST_HUBSPOT_TOKEN}"
timeout_secs = 10

[aggregation]
dashboard_page_limit = 25
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let token = config.hubspot.access_token.as_ref().map(|t| t.expose_secret().to_string());
            ensure(
                token.as_deref() == Some("pat-na1-from-env"),
                "access token should be loaded from environment",
            )?;
            ensure(config.hubspot.timeout_secs == 10, "timeout should come from file")?;
            ensure(config.aggregation.dashboard_page_limit == 25, "limit should come from file")?;
            Ok(())
        })();

        clear_vars(&["TEST_HUBSPOT_TOKEN"]);
        result
    }

    #[test]
    fn bare_hubspot_env_names_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("HUBSPOT_ACCESS_TOKEN", "pat-na1-bare");
        env::set_var("COMPASS_LOG_FORMAT", "json");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.hubspot.is_configured(), "bare access token should configure hubspot")?;
            ensure(matches!(config.logging.format, LogFormat::Json), "json log format alias")?;
            Ok(())
        })();

        clear_vars(&["HUBSPOT_ACCESS_TOKEN", "COMPASS_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMPASS_SERVER_PORT", "9100");
        env::set_var("COMPASS_HUBSPOT_ACCESS_TOKEN", "pat-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("compass.toml");
            fs::write(
                &path,
                r#"
[server]
port = 9000

[hubspot]
access_token = "pat-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    hubspot_api_base: Some("http://127.0.0.1:4010".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 9100, "env port should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win")?;
            ensure(config.hubspot.api_base == "http://127.0.0.1:4010", "override api base wins")?;
            let token = config.hubspot.access_token.as_ref().map(|t| t.expose_secret().to_string());
            ensure(token.as_deref() == Some("pat-from-env"), "env token should win over file")?;
            Ok(())
        })();

        clear_vars(&["COMPASS_SERVER_PORT", "COMPASS_HUBSPOT_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn refresh_token_without_client_credentials_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                hubspot_access_token: Some("pat-na1".to_string()),
                hubspot_refresh_token: Some("refresh".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".into()),
            Err(error) => error,
        };

        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("hubspot.refresh_token")
        );
        ensure(has_message, "validation failure should mention hubspot.refresh_token")
    }

    #[test]
    fn invalid_port_env_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("COMPASS_SERVER_PORT", "not-a-port");
        let result = match AppConfig::load(LoadOptions::default()) {
            Ok(_) => Err("expected invalid override error".to_string()),
            Err(ConfigError::InvalidEnvOverride { key, .. }) => {
                ensure(key == "COMPASS_SERVER_PORT", "error should name the variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
        };

        clear_vars(&["COMPASS_SERVER_PORT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                hubspot_access_token: Some("pat-secret-value".to_string()),
                hubspot_refresh_token: Some("refresh-secret-value".to_string()),
                hubspot_client_id: Some("client-id".to_string()),
                hubspot_client_secret: Some("client-secret-value".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .map_err(|err| format!("config load failed: {err}"))?;
        let debug = format!("{config:?}");

        ensure(!debug.contains("pat-secret-value"), "debug output should not contain token")?;
        ensure(!debug.contains("refresh-secret-value"), "debug should not contain refresh token")?;
        ensure(!debug.contains("client-secret-value"), "debug should not contain client secret")
    }
}
