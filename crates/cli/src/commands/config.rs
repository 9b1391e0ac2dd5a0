use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use compass_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Entry {
    key: &'static str,
    env_keys: &'static [&'static str],
    value: String,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", entry.key, entry.value));
    }

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let server = &config.server;
    let hubspot = &config.hubspot;
    let aggregation = &config.aggregation;

    vec![
        Entry {
            key: "server.bind_address",
            env_keys: &["COMPASS_SERVER_BIND_ADDRESS"],
            value: server.bind_address.clone(),
        },
        Entry {
            key: "server.port",
            env_keys: &["COMPASS_SERVER_PORT"],
            value: server.port.to_string(),
        },
        Entry {
            key: "server.graceful_shutdown_secs",
            env_keys: &["COMPASS_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: server.graceful_shutdown_secs.to_string(),
        },
        Entry {
            key: "hubspot.access_token",
            env_keys: &["COMPASS_HUBSPOT_ACCESS_TOKEN", "HUBSPOT_ACCESS_TOKEN"],
            value: redact_secret(hubspot.access_token.as_ref()),
        },
        Entry {
            key: "hubspot.refresh_token",
            env_keys: &["COMPASS_HUBSPOT_REFRESH_TOKEN", "HUBSPOT_REFRESH_TOKEN"],
            value: redact_secret(hubspot.refresh_token.as_ref()),
        },
        Entry {
            key: "hubspot.client_id",
            env_keys: &["COMPASS_HUBSPOT_CLIENT_ID", "HUBSPOT_CLIENT_ID"],
            value: hubspot.client_id.clone().unwrap_or_else(|| "<unset>".to_string()),
        },
        Entry {
            key: "hubspot.client_secret",
            env_keys: &["COMPASS_HUBSPOT_CLIENT_SECRET", "HUBSPOT_CLIENT_SECRET"],
            value: redact_secret(hubspot.client_secret.as_ref()),
        },
        Entry {
            key: "hubspot.api_base",
            env_keys: &["COMPASS_HUBSPOT_API_BASE"],
            value: hubspot.api_base.clone(),
        },
        Entry {
            key: "hubspot.timeout_secs",
            env_keys: &["COMPASS_HUBSPOT_TIMEOUT_SECS"],
            value: hubspot.timeout_secs.to_string(),
        },
        Entry {
            key: "aggregation.dashboard_page_limit",
            env_keys: &["COMPASS_AGGREGATION_DASHBOARD_PAGE_LIMIT"],
            value: aggregation.dashboard_page_limit.to_string(),
        },
        Entry {
            key: "aggregation.context_page_limit",
            env_keys: &["COMPASS_AGGREGATION_CONTEXT_PAGE_LIMIT"],
            value: aggregation.context_page_limit.to_string(),
        },
        Entry {
            key: "logging.level",
            env_keys: &["COMPASS_LOGGING_LEVEL", "COMPASS_LOG_LEVEL"],
            value: config.logging.level.clone(),
        },
        Entry {
            key: "logging.format",
            env_keys: &["COMPASS_LOGGING_FORMAT", "COMPASS_LOG_FORMAT"],
            value: format!("{:?}", config.logging.format),
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["compass.toml", "config/compass.toml"].into_iter().map(PathBuf::from).find(|p| p.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps the token family prefix (`pat-`, `CJ-`) so operators can tell
/// credentials apart without exposing them.
fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };

    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_keep_only_their_prefix() {
        let token = SecretString::from("pat-na1-11111111-2222");
        assert_eq!(redact_secret(Some(&token)), "pat-***");
        assert_eq!(redact_secret(Some(&SecretString::from("opaque"))), "<redacted>");
        assert_eq!(redact_secret(Some(&SecretString::from("  "))), "<empty>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn dotted_paths_resolve_against_toml() {
        let doc: Value = "[hubspot]\napi_base = \"http://localhost\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "hubspot.api_base"));
        assert!(!contains_path(&doc, "hubspot.access_token"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
