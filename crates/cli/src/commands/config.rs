use std::env;
use std::fs;
use std::path::Path;

use quotecraft_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

struct Field<'a> {
    key_path: &'static str,
    env_keys: &'static [&'static str],
    value: &'a str,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let provider = config.llm.provider.as_str();
    let api_key = config.llm.api_key.as_ref().map(|key| redact_secret(key.expose_secret()));
    let timeout_secs = config.llm.timeout_secs.to_string();
    let quote_count = config.llm.quote_count.to_string();
    let temperature = config.llm.temperature.to_string();
    let port = config.server.port.to_string();
    let graceful_shutdown_secs = config.server.graceful_shutdown_secs.to_string();
    let session_idle_ttl_secs = config.server.session_idle_ttl_secs.to_string();
    let max_sessions = config.server.max_sessions.to_string();
    let log_format = format!("{:?}", config.logging.format).to_ascii_lowercase();

    let fields = [
        Field { key_path: "llm.provider", env_keys: &["QUOTECRAFT_LLM_PROVIDER"], value: provider },
        Field {
            key_path: "llm.api_key",
            env_keys: &["QUOTECRAFT_LLM_API_KEY"],
            value: api_key.as_deref().unwrap_or("<unset>"),
        },
        Field {
            key_path: "llm.base_url",
            env_keys: &["QUOTECRAFT_LLM_BASE_URL"],
            value: config.llm.base_url.as_deref().unwrap_or("<provider default>"),
        },
        Field { key_path: "llm.model", env_keys: &["QUOTECRAFT_LLM_MODEL"], value: &config.llm.model },
        Field {
            key_path: "llm.timeout_secs",
            env_keys: &["QUOTECRAFT_LLM_TIMEOUT_SECS"],
            value: &timeout_secs,
        },
        Field {
            key_path: "llm.quote_count",
            env_keys: &["QUOTECRAFT_LLM_QUOTE_COUNT"],
            value: &quote_count,
        },
        Field {
            key_path: "llm.temperature",
            env_keys: &["QUOTECRAFT_LLM_TEMPERATURE"],
            value: &temperature,
        },
        Field {
            key_path: "server.bind_address",
            env_keys: &["QUOTECRAFT_SERVER_BIND_ADDRESS"],
            value: &config.server.bind_address,
        },
        Field { key_path: "server.port", env_keys: &["QUOTECRAFT_SERVER_PORT"], value: &port },
        Field {
            key_path: "server.graceful_shutdown_secs",
            env_keys: &["QUOTECRAFT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
            value: &graceful_shutdown_secs,
        },
        Field {
            key_path: "server.session_idle_ttl_secs",
            env_keys: &["QUOTECRAFT_SERVER_SESSION_IDLE_TTL_SECS"],
            value: &session_idle_ttl_secs,
        },
        Field {
            key_path: "server.max_sessions",
            env_keys: &["QUOTECRAFT_SERVER_MAX_SESSIONS"],
            value: &max_sessions,
        },
        Field {
            key_path: "logging.level",
            env_keys: &["QUOTECRAFT_LOGGING_LEVEL", "QUOTECRAFT_LOG_LEVEL"],
            value: &config.logging.level,
        },
        Field {
            key_path: "logging.format",
            env_keys: &["QUOTECRAFT_LOGGING_FORMAT", "QUOTECRAFT_LOG_FORMAT"],
            value: &log_format,
        },
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in &fields {
        let source = field_source(
            field.key_path,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key_path, field.value, source));
    }

    lines.join("\n")
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
    let set_env_key = env_keys
        .iter()
        .find(|key| env::var(key).map(|value| !value.trim().is_empty()).unwrap_or(false));
    if let Some(env_key) = set_env_key {
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Keeps a short recognizable prefix of the secret and masks the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    let visible: String = trimmed.chars().take(4).collect();
    if trimmed.chars().count() <= 8 {
        return "<redacted>".to_string();
    }
    format!("{visible}***")
}
