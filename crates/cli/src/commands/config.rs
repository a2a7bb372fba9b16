use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use quoteline_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

/// One rendered field: dotted key, display value, env names that can set it.
struct Field<'a> {
    key: &'static str,
    value: String,
    env_keys: &'a [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(field.key, &field.value, source));
    }

    lines.join("\n")
}

fn fields(config: &AppConfig) -> Vec<Field<'static>> {
    let unset = || "<unset>".to_string();
    let messaging = &config.messaging;

    vec![
        Field {
            key: "llm.provider",
            value: format!("{:?}", config.llm.provider),
            env_keys: &["QUOTELINE_LLM_PROVIDER"],
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["QUOTELINE_LLM_MODEL"],
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone().unwrap_or_else(unset),
            env_keys: &["QUOTELINE_LLM_BASE_URL"],
        },
        Field {
            key: "llm.api_key",
            value: redact_secret(config.llm.api_key.as_ref().map(|key| key.expose_secret())),
            env_keys: &["QUOTELINE_LLM_API_KEY", "OPENAI_API_KEY"],
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["QUOTELINE_LLM_TIMEOUT_SECS"],
        },
        Field {
            key: "messaging.provider",
            value: format!(
                "{:?} (effective: {:?})",
                messaging.provider,
                messaging.effective_provider()
            ),
            env_keys: &["QUOTELINE_MESSAGING_PROVIDER"],
        },
        Field {
            key: "messaging.twilio_account_sid",
            value: messaging.twilio_account_sid.as_deref().map(redact_sid).unwrap_or_else(unset),
            env_keys: &["QUOTELINE_TWILIO_ACCOUNT_SID", "TWILIO_ACCOUNT_SID"],
        },
        Field {
            key: "messaging.twilio_auth_token",
            value: redact_secret(
                messaging.twilio_auth_token.as_ref().map(|token| token.expose_secret()),
            ),
            env_keys: &["QUOTELINE_TWILIO_AUTH_TOKEN", "TWILIO_AUTH_TOKEN"],
        },
        Field {
            key: "messaging.whatsapp_from",
            value: messaging.whatsapp_from.clone().unwrap_or_else(unset),
            env_keys: &["QUOTELINE_WHATSAPP_FROM", "TWILIO_WHATSAPP_FROM"],
        },
        Field {
            key: "messaging.manager_whatsapp_to",
            value: messaging.manager_whatsapp_to.clone().unwrap_or_else(unset),
            env_keys: &["QUOTELINE_MANAGER_WHATSAPP_TO", "MANAGER_WHATSAPP_TO"],
        },
        Field {
            key: "server.bind_address",
            value: config.server.bind_address.clone(),
            env_keys: &["QUOTELINE_SERVER_BIND_ADDRESS"],
        },
        Field {
            key: "server.port",
            value: config.server.port.to_string(),
            env_keys: &["QUOTELINE_SERVER_PORT", "PORT"],
        },
        Field {
            key: "pricing.labor_rate",
            value: config.pricing.labor_rate.to_string(),
            env_keys: &["QUOTELINE_PRICING_LABOR_RATE"],
        },
        Field {
            key: "pricing.default_area_estimate",
            value: config.pricing.default_area_estimate.to_string(),
            env_keys: &["QUOTELINE_PRICING_DEFAULT_AREA_ESTIMATE"],
        },
        Field {
            key: "catalog.products",
            value: format!("{} seeded", config.catalog.products.len()),
            env_keys: &[],
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["QUOTELINE_LOGGING_LEVEL", "QUOTELINE_LOG_LEVEL"],
        },
        Field {
            key: "logging.format",
            value: format!("{:?}", config.logging.format),
            env_keys: &["QUOTELINE_LOGGING_FORMAT", "QUOTELINE_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("quoteline.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/quoteline.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&str>) -> String {
    match secret.map(str::trim) {
        None => "<unset>".to_string(),
        Some("") => "<empty>".to_string(),
        Some(_) => "<redacted>".to_string(),
    }
}

/// Keeps the `AC` prefix and the last four characters.
fn redact_sid(sid: &str) -> String {
    let sid = sid.trim();
    if sid.len() <= 6 || !sid.is_ascii() {
        return "<redacted>".to_string();
    }
    format!("{}***{}", &sid[..2], &sid[sid.len() - 4..])
}
