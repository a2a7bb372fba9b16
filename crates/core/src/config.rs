use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpq::Catalog;
use crate::domain::product::{Product, ProductCode};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub messaging: MessagingConfig,
    pub server: ServerConfig,
    pub pricing: PricingConfig,
    pub catalog: CatalogConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub temperature: f32,
}

#[derive(Clone, Debug)]
pub struct MessagingConfig {
    pub provider: MessagingProvider,
    pub twilio_api_base: String,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<SecretString>,
    pub whatsapp_from: Option<String>,
    pub manager_whatsapp_to: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    pub labor_rate: Decimal,
    pub default_area_estimate: Decimal,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub products: Vec<Product>,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagingProvider {
    /// Twilio when all credentials are present, log otherwise.
    Auto,
    Log,
    Twilio,
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
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
    pub messaging_provider: Option<MessagingProvider>,
    pub server_port: Option<u16>,
    pub labor_rate: Option<Decimal>,
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
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: Some("https://api.openai.com/v1".to_string()),
                model: "gpt-4o-mini".to_string(),
                timeout_secs: 30,
                temperature: 0.2,
            },
            messaging: MessagingConfig {
                provider: MessagingProvider::Auto,
                twilio_api_base: "https://api.twilio.com".to_string(),
                twilio_account_sid: None,
                twilio_auth_token: None,
                whatsapp_from: None,
                manager_whatsapp_to: None,
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 5000 },
            pricing: PricingConfig {
                labor_rate: Decimal::new(800, 2),
                default_area_estimate: Decimal::new(40, 1),
            },
            catalog: CatalogConfig {
                products: vec![Product {
                    code: ProductCode::from("CARDS_4_4_500"),
                    name: "Business cards 4/4, 500 pcs run".to_string(),
                    unit: Product::DEFAULT_UNIT.to_string(),
                    unit_price: Decimal::new(8, 2),
                }],
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl LlmConfig {
    /// Whether a live generator can be built; otherwise the deterministic one is used.
    pub fn is_configured(&self) -> bool {
        match self.provider {
            LlmProvider::OpenAi => self
                .api_key
                .as_ref()
                .map(|key| !key.expose_secret().trim().is_empty())
                .unwrap_or(false),
            LlmProvider::Ollama => {
                self.base_url.as_ref().map(|url| !url.trim().is_empty()).unwrap_or(false)
            }
        }
    }
}

impl MessagingConfig {
    pub fn twilio_credentials_present(&self) -> bool {
        let token_present = self
            .twilio_auth_token
            .as_ref()
            .map(|token| !token.expose_secret().trim().is_empty())
            .unwrap_or(false);
        token_present
            && [&self.twilio_account_sid, &self.whatsapp_from, &self.manager_whatsapp_to]
                .iter()
                .all(|value| value.as_ref().map(|v| !v.trim().is_empty()).unwrap_or(false))
    }

    pub fn effective_provider(&self) -> MessagingProvider {
        match self.provider {
            MessagingProvider::Auto if self.twilio_credentials_present() => {
                MessagingProvider::Twilio
            }
            MessagingProvider::Auto => MessagingProvider::Log,
            explicit => explicit,
        }
    }
}

impl CatalogConfig {
    pub fn build(&self) -> Catalog {
        Catalog::new(self.products.clone())
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" | "open_ai" => Ok(Self::OpenAi),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|ollama)"
            ))),
        }
    }
}

impl FromStr for MessagingProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "log" => Ok(Self::Log),
            "twilio" => Ok(Self::Twilio),
            other => Err(ConfigError::Validation(format!(
                "unsupported messaging provider `{other}` (expected auto|log|twilio)"
            ))),
        }
    }
}

impl FromStr for LogFormat {
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("quoteline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
        }

        if let Some(messaging) = patch.messaging {
            if let Some(provider) = messaging.provider {
                self.messaging.provider = provider;
            }
            if let Some(api_base) = messaging.twilio_api_base {
                self.messaging.twilio_api_base = api_base;
            }
            if let Some(account_sid) = messaging.twilio_account_sid {
                self.messaging.twilio_account_sid = Some(account_sid);
            }
            if let Some(auth_token_value) = messaging.twilio_auth_token {
                self.messaging.twilio_auth_token = Some(secret_value(auth_token_value));
            }
            if let Some(from) = messaging.whatsapp_from {
                self.messaging.whatsapp_from = Some(from);
            }
            if let Some(to) = messaging.manager_whatsapp_to {
                self.messaging.manager_whatsapp_to = Some(to);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(pricing) = patch.pricing {
            if let Some(labor_rate) = pricing.labor_rate {
                self.pricing.labor_rate = labor_rate;
            }
            if let Some(default_area_estimate) = pricing.default_area_estimate {
                self.pricing.default_area_estimate = default_area_estimate;
            }
        }

        if let Some(catalog) = patch.catalog {
            if let Some(products) = catalog.products {
                self.catalog.products =
                    products.into_iter().map(ProductPatch::into_product).collect();
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
        if let Some(value) = read_env("QUOTELINE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env_alias("QUOTELINE_LLM_API_KEY", "OPENAI_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUOTELINE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("QUOTELINE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("QUOTELINE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_value("QUOTELINE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("QUOTELINE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_value("QUOTELINE_LLM_TEMPERATURE", &value)?;
        }

        if let Some(value) = read_env("QUOTELINE_MESSAGING_PROVIDER") {
            self.messaging.provider = value.parse()?;
        }
        if let Some(value) = read_env("QUOTELINE_TWILIO_API_BASE") {
            self.messaging.twilio_api_base = value;
        }
        if let Some(value) = read_env_alias("QUOTELINE_TWILIO_ACCOUNT_SID", "TWILIO_ACCOUNT_SID") {
            self.messaging.twilio_account_sid = Some(value);
        }
        if let Some(value) = read_env_alias("QUOTELINE_TWILIO_AUTH_TOKEN", "TWILIO_AUTH_TOKEN") {
            self.messaging.twilio_auth_token = Some(secret_value(value));
        }
        if let Some(value) = read_env_alias("QUOTELINE_WHATSAPP_FROM", "TWILIO_WHATSAPP_FROM") {
            self.messaging.whatsapp_from = Some(value);
        }
        if let Some(value) = read_env_alias("QUOTELINE_MANAGER_WHATSAPP_TO", "MANAGER_WHATSAPP_TO")
        {
            self.messaging.manager_whatsapp_to = Some(value);
        }

        if let Some(value) = read_env("QUOTELINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env_alias("QUOTELINE_SERVER_PORT", "PORT") {
            self.server.port = parse_value("QUOTELINE_SERVER_PORT", &value)?;
        }

        if let Some(value) = read_env("QUOTELINE_PRICING_LABOR_RATE") {
            self.pricing.labor_rate = parse_value("QUOTELINE_PRICING_LABOR_RATE", &value)?;
        }
        if let Some(value) = read_env("QUOTELINE_PRICING_DEFAULT_AREA_ESTIMATE") {
            self.pricing.default_area_estimate =
                parse_value("QUOTELINE_PRICING_DEFAULT_AREA_ESTIMATE", &value)?;
        }

        let log_level =
            read_env("QUOTELINE_LOGGING_LEVEL").or_else(|| read_env("QUOTELINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUOTELINE_LOGGING_FORMAT").or_else(|| read_env("QUOTELINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(messaging_provider) = overrides.messaging_provider {
            self.messaging.provider = messaging_provider;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(labor_rate) = overrides.labor_rate {
            self.pricing.labor_rate = labor_rate;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_llm(&self.llm)?;
        validate_messaging(&self.messaging)?;
        validate_server(&self.server)?;
        validate_pricing(&self.pricing)?;
        validate_catalog(&self.catalog)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quoteline.toml"), PathBuf::from("config/quoteline.toml")]
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

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_messaging(messaging: &MessagingConfig) -> Result<(), ConfigError> {
    let api_base = &messaging.twilio_api_base;
    if !api_base.starts_with("http://") && !api_base.starts_with("https://") {
        return Err(ConfigError::Validation(
            "messaging.twilio_api_base must start with http:// or https://".to_string(),
        ));
    }

    if messaging.provider == MessagingProvider::Twilio && !messaging.twilio_credentials_present() {
        return Err(ConfigError::Validation(
            "messaging.provider is twilio but twilio_account_sid, twilio_auth_token, whatsapp_from and manager_whatsapp_to are not all set".to_string(),
        ));
    }

    if messaging.effective_provider() == MessagingProvider::Twilio {
        let addresses = [
            ("messaging.whatsapp_from", &messaging.whatsapp_from),
            ("messaging.manager_whatsapp_to", &messaging.manager_whatsapp_to),
        ];
        for (key, value) in addresses {
            let valid = value.as_ref().map(|v| v.starts_with("whatsapp:")).unwrap_or(false);
            if !valid {
                return Err(ConfigError::Validation(format!(
                    "{key} must start with `whatsapp:` (for example `whatsapp:+14155238886`)"
                )));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_pricing(pricing: &PricingConfig) -> Result<(), ConfigError> {
    if pricing.labor_rate.is_sign_negative() {
        return Err(ConfigError::Validation(
            "pricing.labor_rate must not be negative".to_string(),
        ));
    }

    if pricing.default_area_estimate.is_sign_negative() {
        return Err(ConfigError::Validation(
            "pricing.default_area_estimate must not be negative".to_string(),
        ));
    }

    Ok(())
}

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    for product in &catalog.products {
        if product.code.as_str().trim().is_empty() {
            return Err(ConfigError::Validation(
                "catalog.products entries need a non-empty code".to_string(),
            ));
        }
        if product.unit_price.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "catalog product `{}` has a negative unit_price",
                product.code
            )));
        }
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

/// The prefixed name wins over the plain one.
fn read_env_alias(key: &str, alias: &str) -> Option<String> {
    read_env(key).or_else(|| read_env(alias))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    llm: Option<LlmPatch>,
    messaging: Option<MessagingPatch>,
    server: Option<ServerPatch>,
    pricing: Option<PricingPatch>,
    catalog: Option<CatalogPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    temperature: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct MessagingPatch {
    provider: Option<MessagingProvider>,
    twilio_api_base: Option<String>,
    twilio_account_sid: Option<String>,
    twilio_auth_token: Option<String>,
    whatsapp_from: Option<String>,
    manager_whatsapp_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct PricingPatch {
    labor_rate: Option<Decimal>,
    default_area_estimate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    products: Option<Vec<ProductPatch>>,
}

#[derive(Debug, Deserialize)]
struct ProductPatch {
    code: String,
    name: Option<String>,
    unit: Option<String>,
    unit_price: Decimal,
}

impl ProductPatch {
    fn into_product(self) -> Product {
        let code = self.code.trim().to_string();
        Product {
            name: self.name.unwrap_or_else(|| code.clone()),
            unit: self.unit.unwrap_or_else(|| Product::DEFAULT_UNIT.to_string()),
            code: ProductCode(code),
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
