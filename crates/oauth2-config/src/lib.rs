use hocon::HoconLoader;
use serde::{Deserialize, Serialize};
use std::path::Path;

use oauth2_core::{DecisionOptions, ErrorHandlerOptions, ErrorMode, TransactionOptions};

const MASK: &str = "***MASKED***";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub transactions: TransactionConfig,
    pub decision: DecisionConfig,
    pub errors: ErrorsConfig,
    pub session: Option<SessionConfig>,
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Which transaction store backs the authorization endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Transactions live in the host session.
    #[default]
    Session,
    /// Transactions live in process memory.
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "session" => Ok(StoreKind::Session),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("Unknown transaction store: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransactionConfig {
    /// `session` or `memory`.
    pub store: String,
    pub transaction_field: String,
    pub session_key: String,
    pub id_length: usize,
    pub user_property: String,
    /// Expiry for the memory store, in seconds. Unset keeps entries until removed.
    pub ttl_seconds: Option<u64>,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        let options = TransactionOptions::default();
        Self {
            store: "session".to_string(),
            transaction_field: options.transaction_field,
            session_key: options.session_key,
            id_length: options.id_length,
            user_property: options.user_property,
            ttl_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DecisionConfig {
    pub cancel_field: String,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            cancel_field: DecisionOptions::default().cancel_field,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ErrorsConfig {
    /// `direct` or `indirect`.
    pub mode: String,
    pub fragment: Vec<String>,
}

impl Default for ErrorsConfig {
    fn default() -> Self {
        Self {
            mode: "direct".to_string(),
            fragment: ErrorHandlerOptions::default().fragment,
        }
    }
}

impl ErrorsConfig {
    pub fn error_mode(&self) -> Result<ErrorMode, String> {
        match self.mode.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(ErrorMode::Direct),
            "indirect" => Ok(ErrorMode::Indirect),
            other => Err(format!("Unknown error mode: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Cookie signing key; at least 64 bytes.
    pub key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "rust_oauth2_toolkit".to_string(),
        }
    }
}

impl Config {
    /// Load `application.conf` from the working directory, falling back to
    /// environment variables.
    pub fn load() -> Self {
        Self::from_hocon().unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to load HOCON config: {}. Falling back to environment variables.",
                e
            );
            Self::from_env_fallback()
        })
    }

    /// Load configuration from HOCON file with environment variable substitution
    pub fn from_hocon() -> Result<Self, String> {
        Self::from_hocon_path("application.conf")
    }

    /// Load configuration from a specific HOCON file path
    pub fn from_hocon_path<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(format!("Configuration file not found: {}", path.display()));
        }

        let mut config: Config = HoconLoader::new()
            .load_file(path)
            .map_err(|e| format!("Failed to load HOCON file: {}", e))?
            .resolve()
            .map_err(|e| format!("Failed to parse and resolve HOCON: {}", e))?;

        // HOCON can't substitute arrays from env vars
        if let Ok(fragment) = std::env::var("OAUTH2_ERRORS_FRAGMENT") {
            config.errors.fragment = split_list(&fragment);
        }

        Ok(config)
    }

    /// Structured environment loading through the `config` crate
    /// (`OAUTH2_SERVER__PORT=9000`, ...).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("OAUTH2").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Flat `OAUTH2_*` variables, with defaults for anything unset.
    fn from_env_fallback() -> Self {
        let defaults = Self::default();
        let txn_defaults = &defaults.transactions;
        Self {
            server: ServerConfig {
                host: std::env::var("OAUTH2_SERVER_HOST")
                    .unwrap_or_else(|_| defaults.server.host.clone()),
                port: env_parse("OAUTH2_SERVER_PORT").unwrap_or(defaults.server.port),
            },
            transactions: TransactionConfig {
                store: std::env::var("OAUTH2_TRANSACTIONS_STORE")
                    .unwrap_or_else(|_| txn_defaults.store.clone()),
                transaction_field: std::env::var("OAUTH2_TRANSACTIONS_FIELD")
                    .unwrap_or_else(|_| txn_defaults.transaction_field.clone()),
                session_key: std::env::var("OAUTH2_TRANSACTIONS_SESSION_KEY")
                    .unwrap_or_else(|_| txn_defaults.session_key.clone()),
                id_length: env_parse("OAUTH2_TRANSACTIONS_ID_LENGTH")
                    .unwrap_or(txn_defaults.id_length),
                user_property: std::env::var("OAUTH2_TRANSACTIONS_USER_PROPERTY")
                    .unwrap_or_else(|_| txn_defaults.user_property.clone()),
                ttl_seconds: env_parse("OAUTH2_TRANSACTIONS_TTL_SECONDS"),
            },
            decision: DecisionConfig {
                cancel_field: std::env::var("OAUTH2_DECISION_CANCEL_FIELD")
                    .unwrap_or_else(|_| defaults.decision.cancel_field.clone()),
            },
            errors: ErrorsConfig {
                mode: std::env::var("OAUTH2_ERRORS_MODE")
                    .unwrap_or_else(|_| defaults.errors.mode.clone()),
                fragment: std::env::var("OAUTH2_ERRORS_FRAGMENT")
                    .map(|v| split_list(&v))
                    .unwrap_or_else(|_| defaults.errors.fragment.clone()),
            },
            session: std::env::var("OAUTH2_SESSION_KEY")
                .ok()
                .map(|key| SessionConfig { key: Some(key) }),
            telemetry: TelemetryConfig {
                service_name: std::env::var("OAUTH2_SERVICE_NAME")
                    .or_else(|_| std::env::var("OTEL_SERVICE_NAME"))
                    .unwrap_or_else(|_| defaults.telemetry.service_name.clone()),
            },
        }
    }

    pub fn transaction_options(&self) -> TransactionOptions {
        TransactionOptions {
            transaction_field: self.transactions.transaction_field.clone(),
            session_key: self.transactions.session_key.clone(),
            id_length: self.transactions.id_length,
            user_property: self.transactions.user_property.clone(),
        }
    }

    pub fn store_kind(&self) -> Result<StoreKind, String> {
        self.transactions.store.parse()
    }

    pub fn decision_options(&self) -> DecisionOptions {
        DecisionOptions {
            cancel_field: self.decision.cancel_field.clone(),
        }
    }

    /// An unrecognised mode falls back to `direct`; [`Config::validate`] reports it.
    pub fn error_options(&self) -> ErrorHandlerOptions {
        ErrorHandlerOptions {
            mode: self.errors.error_mode().unwrap_or_default(),
            fragment: self.errors.fragment.clone(),
        }
    }

    /// Reject settings that would break transaction handling at runtime.
    pub fn validate(&self) -> Result<(), String> {
        let txn = &self.transactions;
        if txn.id_length == 0 {
            return Err("transactions.id_length must be at least 1".to_string());
        }
        if txn.transaction_field.is_empty() {
            return Err("transactions.transaction_field must not be empty".to_string());
        }
        self.errors.error_mode()?;
        if self.store_kind()? == StoreKind::Session && txn.session_key.is_empty() {
            return Err("transactions.session_key must not be empty for the session store".to_string());
        }
        if let Some(key) = self.session.as_ref().and_then(|s| s.key.as_ref()) {
            if key.len() < 64 {
                return Err(format!(
                    "session.key must be at least 64 bytes long (current: {} bytes)",
                    key.len()
                ));
            }
        }
        Ok(())
    }

    /// Produce a version safe to log (secrets masked).
    pub fn sanitized(&self) -> Self {
        let mut clone = self.clone();
        if let Some(ref mut session) = clone.session {
            if let Some(ref mut key) = session.key {
                *key = MASK.to_string();
            }
        }
        clone
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
