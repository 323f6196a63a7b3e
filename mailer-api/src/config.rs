use crate::error::{MailerError, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Prefix for environment overrides, e.g. `MAILER__SMTP__HOST`
pub const ENV_PREFIX: &str = "MAILER";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub smtp: SmtpConfig,
    pub email: EmailConfig,
    pub quota: QuotaConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub environment: Environment,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub tls: TlsMode,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout_seconds: u64,
    pub verify_on_startup: bool,
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Plain connection
    None,
    /// Upgrade with STARTTLS (required)
    Starttls,
    /// Implicit TLS (SMTPS)
    Tls,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub default_from: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotaConfig {
    pub default_daily_limit: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    /// Parse a complete TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MailerError::Config(e.to_string()))?;

        toml::from_str(&content).map_err(|e| MailerError::Config(e.to_string()))
    }

    /// Layer defaults, an optional TOML file and `MAILER__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = config::Config::try_from(&Config::default())
            .map_err(|e| MailerError::Config(e.to_string()))?;

        let mut builder = config::Config::builder().add_source(defaults);

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let config: Config = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| MailerError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server
            .listen_addr
            .parse::<SocketAddr>()
            .map_err(|e| {
                MailerError::Config(format!(
                    "Invalid listen address '{}': {}",
                    self.server.listen_addr, e
                ))
            })?;

        if self.smtp.host.trim().is_empty() {
            return Err(MailerError::Config("SMTP host is empty".to_string()));
        }
        if self.smtp.port == 0 {
            return Err(MailerError::Config("SMTP port must be non-zero".to_string()));
        }
        if self.quota.default_daily_limit == 0 {
            return Err(MailerError::Config(
                "Default daily quota must be at least 1".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(MailerError::Config(
                "Database pool needs at least one connection".to_string(),
            ));
        }

        Ok(())
    }

    pub fn is_development(&self) -> bool {
        self.server.environment == Environment::Development
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                listen_addr: "0.0.0.0:3000".to_string(),
                environment: Environment::Development,
                max_body_bytes: 10 * 1024 * 1024, // 10MB
            },
            database: DatabaseConfig {
                url: "sqlite://mailer.db".to_string(),
                max_connections: 5,
            },
            smtp: SmtpConfig {
                host: "smtp.example.com".to_string(),
                port: 587,
                tls: TlsMode::Starttls,
                username: None,
                password: None,
                timeout_seconds: 30,
                verify_on_startup: false,
                accept_invalid_certs: false,
            },
            email: EmailConfig {
                default_from: "noreply@example.com".to_string(),
            },
            quota: QuotaConfig {
                default_daily_limit: 100,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Pretty,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.is_development());
        assert_eq!(config.quota.default_daily_limit, 100);
    }

    #[test]
    fn test_from_file() {
        let toml = r#"
[server]
listen_addr = "127.0.0.1:8080"
environment = "production"
max_body_bytes = 1024

[database]
url = "sqlite::memory:"
max_connections = 1

[smtp]
host = "relay.example.org"
port = 465
tls = "tls"
username = "relay"
password = "secret"
timeout_seconds = 10
verify_on_startup = true
accept_invalid_certs = false

[email]
default_from = "hello@example.org"

[quota]
default_daily_limit = 250

[logging]
level = "debug"
format = "json"
"#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.environment, Environment::Production);
        assert_eq!(config.smtp.tls, TlsMode::Tls);
        assert_eq!(config.smtp.username.as_deref(), Some("relay"));
        assert_eq!(config.quota.default_daily_limit, 250);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[smtp]\nhost = \"mx.internal\"\nport = 2525\n")
            .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.smtp.host, "mx.internal");
        assert_eq!(config.smtp.port, 2525);
        assert_eq!(config.email.default_from, "noreply@example.com");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.smtp.host = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.quota.default_daily_limit = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.server.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
