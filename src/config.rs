//! Application configuration, read once from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;

use crate::db::DbConfig;
use crate::logging::config::{LogConfig, LogLevel};

pub const DEFAULT_JWT_SECRET: &str = "default-jwt-secret-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub admin_email: Option<String>,
    pub admin_password_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    /// Public base URL used to build file URLs.
    pub app_url: String,
    pub allowed_origins: Vec<HeaderValue>,
    pub database: DbConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("JWT_SECRET must be set to a secure, unique value in production")]
    InsecureJwtSecret,
    #[error("invalid HOST/PORT: {0}")]
    InvalidAddress(String),
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &str) -> Option<T> {
    var(key).and_then(|v| v.trim().parse().ok())
}

fn parse_origins(raw: &str) -> Vec<HeaderValue> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| origin.parse().ok())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "127.0.0.1".to_string(),
            port: 3001,
            app_url: "http://127.0.0.1:3001".to_string(),
            allowed_origins: vec![
                HeaderValue::from_static("http://localhost:3000"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ],
            database: DbConfig::default(),
            auth: AuthConfig {
                jwt_secret: DEFAULT_JWT_SECRET.to_string(),
                token_ttl_hours: 24,
                admin_email: None,
                admin_password_hash: None,
            },
            storage: StorageConfig {
                dir: PathBuf::from("storage/files"),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Reads the environment (after `.env` has been loaded), falling back to
    /// development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment = var("ENVIRONMENT")
            .map(|e| Environment::parse(&e))
            .unwrap_or(defaults.environment);
        let host = var("HOST").unwrap_or(defaults.host);
        let port = parse_var("PORT").unwrap_or(defaults.port);
        let app_url = var("APP_URL")
            .unwrap_or_else(|| format!("http://{}:{}", host, port))
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = var("ALLOWED_ORIGINS")
            .map(|s| parse_origins(&s))
            .filter(|o| !o.is_empty())
            .or_else(|| var("FRONTEND_ORIGIN").map(|s| parse_origins(&s)))
            .filter(|o| !o.is_empty())
            .unwrap_or(defaults.allowed_origins);

        let auth = AuthConfig {
            jwt_secret: var("JWT_SECRET").unwrap_or(defaults.auth.jwt_secret),
            token_ttl_hours: parse_var("TOKEN_TTL_HOURS").unwrap_or(defaults.auth.token_ttl_hours),
            admin_email: var("ADMIN_EMAIL"),
            admin_password_hash: var("ADMIN_PASSWORD_HASH"),
        };

        let storage = StorageConfig {
            dir: var("STORAGE_DIR").map(PathBuf::from).unwrap_or(defaults.storage.dir),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES")
                .unwrap_or(defaults.storage.max_upload_bytes),
        };

        let default_level = if environment.is_production() {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };
        let log = LogConfig {
            production: environment.is_production(),
            level: var("LOG_LEVEL")
                .and_then(|l| l.parse().ok())
                .unwrap_or(default_level),
            dir: var("LOG_DIR").map(PathBuf::from).unwrap_or(defaults.log.dir),
        };

        let config = Self {
            environment,
            host,
            port,
            app_url,
            allowed_origins,
            database: DbConfig::from_env(),
            auth,
            storage,
            log,
        };
        config.check()?;
        Ok(config)
    }

    /// Refuses to run production with the default token secret.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.environment.is_production() && self.auth.jwt_secret == DEFAULT_JWT_SECRET {
            return Err(ConfigError::InsecureJwtSecret);
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress(format!("{}:{}", self.host, self.port)))
    }

    /// Public URL for a stored file name.
    pub fn file_url(&self, name: &str) -> String {
        format!("{}/storage/files/{}", self.app_url, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("PROD"), Environment::Production);
        assert_eq!(Environment::parse("test"), Environment::Test);
        assert_eq!(Environment::parse("anything"), Environment::Development);
    }

    #[test]
    fn test_production_rejects_default_secret() {
        let mut config = AppConfig::default();
        assert!(config.check().is_ok());
        config.environment = Environment::Production;
        assert!(matches!(config.check(), Err(ConfigError::InsecureJwtSecret)));
        config.auth.jwt_secret = "a-long-random-secret".to_string();
        assert!(config.check().is_ok());
    }

    #[test]
    fn test_file_url_uses_app_url() {
        let config = AppConfig {
            app_url: "https://cms.example.com".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(
            config.file_url("abc.png"),
            "https://cms.example.com/storage/files/abc.png"
        );
    }

    #[test]
    fn test_parse_origins_skips_invalid_entries() {
        let origins = parse_origins("https://a.example, ,https://b.example,,");
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[1], "https://b.example");
        assert!(parse_origins(" ").is_empty());
    }

    #[test]
    fn test_default_socket_addr() {
        assert_eq!(
            AppConfig::default().socket_addr().unwrap().to_string(),
            "127.0.0.1:3001"
        );
    }
}
