//! Configuration module for the posts backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::AppError;

pub const DEFAULT_CREDENTIALS_PATH: &str = "./service-account.json";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_COLLECTION: &str = "posts";
pub const DEFAULT_ORDER_FIELD: &str = "date";
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_FIRESTORE_URL: &str = "https://firestore.googleapis.com/v1";

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the service-account key file
    pub credentials_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Collection served by `GET /posts`
    pub collection: String,
    /// Field the collection is ordered by, descending
    pub order_field: String,
    /// Upper bound on a single database fetch
    pub query_timeout: Duration,
    /// Firestore REST base URL
    pub firestore_url: String,
    /// Firestore emulator `host:port`, skips the OAuth exchange when set
    pub emulator_host: Option<String>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let credentials_path = env::var("POSTS_CREDENTIALS_PATH")
            .unwrap_or_else(|_| DEFAULT_CREDENTIALS_PATH.to_string())
            .into();

        let bind_addr = env::var("POSTS_BIND_ADDR")
            .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr
            .parse()
            .map_err(|_| AppError::Config(format!("Invalid POSTS_BIND_ADDR: {}", bind_addr)))?;

        let collection =
            env::var("POSTS_COLLECTION").unwrap_or_else(|_| DEFAULT_COLLECTION.to_string());

        let order_field =
            env::var("POSTS_ORDER_FIELD").unwrap_or_else(|_| DEFAULT_ORDER_FIELD.to_string());

        let query_timeout = match env::var("POSTS_QUERY_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("Invalid POSTS_QUERY_TIMEOUT_SECS: {}", raw))
            })?,
            Err(_) => DEFAULT_QUERY_TIMEOUT_SECS,
        };

        let firestore_url = env::var("POSTS_FIRESTORE_URL")
            .unwrap_or_else(|_| DEFAULT_FIRESTORE_URL.to_string());

        let emulator_host = env::var("FIRESTORE_EMULATOR_HOST")
            .ok()
            .filter(|h| !h.trim().is_empty());

        let log_level = env::var("POSTS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let log_format = match env::var("POSTS_LOG_FORMAT") {
            Ok(raw) => LogFormat::parse(&raw)
                .ok_or_else(|| AppError::Config(format!("Invalid POSTS_LOG_FORMAT: {}", raw)))?,
            Err(_) => LogFormat::Pretty,
        };

        Ok(Self {
            credentials_path,
            bind_addr,
            collection,
            order_field,
            query_timeout: Duration::from_secs(query_timeout),
            firestore_url,
            emulator_host,
            log_level,
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: &[&str] = &[
        "POSTS_CREDENTIALS_PATH",
        "POSTS_BIND_ADDR",
        "POSTS_COLLECTION",
        "POSTS_ORDER_FIELD",
        "POSTS_QUERY_TIMEOUT_SECS",
        "POSTS_FIRESTORE_URL",
        "FIRESTORE_EMULATOR_HOST",
        "POSTS_LOG_LEVEL",
        "POSTS_LOG_FORMAT",
    ];

    // Both checks share one test so they never race on the process environment.
    #[test]
    fn test_config_from_env() {
        for var in VARS {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert_eq!(
            config.credentials_path,
            PathBuf::from("./service-account.json")
        );
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert_eq!(config.collection, "posts");
        assert_eq!(config.order_field, "date");
        assert_eq!(config.query_timeout, Duration::from_secs(10));
        assert_eq!(config.firestore_url, DEFAULT_FIRESTORE_URL);
        assert!(config.emulator_host.is_none());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Pretty);

        env::set_var("POSTS_QUERY_TIMEOUT_SECS", "soon");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        env::remove_var("POSTS_QUERY_TIMEOUT_SECS");

        env::set_var("POSTS_BIND_ADDR", "not-an-address");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        env::remove_var("POSTS_BIND_ADDR");
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("xml"), None);
    }
}
