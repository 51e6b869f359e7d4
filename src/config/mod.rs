use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Costs bcrypt accepts.
pub const PASSWORD_HASH_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub app: AppSection,
    pub http: HttpConfig,
    pub router: RouterConfig,
    pub database: DatabaseConfig,
    pub authorization: AuthorizationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogMode {
    Debug,
    Dev,
    Prod,
}

impl LogMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "debug" => Some(LogMode::Debug),
            "dev" | "development" => Some(LogMode::Dev),
            "prod" | "production" => Some(LogMode::Prod),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    pub shutdown_timeout_secs: u64,
    pub log_mode: LogMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    pub api_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    pub private_key: String,
    pub public_key: String,
    pub token_ttl_secs: u64,
    /// bcrypt cost for stored password hashes.
    pub password_hash_cost: u32,
}

impl AuthorizationConfig {
    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

impl AppSection {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl RouterConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source, starting from the
    /// defaults and overriding whatever the source provides.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DB_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("DB_URL"))?;
        let private_key = lookup("PRIVATE_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("PRIVATE_KEY"))?;
        let public_key = lookup("PUBLIC_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("PUBLIC_KEY"))?;

        let mut config = Self::defaults(database_url, private_key, public_key);

        if let Some(v) = lookup("LOG_MODE") {
            config.app.log_mode = LogMode::parse(&v).ok_or(ConfigError::Invalid {
                key: "LOG_MODE",
                value: v,
            })?;
        }
        if let Some(v) = lookup("SHUTDOWN_TIMEOUT_SECS") {
            config.app.shutdown_timeout_secs = v.parse().unwrap_or(config.app.shutdown_timeout_secs);
        }

        if let Some(v) = lookup("HTTP_PORT") {
            config.http.port = v.parse().unwrap_or(config.http.port);
        }

        if let Some(v) = lookup("API_TIMEOUT_SECS") {
            config.router.api_timeout_secs = v.parse().unwrap_or(config.router.api_timeout_secs);
        }

        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            config.database.max_connections = v.parse().unwrap_or(config.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            config.database.connection_timeout = v.parse().unwrap_or(config.database.connection_timeout);
        }
        if let Some(v) = lookup("DATABASE_RUN_MIGRATIONS") {
            config.database.run_migrations = v.parse().unwrap_or(config.database.run_migrations);
        }

        if let Some(v) = lookup("TOKEN_TTL_SECS") {
            config.authorization.token_ttl_secs = v.parse().unwrap_or(config.authorization.token_ttl_secs);
        }
        if let Some(v) = lookup("PASSWORD_HASH_COST") {
            let cost = v.parse().unwrap_or(config.authorization.password_hash_cost);
            if !PASSWORD_HASH_COST_RANGE.contains(&cost) {
                return Err(ConfigError::Invalid {
                    key: "PASSWORD_HASH_COST",
                    value: v,
                });
            }
            config.authorization.password_hash_cost = cost;
        }

        Ok(config)
    }

    fn defaults(database_url: String, private_key: String, public_key: String) -> Self {
        Self {
            app: AppSection {
                shutdown_timeout_secs: 10,
                log_mode: LogMode::Debug,
            },
            http: HttpConfig { port: 8081 },
            router: RouterConfig { api_timeout_secs: 5 },
            database: DatabaseConfig {
                url: database_url,
                max_connections: 10,
                connection_timeout: 30,
                run_migrations: true,
            },
            authorization: AuthorizationConfig {
                private_key,
                public_key,
                token_ttl_secs: 60 * 60,
                password_hash_cost: 12,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 3] = [
        ("DB_URL", "postgres://localhost/books"),
        ("PRIVATE_KEY", "private"),
        ("PUBLIC_KEY", "public"),
    ];

    #[test]
    fn test_defaults_applied() {
        let config = AppConfig::from_lookup(lookup(&REQUIRED)).unwrap();
        assert_eq!(config.http.port, 8081);
        assert_eq!(config.router.api_timeout(), Duration::from_secs(5));
        assert_eq!(config.authorization.token_ttl(), Duration::from_secs(3600));
        assert_eq!(config.app.log_mode, LogMode::Debug);
        assert!(config.database.run_migrations);
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("HTTP_PORT", "9000"));
        vars.push(("TOKEN_TTL_SECS", "not-a-number"));
        vars.push(("LOG_MODE", "prod"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.http.port, 9000);
        assert_eq!(config.authorization.token_ttl_secs, 3600);
        assert_eq!(config.app.log_mode, LogMode::Prod);
    }

    #[test]
    fn test_database_url_fallback() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://db/x"),
            ("PRIVATE_KEY", "a"),
            ("PUBLIC_KEY", "b"),
        ]))
        .unwrap();
        assert_eq!(config.database.url, "postgres://db/x");
    }

    #[test]
    fn test_hash_cost_out_of_range_fails() {
        for bad in ["3", "32"] {
            let mut vars = REQUIRED.to_vec();
            vars.push(("PASSWORD_HASH_COST", bad));
            let err = AppConfig::from_lookup(lookup(&vars)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { key: "PASSWORD_HASH_COST", .. }));
        }

        let mut vars = REQUIRED.to_vec();
        vars.push(("PASSWORD_HASH_COST", "4"));
        let config = AppConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.authorization.password_hash_cost, 4);
    }

    #[test]
    fn test_missing_keys_fail() {
        let err = AppConfig::from_lookup(lookup(&[("DB_URL", "postgres://db/x")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("PRIVATE_KEY")));
    }
}
