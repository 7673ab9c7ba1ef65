// Configuration management

use crate::auth::engine::AuthorizationConfig;
use crate::core::errors::GachaError;
use jsonwebtoken::Algorithm;
use std::env;
use std::str::FromStr;

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Token authorization
    pub allowed_issuers: Vec<String>,
    pub algorithms: Vec<Algorithm>,
    pub api_audience: String,
    pub token_namespace: String,
    pub tenant: String,
    pub jwt_leeway_secs: u64,

    // Key-set retrieval
    pub jwks_fetch_timeout_secs: u64,
    pub jwks_cache_ttl_secs: u64, // 0 disables caching
    pub jwks_cache_max_issuers: u64,
    pub jwks_min_refresh_secs: u64, // 0 refreshes on every unknown kid

    // Middleware configuration
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    ///
    /// # Returns
    /// * `Result<Self, GachaError>` - Config instance or validation error
    pub fn from_env() -> Result<Self, GachaError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0")?,
            port: Self::parse_port()?,
            allowed_issuers: Self::get_required_list("AUTH0_ALLOWED_ISSUERS")?,
            algorithms: Self::parse_algorithms(&Self::get_env_or_default("AUTH0_ALGORITHMS", "RS256")?)?,
            api_audience: Self::get_required_env("AUTH0_API_AUDIENCE")?,
            token_namespace: Self::get_required_env("AUTH0_TOKEN_NAMESPACE")?,
            tenant: Self::get_required_env("AUTH0_TENANT")?,
            jwt_leeway_secs: Self::parse_u64_allow_zero("JWT_LEEWAY_SECS", 0)?,
            jwks_fetch_timeout_secs: Self::parse_u64_or_default("JWKS_FETCH_TIMEOUT_SECS", 5)?,
            jwks_cache_ttl_secs: Self::parse_u64_allow_zero("JWKS_CACHE_TTL_SECS", 300)?,
            jwks_cache_max_issuers: Self::parse_u64_or_default("JWKS_CACHE_MAX_ISSUERS", 16)?,
            jwks_min_refresh_secs: Self::parse_u64_allow_zero("JWKS_MIN_REFRESH_SECS", 30)?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_usize_or_default("BODY_SIZE_LIMIT_BYTES", 2 * 1024 * 1024)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info")?,
            log_format: Self::get_env_or_default("LOG_FORMAT", "json")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Settings consumed by the authorization engine
    pub fn authorization(&self) -> AuthorizationConfig {
        AuthorizationConfig {
            allowed_issuers: self.allowed_issuers.clone(),
            algorithms: self.algorithms.clone(),
            audience: self.api_audience.clone(),
            namespace: self.token_namespace.clone(),
            tenant: self.tenant.clone(),
            leeway_secs: self.jwt_leeway_secs,
        }
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> Result<String, GachaError> {
        Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
    }

    fn get_required_env(key: &str) -> Result<String, GachaError> {
        let value = env::var(key)
            .map_err(|_| GachaError::ConfigurationError(format!("{} not set", key)))?;

        if value.trim().is_empty() {
            return Err(GachaError::ConfigurationError(format!("{} is empty", key)));
        }

        Ok(value.trim().to_string())
    }

    /// Comma-separated list; blank entries are dropped
    fn get_required_list(key: &str) -> Result<Vec<String>, GachaError> {
        let list = Self::split_list(&Self::get_required_env(key)?);
        if list.is_empty() {
            return Err(GachaError::ConfigurationError(format!("{} is empty", key)));
        }
        Ok(list)
    }

    fn split_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, GachaError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port_str.parse::<u16>()
            .map_err(|e| GachaError::ConfigurationError(
                format!("Invalid PORT value '{}': {}", port_str, e)
            ))?;

        if port == 0 {
            return Err(GachaError::ConfigurationError(
                "PORT must be between 1 and 65535".to_string()
            ));
        }

        Ok(port)
    }

    /// Parse a comma-separated list of asymmetric signing algorithms
    fn parse_algorithms(value: &str) -> Result<Vec<Algorithm>, GachaError> {
        let names = Self::split_list(value);
        if names.is_empty() {
            return Err(GachaError::ConfigurationError(
                "AUTH0_ALGORITHMS is empty".to_string()
            ));
        }

        names
            .iter()
            .map(|name| {
                let algorithm = Algorithm::from_str(name).map_err(|_| {
                    GachaError::ConfigurationError(format!("Unknown AUTH0_ALGORITHMS entry '{}'", name))
                })?;
                match algorithm {
                    Algorithm::RS256
                    | Algorithm::RS384
                    | Algorithm::RS512
                    | Algorithm::PS256
                    | Algorithm::PS384
                    | Algorithm::PS512
                    | Algorithm::ES256
                    | Algorithm::ES384 => Ok(algorithm),
                    _ => Err(GachaError::ConfigurationError(format!(
                        "AUTH0_ALGORITHMS entry '{}' is not an asymmetric signing algorithm",
                        name
                    ))),
                }
            })
            .collect()
    }

    /// Parse u64 from environment variable or return default; zero is rejected
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, GachaError> {
        let parsed = Self::parse_u64_allow_zero(key, default)?;
        if parsed == 0 {
            return Err(GachaError::ConfigurationError(
                format!("{} must be greater than 0", key)
            ));
        }
        Ok(parsed)
    }

    fn parse_u64_allow_zero(key: &str, default: u64) -> Result<u64, GachaError> {
        match env::var(key) {
            Ok(value) => value.trim().parse::<u64>()
                .map_err(|e| GachaError::ConfigurationError(
                    format!("Invalid {} value '{}': {}", key, value, e)
                )),
            _ => Ok(default),
        }
    }

    /// Parse usize from environment variable or return default
    fn parse_usize_or_default(key: &str, default: usize) -> Result<usize, GachaError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.trim().parse::<usize>()
                    .map_err(|e| GachaError::ConfigurationError(
                        format!("Invalid {} value '{}': {}", key, value, e)
                    ))?;

                if parsed == 0 {
                    return Err(GachaError::ConfigurationError(
                        format!("{} must be greater than 0", key)
                    ));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), GachaError> {
        for issuer in &self.allowed_issuers {
            Self::validate_url(issuer, "Issuer")?;
        }

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(value: &str, description: &str) -> Result<(), GachaError> {
        let url = url::Url::parse(value)
            .map_err(|e| GachaError::ConfigurationError(
                format!("Invalid {} URL '{}': {}", description, value, e)
            ))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(GachaError::ConfigurationError(format!(
                "Invalid {} URL '{}': scheme must be http or https",
                description, value
            )));
        }
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), GachaError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(GachaError::ConfigurationError(
                format!("Invalid LOG_LEVEL '{}': must be one of {}", level, valid_levels.join(", "))
            ));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), GachaError> {
        if format != "json" && format != "text" {
            return Err(GachaError::ConfigurationError(
                format!("Invalid LOG_FORMAT '{}': must be 'json' or 'text'", format)
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration
    ///
    /// Bypasses environment variable loading; issuer points at a local server.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            allowed_issuers: vec!["https://gacha.test.auth0.com/".to_string()],
            algorithms: vec![Algorithm::RS256],
            api_audience: "https://api.gacha.test".to_string(),
            token_namespace: "https://gacha.test".to_string(),
            tenant: "gacha".to_string(),
            jwt_leeway_secs: 0,
            jwks_fetch_timeout_secs: 5,
            jwks_cache_ttl_secs: 300,
            jwks_cache_max_issuers: 16,
            jwks_min_refresh_secs: 30,
            request_timeout_secs: 30,
            body_size_limit_bytes: 2 * 1024 * 1024,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
