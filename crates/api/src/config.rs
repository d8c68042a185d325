use std::path::PathBuf;
use std::str::FromStr;

use crate::auth::jwt::JwtConfig;

/// Startup configuration problems. The binary refuses to start on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// JWT token configuration (secret, expiry durations).
    pub jwt: JwtConfig,
    /// Root directory of the local file store (default: `./storage/files`).
    pub files_dir: PathBuf,
    /// Largest accepted upload in bytes (default: 10 MiB).
    pub max_upload_bytes: usize,
    /// Seconds between billing sweeps (default: `3600`).
    pub billing_sweep_interval_secs: u64,
    /// Mark the `access_token` cookie `Secure` (default: `false`).
    pub cookie_secure: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `HOST`                        | `0.0.0.0`               |
    /// | `PORT`                        | `3000`                  |
    /// | `CORS_ORIGINS`                | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                    |
    /// | `FILES_DIR`                   | `./storage/files`       |
    /// | `MAX_UPLOAD_BYTES`            | `10485760`              |
    /// | `BILLING_SWEEP_INTERVAL_SECS` | `3600`                  |
    /// | `COOKIE_SECURE`               | `false`                 |
    ///
    /// JWT settings are read by [`JwtConfig::from_env`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let files_dir = std::env::var("FILES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./storage/files"));

        Ok(Self {
            host,
            port: env_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env_nonzero("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30)?,
            jwt: JwtConfig::from_env()?,
            files_dir,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            billing_sweep_interval_secs: env_nonzero("BILLING_SWEEP_INTERVAL_SECS", 3600)?,
            cookie_secure: env_or("COOKIE_SECURE", false)?,
        })
    }
}

/// Parse `var` if set, otherwise return `default`.
pub(crate) fn env_or<T: FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        Err(_) => Ok(default),
    }
}

/// Like [`env_or`], but zero is rejected. Used for intervals and timeouts.
pub(crate) fn env_nonzero(var: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_or(var, default)? {
        0 => Err(ConfigError::Invalid {
            var,
            value: "0".into(),
        }),
        value => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn unset_variable_falls_back_to_default() {
        let port: u16 = env_or("CLUBHOUSE_TEST_UNSET_PORT", 8080).unwrap();
        assert_eq!(port, 8080);
    }

    #[test]
    fn invalid_value_names_the_variable() {
        std::env::set_var("CLUBHOUSE_TEST_BAD_PORT", "eighty");
        let err = env_or::<u16>("CLUBHOUSE_TEST_BAD_PORT", 80).unwrap_err();
        assert_eq!(
            err.to_string(),
            "CLUBHOUSE_TEST_BAD_PORT has an invalid value 'eighty'"
        );
    }

    #[test]
    fn zero_interval_is_rejected() {
        std::env::set_var("CLUBHOUSE_TEST_ZERO_INTERVAL", "0");
        let err = env_nonzero("CLUBHOUSE_TEST_ZERO_INTERVAL", 3600).unwrap_err();
        assert_matches!(
            err,
            ConfigError::Invalid { var: "CLUBHOUSE_TEST_ZERO_INTERVAL", .. }
        );

        std::env::set_var("CLUBHOUSE_TEST_SWEEP_INTERVAL", "60");
        assert_eq!(env_nonzero("CLUBHOUSE_TEST_SWEEP_INTERVAL", 3600).unwrap(), 60);
        assert_eq!(env_nonzero("CLUBHOUSE_TEST_UNSET_INTERVAL", 3600).unwrap(), 3600);
    }
}
