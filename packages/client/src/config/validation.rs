//! Configuration validation
//!
//! Checks run before a connector or server is assembled so inconsistent
//! settings fail loudly at construction instead of at connect time.

use std::net::SocketAddr;
use std::time::Duration;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid network address: {0}")]
    InvalidAddress(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),
}

impl From<ConfigurationError> for crate::Error {
    fn from(err: ConfigurationError) -> Self {
        crate::error::configuration(err)
    }
}

/// Trait for validating configuration
pub trait ConfigurationValidator {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant if any validation fails:
    /// - `InvalidTimeout` - if a timeout or delay is zero
    /// - `InvalidAddress` - if a bind or nameserver address is unusable
    /// - `InvalidParameter` - if a value is outside its valid range
    /// - `Conflict` - if settings contradict each other
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a timeout or delay.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if the duration is zero.
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }
        Ok(())
    }

    /// Validate a nameserver address.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidAddress` for an unspecified IP or port 0.
    pub fn validate_nameserver(addr: SocketAddr) -> ConfigResult<()> {
        if addr.ip().is_unspecified() || addr.port() == 0 {
            return Err(ConfigurationError::InvalidAddress(format!(
                "nameserver {addr} is not routable"
            )));
        }
        Ok(())
    }

    /// Validate numeric range
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidParameter` if the value is outside
    /// the specified range [min, max] (inclusive).
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> ConfigResult<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }
        Ok(())
    }
}

/// Common configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(60);
    /// Pacing interval between Happy-Eyeballs attempts.
    pub const ATTEMPT_DELAY: Duration = Duration::from_millis(100);
    /// How long A results wait for a pending AAAA lookup.
    pub const RESOLUTION_DELAY: Duration = Duration::from_millis(500);
    pub const LISTEN_BACKLOG: u32 = 511;
    pub const DNS_PORT: u16 = 53;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_timeout() {
        let err = ConfigValidator::validate_timeout(Duration::ZERO, "timeout").unwrap_err();
        assert_eq!(err.to_string(), "Invalid timeout value: timeout cannot be zero");
        assert!(ConfigValidator::validate_timeout(Duration::from_millis(1), "timeout").is_ok());
    }

    #[test]
    fn rejects_unroutable_nameserver() {
        assert!(ConfigValidator::validate_nameserver("0.0.0.0:53".parse().unwrap()).is_err());
        assert!(ConfigValidator::validate_nameserver("8.8.8.8:0".parse().unwrap()).is_err());
        assert!(ConfigValidator::validate_nameserver("8.8.8.8:53".parse().unwrap()).is_ok());
    }

    #[test]
    fn converts_into_crate_error() {
        let err: crate::Error = ConfigurationError::Conflict("x".into()).into();
        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Configuration conflict: x");
    }
}
