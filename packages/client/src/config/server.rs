//! Listener configuration for `SocketServer`.

use super::tcp::TcpListenConfig;
use super::tls::TlsContextOptions;
use super::validation::{ConfigResult, ConfigValidator, ConfigurationError, ConfigurationValidator};

/// Options for the facade listener.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub tcp: TcpListenConfig,
    /// Used for `tls://` listeners; must carry `local_cert`.
    pub tls: TlsContextOptions,
}

impl ServerConfig {
    #[must_use]
    pub fn with_tcp(mut self, tcp: TcpListenConfig) -> Self {
        self.tcp = tcp;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: TlsContextOptions) -> Self {
        self.tls = tls;
        self
    }

    /// Checks the TLS half of the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidParameter` if no certificate is set.
    pub fn validate_tls(&self) -> ConfigResult<()> {
        if self.tls.local_cert.is_none() {
            return Err(ConfigurationError::InvalidParameter(
                "secure servers require local_cert".to_owned(),
            ));
        }
        Ok(())
    }
}

impl ConfigurationValidator for ServerConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_range(self.tcp.backlog, 1, u32::from(u16::MAX), "listen backlog")
    }
}
