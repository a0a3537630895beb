//! Core `SocketBuilder` structure and terminal methods.

use std::sync::Arc;

use sockline_client::config::{ConnectorConfig, ServerConfig};
use sockline_client::server::SocketServer;
use sockline_client::{Connector, Result};

/// Collects connector and server settings through chained calls.
///
/// ```no_run
/// use std::time::Duration;
///
/// # async fn run() -> sockline::Result<()> {
/// let connector = sockline::SocketBuilder::new()
///     .timeout(Duration::from_secs(10))
///     .happy_eyeballs(true)
///     .connector()?;
/// let connection = connector.connect("example.com:80").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SocketBuilder {
    pub(super) connector: ConnectorConfig,
    pub(super) server: ServerConfig,
}

impl SocketBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing connector configuration.
    #[must_use]
    pub fn from_config(config: ConnectorConfig) -> Self {
        SocketBuilder {
            connector: config,
            server: ServerConfig::default(),
        }
    }

    /// The connector configuration collected so far.
    #[must_use]
    pub fn connector_config(&self) -> &ConnectorConfig {
        &self.connector
    }

    #[must_use]
    pub fn server_config(&self) -> &ServerConfig {
        &self.server
    }

    /// Assembles the connector.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for inconsistent settings.
    pub fn connector(&self) -> Result<Arc<Connector>> {
        let connector = Connector::with_config(self.connector.clone())?;
        tracing::debug!("built {connector:?}");
        Ok(Arc::new(connector))
    }

    /// Binds a listener on `uri` with the collected server settings.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Invalid URIs, configuration problems and bind failures.
    pub fn server(&self, uri: &str) -> Result<SocketServer> {
        SocketServer::bind(uri, &self.server)
    }
}
