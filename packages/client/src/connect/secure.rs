//! TLS decorator: connect through the inner connector, then enable encryption.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::TlsContextOptions;
use crate::connect::{Connect, Connecting};
use crate::endpoint::Endpoint;
use crate::error::{self, CancelPhase, Result};
use crate::tls::{StreamEncryption, server_name};

/// Wraps an inner (typically TCP) connector and completes a TLS handshake
/// before handing the connection out.
///
/// Accepts `tls://host:port` or a bare `host:port`. The peer name verified is
/// `peer_name` from the options, else the `hostname` query parameter, else the
/// host itself.
#[derive(Clone)]
pub struct SecureConnector {
    connector: Arc<dyn Connect>,
    encryption: StreamEncryption,
    peer_name: Option<String>,
}

impl SecureConnector {
    /// Builds the client TLS context from `options`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the options cannot be compiled.
    pub fn new(connector: Arc<dyn Connect>, options: &TlsContextOptions) -> Result<Self> {
        let encryption = StreamEncryption::client_from_options(options)?;
        Ok(Self::with_encryption(connector, encryption, options.peer_name.clone()))
    }

    pub fn with_encryption(
        connector: Arc<dyn Connect>,
        encryption: StreamEncryption,
        peer_name: Option<String>,
    ) -> Self {
        SecureConnector {
            connector,
            encryption,
            peer_name,
        }
    }
}

impl Connect for SecureConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let uri = if uri.contains("://") {
            uri.to_owned()
        } else {
            format!("tls://{uri}")
        };

        let endpoint = match Endpoint::parse(&uri) {
            Ok(endpoint) if endpoint.scheme() == "tls" => endpoint,
            _ => return Connecting::rejected(&uri, error::invalid_uri(&uri)),
        };
        let Some(name) = self.peer_name.clone().or_else(|| endpoint.peer_name()) else {
            return Connecting::rejected(&uri, error::invalid_uri(&uri));
        };
        let name = match server_name(&name) {
            Ok(name) => name,
            Err(e) => return Connecting::rejected(&uri, error::configuration(e).with_uri(&uri)),
        };

        let inner_uri = endpoint.without_scheme().to_owned();
        let inner = self.connector.connect(&inner_uri);
        let progress = inner.progress();
        let shared = progress.clone();
        let encryption = self.encryption.clone();
        let target = uri.clone();

        Connecting::new(&uri, progress, async move {
            let connection = inner.await.map_err(|e| {
                let prefixed = format!("tcp://{inner_uri}");
                if e.message().contains(&prefixed) {
                    e.replace_uri(&prefixed, &target)
                } else {
                    e.replace_uri(&inner_uri, &target)
                }
            })?;

            shared.set(CancelPhase::TlsHandshake);
            debug!("connected to {target}, starting TLS handshake");
            match encryption.enable(connection, Some(name)).await {
                Ok(connection) => {
                    info!("TLS connection to {target} established");
                    Ok(connection)
                }
                Err(failure) => {
                    let message = failure.close().await;
                    Err(error::handshake(&target, message))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::TcpConnector;
    use tokio_test::{assert_ready_err, task};

    fn connector() -> SecureConnector {
        SecureConnector::new(Arc::new(TcpConnector::new()), &TlsContextOptions::insecure()).unwrap()
    }

    #[test]
    fn rejects_non_tls_scheme() {
        let mut connecting = task::spawn(connector().connect("tcp://127.0.0.1:443"));
        let err = assert_ready_err!(connecting.poll());
        assert_eq!(err.to_string(), "Given URI \"tcp://127.0.0.1:443\" is invalid (EINVAL)");
    }

    #[tokio::test]
    async fn inner_failure_names_tls_uri() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connector().connect(&format!("127.0.0.1:{}", addr.port())).await.unwrap_err();
        assert!(err.is_connect());
        assert!(err.to_string().starts_with(&format!("Connection to tls://{addr} failed")));
    }
}
