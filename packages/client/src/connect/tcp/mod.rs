//! TCP connector for literal `ip:port` endpoints.
//!
//! Host names are rejected synchronously; resolve them first with the DNS
//! decorator or the Happy-Eyeballs builder.

pub mod socket_config;

use std::net::SocketAddr;

use tracing::debug;

use crate::config::TcpConfig;
use crate::connect::{Connect, Connecting, Connection, Progress};
use crate::endpoint::Endpoint;
use crate::error::{self, CancelPhase};

pub use socket_config::{listener, outbound_socket};

/// Connects plain TCP sockets to literal IP addresses.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: TcpConfig,
}

impl TcpConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(config: TcpConfig) -> Self {
        TcpConnector { config }
    }
}

impl Connect for TcpConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let uri = if uri.contains("://") {
            uri.to_owned()
        } else {
            format!("tcp://{uri}")
        };

        let endpoint = match Endpoint::parse(&uri) {
            Ok(endpoint) if endpoint.scheme() == "tcp" => endpoint,
            _ => return Connecting::rejected(&uri, error::invalid_uri(&uri)),
        };
        let Some(ip) = endpoint.ip() else {
            return Connecting::rejected(&uri, error::invalid_host_ip(&uri));
        };
        let Some(port) = endpoint.port() else {
            return Connecting::rejected(&uri, error::missing_port(&uri));
        };

        let addr = SocketAddr::new(ip, port);
        let config = self.config.clone();
        let target = uri.clone();
        Connecting::new(&uri, Progress::new(CancelPhase::TcpHandshake), async move {
            debug!("connecting to {addr}");
            let socket =
                outbound_socket(addr, &config).map_err(|e| error::connect(&target, e))?;
            let stream = socket
                .connect(addr)
                .await
                .map_err(|e| error::connect(&target, e))?;
            debug!("connected to {addr}");
            Ok(Connection::from_tcp(stream))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_ready_err, task};

    #[test]
    fn rejects_host_names_synchronously() {
        let mut connecting = task::spawn(TcpConnector::new().connect("example.com:80"));
        let err = assert_ready_err!(connecting.poll());
        assert_eq!(
            err.to_string(),
            "Given URI \"tcp://example.com:80\" does not contain a valid host IP (EINVAL)"
        );
    }

    #[test]
    fn rejects_other_schemes_and_missing_port() {
        let mut connecting = task::spawn(TcpConnector::new().connect("tls://127.0.0.1:443"));
        assert!(assert_ready_err!(connecting.poll()).is_invalid_uri());

        let mut connecting = task::spawn(TcpConnector::new().connect("tcp://127.0.0.1"));
        let err = assert_ready_err!(connecting.poll());
        assert!(err.to_string().contains("missing port"));
    }
}
