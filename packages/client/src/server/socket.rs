//! Facade listener that picks the server from the URI scheme.

use futures::future::BoxFuture;

use super::{SecureServer, Server, ServerEvent, TcpServer, UnixServer};
use crate::config::{ConfigurationValidator, ServerConfig};
use crate::error::{self, Result};

/// Listens on `tcp://`, `tls://` or `unix://` URIs.
///
/// ```no_run
/// # async fn run() -> sockline_client::Result<()> {
/// use sockline_client::config::ServerConfig;
/// use sockline_client::server::{Server, ServerEvent, SocketServer};
///
/// let mut server = SocketServer::bind("127.0.0.1:8080", &ServerConfig::default())?;
/// while let Some(event) = server.next_event().await {
///     if let ServerEvent::Connection(connection) = event {
///         println!("connection from {:?}", connection.remote_address());
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SocketServer {
    inner: Inner,
}

#[derive(Debug)]
enum Inner {
    Tcp(TcpServer),
    Secure(SecureServer),
    Unix(UnixServer),
}

impl SocketServer {
    /// Binds `uri`. A URI without a scheme is TCP; a bare port is rejected
    /// because the interface would be ambiguous here.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Invalid URIs, configuration problems and bind failures.
    pub fn bind(uri: &str, config: &ServerConfig) -> Result<Self> {
        config.validate()?;

        let (scheme, rest) = match uri.find("://") {
            Some(index) => (&uri[..index], &uri[index + 3..]),
            None => ("tcp", uri),
        };
        if scheme == "unix" {
            return Ok(SocketServer {
                inner: Inner::Unix(UnixServer::bind(uri)?),
            });
        }
        if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
            return Err(error::invalid_uri(uri));
        }

        let inner = match scheme {
            "tcp" => Inner::Tcp(TcpServer::bind(uri, &config.tcp)?),
            "tls" => {
                config.validate_tls()?;
                let tcp = TcpServer::bind(rest, &config.tcp)?;
                Inner::Secure(SecureServer::new(tcp, &config.tls)?)
            }
            _ => return Err(error::invalid_uri(uri)),
        };
        Ok(SocketServer { inner })
    }

    fn server(&mut self) -> &mut dyn Server {
        match &mut self.inner {
            Inner::Tcp(server) => server,
            Inner::Secure(server) => server,
            Inner::Unix(server) => server,
        }
    }
}

impl Server for SocketServer {
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>> {
        self.server().next_event()
    }

    fn address(&self) -> Option<String> {
        match &self.inner {
            Inner::Tcp(server) => server.address(),
            Inner::Secure(server) => server.address(),
            Inner::Unix(server) => server.address(),
        }
    }

    fn close(&mut self) {
        self.server().close();
    }

    fn supports_socket_options(&self) -> bool {
        match &self.inner {
            Inner::Tcp(server) => server.supports_socket_options(),
            Inner::Secure(server) => server.supports_socket_options(),
            Inner::Unix(server) => server.supports_socket_options(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dispatches_on_scheme() {
        let server = SocketServer::bind("127.0.0.1:0", &ServerConfig::default()).unwrap();
        assert!(server.address().unwrap().starts_with("tcp://127.0.0.1:"));

        let err = SocketServer::bind("udp://127.0.0.1:0", &ServerConfig::default()).unwrap_err();
        assert!(err.is_invalid_uri());
    }

    #[tokio::test]
    async fn bare_port_is_ambiguous() {
        assert!(SocketServer::bind("8080", &ServerConfig::default()).unwrap_err().is_invalid_uri());
        assert!(SocketServer::bind("tcp://8080", &ServerConfig::default()).unwrap_err().is_invalid_uri());
    }

    #[tokio::test]
    async fn tls_requires_certificate() {
        let err = SocketServer::bind("tls://127.0.0.1:0", &ServerConfig::default()).unwrap_err();
        assert!(err.is_configuration());
    }
}
