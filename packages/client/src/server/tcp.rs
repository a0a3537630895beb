//! Plain TCP listener.

use std::net::SocketAddr;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use super::{Server, ServerEvent};
use crate::config::TcpListenConfig;
use crate::connect::Connection;
use crate::connect::tcp::listener;
use crate::endpoint::Endpoint;
use crate::error::{self, Result};

/// Accepts TCP connections on a literal IP address.
#[derive(Debug)]
pub struct TcpServer {
    listener: Option<TcpListener>,
    local: SocketAddr,
    nodelay: bool,
}

impl TcpServer {
    /// Binds `uri`, which may be `tcp://ip:port`, `ip:port` or a bare port
    /// (bound on `127.0.0.1`). Port `0` picks a random free port.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Host names and missing ports are invalid-URI errors; bind failures
    /// report the OS error.
    pub fn bind(uri: &str, config: &TcpListenConfig) -> Result<Self> {
        let uri = if !uri.is_empty() && uri.bytes().all(|b| b.is_ascii_digit()) {
            format!("127.0.0.1:{uri}")
        } else {
            uri.to_owned()
        };
        let endpoint = Endpoint::parse(&uri)?;
        if endpoint.scheme() != "tcp" {
            return Err(error::invalid_uri(&uri));
        }
        let Some(ip) = endpoint.ip() else {
            return Err(error::invalid_host_ip(&uri));
        };
        let Some(port) = endpoint.port() else {
            return Err(error::missing_port(&uri));
        };

        let addr = SocketAddr::new(ip, port);
        let listener = listener(addr, config).map_err(|e| error::listen(&uri, e))?;
        let local = listener.local_addr().map_err(|e| error::listen(&uri, e))?;
        info!("listening on tcp://{local}");

        Ok(TcpServer {
            listener: Some(listener),
            local,
            nodelay: config.nodelay,
        })
    }

    /// The bound socket address, also after close.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    async fn accept(&mut self) -> Option<ServerEvent> {
        let listener = self.listener.as_ref()?;
        let event = match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("accepted tcp://{peer} on tcp://{}", self.local);
                if let Err(e) = stream.set_nodelay(self.nodelay) {
                    warn!("unable to set TCP_NODELAY for {peer}: {e}");
                }
                ServerEvent::Connection(Connection::from_tcp(stream))
            }
            Err(e) => {
                warn!("accept on tcp://{} failed: {e}", self.local);
                ServerEvent::Error(error::accept(e))
            }
        };
        Some(event)
    }
}

impl Server for TcpServer {
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>> {
        self.accept().boxed()
    }

    fn address(&self) -> Option<String> {
        self.listener.as_ref().map(|_| format!("tcp://{}", self.local))
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            debug!("closed listener on tcp://{}", self.local);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn bare_port_binds_loopback() {
        let server = TcpServer::bind("0", &TcpListenConfig::default()).unwrap();
        assert_eq!(server.local_addr().ip().to_string(), "127.0.0.1");
        assert!(server.address().unwrap().starts_with("tcp://127.0.0.1:"));
    }

    #[tokio::test]
    async fn host_names_are_rejected() {
        let err = TcpServer::bind("localhost:0", &TcpListenConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Given URI \"localhost:0\" does not contain a valid host IP (EINVAL)"
        );
        let err = TcpServer::bind("127.0.0.1", &TcpListenConfig::default()).unwrap_err();
        assert!(err.is_invalid_uri());
    }

    #[tokio::test]
    async fn accepts_and_closes() {
        let mut server = TcpServer::bind("127.0.0.1:0", &TcpListenConfig::default()).unwrap();
        let addr = server.local_addr();
        let _client = TcpStream::connect(addr).await.unwrap();

        match server.next_event().await {
            Some(ServerEvent::Connection(connection)) => {
                assert_eq!(connection.local_address(), Some(format!("tcp://{addr}")));
                assert!(connection.tcp_stream().unwrap().nodelay().unwrap());
            }
            other => panic!("unexpected event {other:?}"),
        }

        server.close();
        assert!(server.address().is_none());
        assert!(server.next_event().await.is_none());
    }

    #[tokio::test]
    async fn port_in_use_reports_listen_error() {
        let first = TcpServer::bind("127.0.0.1:0", &TcpListenConfig::default()).unwrap();
        let uri = format!("127.0.0.1:{}", first.local_addr().port());
        let err = TcpServer::bind(&uri, &TcpListenConfig::default().with_reuse_address(false))
            .unwrap_err();
        assert!(err.to_string().starts_with(&format!("Failed to listen on \"{uri}\"")));
    }
}
