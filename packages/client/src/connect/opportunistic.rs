//! Plaintext connections that can be upgraded to TLS in place.
//!
//! Protocols such as STARTTLS exchange a plaintext negotiation before both
//! peers switch to TLS. [`OpportunisticTlsConnection`] carries the plaintext
//! connection through that negotiation and upgrades it on demand. The upgrade
//! is one-way: once encrypted it stays encrypted.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tracing::{debug, info};

use crate::connect::Connection;
use crate::error::{self, Result};
use crate::tls::StreamEncryption;

/// A connection whose TLS layer is enabled later, mid-stream.
pub struct OpportunisticTlsConnection {
    connection: Option<Connection>,
    encryption: StreamEncryption,
    server_name: Option<ServerName<'static>>,
    uri: String,
}

impl OpportunisticTlsConnection {
    /// Wraps an outbound plaintext connection.
    ///
    /// `uri` names the target in error messages; `server_name` is verified
    /// during the upgrade.
    pub fn client(
        connection: Connection,
        encryption: StreamEncryption,
        server_name: Option<ServerName<'static>>,
        uri: impl Into<String>,
    ) -> Self {
        OpportunisticTlsConnection {
            connection: Some(connection),
            encryption,
            server_name,
            uri: uri.into(),
        }
    }

    /// Wraps an accepted plaintext connection; the upgrade runs as TLS server.
    pub fn server(connection: Connection, encryption: StreamEncryption) -> Self {
        let uri = connection.remote_address().unwrap_or_default();
        OpportunisticTlsConnection {
            connection: Some(connection),
            encryption,
            server_name: None,
            uri,
        }
    }

    /// Runs the TLS handshake on the wrapped connection.
    ///
    /// Bytes already written or read stay plaintext; everything after a
    /// successful return is encrypted. Calling this on an encrypted connection
    /// does nothing.
    ///
    /// # Errors
    ///
    /// A failed handshake closes the connection and returns a handshake error
    /// naming the target. Later reads and writes fail with `NotConnected`.
    pub async fn enable_encryption(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            return Err(error::handshake(&self.uri, "connection is closed"));
        };
        if connection.is_encrypted() {
            self.connection = Some(connection);
            return Ok(());
        }

        debug!("upgrading connection to {} to TLS", self.uri);
        match self.encryption.enable(connection, self.server_name.clone()).await {
            Ok(connection) => {
                info!("connection to {} upgraded to TLS", self.uri);
                self.connection = Some(connection);
                Ok(())
            }
            Err(failure) => {
                let message = failure.close().await;
                Err(error::handshake(&self.uri, message))
            }
        }
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_encrypted)
    }

    /// The remote address; the scheme flips to `tls://` after the upgrade.
    #[must_use]
    pub fn remote_address(&self) -> Option<String> {
        self.connection.as_ref().and_then(Connection::remote_address)
    }

    #[must_use]
    pub fn local_address(&self) -> Option<String> {
        self.connection.as_ref().and_then(Connection::local_address)
    }

    /// The target this connection was opened for.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The wrapped connection, unless a failed upgrade closed it.
    #[must_use]
    pub fn into_inner(self) -> Option<Connection> {
        self.connection
    }

    fn connection_mut(&mut self) -> io::Result<&mut Connection> {
        self.connection
            .as_mut()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotConnected))
    }
}

impl std::fmt::Debug for OpportunisticTlsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpportunisticTlsConnection")
            .field("uri", &self.uri)
            .field("connection", &self.connection)
            .field("role", &self.encryption)
            .finish()
    }
}

impl AsyncRead for OpportunisticTlsConnection {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().connection_mut() {
            Ok(connection) => Pin::new(connection).poll_read(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

impl AsyncWrite for OpportunisticTlsConnection {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut().connection_mut() {
            Ok(connection) => Pin::new(connection).poll_write(cx, buf),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().connection_mut() {
            Ok(connection) => Pin::new(connection).poll_flush(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut().connection_mut() {
            Ok(connection) => Pin::new(connection).poll_shutdown(cx),
            Err(e) => Poll::Ready(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TlsContextOptions;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    async fn pair() -> (Connection, Connection) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).await.unwrap();
        let (server, _) = listener.accept().await.unwrap();
        (Connection::from_tcp(client), Connection::from_tcp(server))
    }

    #[tokio::test]
    async fn plaintext_before_upgrade() {
        let (client, mut server) = pair().await;
        let encryption = StreamEncryption::client_from_options(&TlsContextOptions::insecure()).unwrap();
        let mut wrapped = OpportunisticTlsConnection::client(client, encryption, None, "tcp://peer");

        wrapped.write_all(b"STARTTLS\r\n").await.unwrap();
        let mut buf = [0u8; 10];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"STARTTLS\r\n");
        assert!(!wrapped.is_encrypted());
        assert!(wrapped.remote_address().unwrap().starts_with("tcp://"));
    }

    #[tokio::test]
    async fn failed_upgrade_closes_connection() {
        let (client, server) = pair().await;
        let encryption = StreamEncryption::client_from_options(&TlsContextOptions::insecure()).unwrap();
        let mut wrapped = OpportunisticTlsConnection::client(client, encryption, None, "tcp://peer:25");
        drop(server);

        let err = wrapped.enable_encryption().await.unwrap_err();
        assert!(err.is_handshake());
        assert!(err.to_string().starts_with("Connection to tcp://peer:25 failed during TLS handshake"));

        let mut buf = [0u8; 1];
        let read = wrapped.read(&mut buf).await.unwrap_err();
        assert_eq!(read.kind(), io::ErrorKind::NotConnected);
    }
}
