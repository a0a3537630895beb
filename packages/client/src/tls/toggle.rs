//! Switching TLS on and off on an established connection.
//!
//! [`StreamEncryption::enable`] returns an [`EncryptionSession`], an explicit
//! `Idle → Negotiating → Settled` state machine over tokio-rustls' fallible
//! handshake. The session takes the connection by value, so nothing else can
//! read from the socket while handshake records are in flight. On failure the
//! raw stream comes back inside [`HandshakeFailure`] so callers can close it
//! or report on it.
//!
//! [`StreamEncryption::disable`] is best-effort: it exchanges `close_notify`
//! alerts and hands back the transport. A peer that sends application data
//! during the downgrade fails it, but a peer that simply closes is
//! indistinguishable from a clean downgrade.

use std::fmt;
use std::future::Future;
use std::io;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_rustls::{FallibleAccept, FallibleConnect, TlsAcceptor, TlsConnector, TlsStream};

use super::context;
use super::errors::TlsError;
use crate::config::TlsContextOptions;
use crate::connect::{Connection, PeerAddress, PlainStream, Stream};

#[derive(Clone)]
enum Role {
    Client(Arc<ClientConfig>),
    Server(Arc<ServerConfig>),
}

/// Enables or disables TLS on connections, as a client or as a server.
#[derive(Clone)]
pub struct StreamEncryption {
    role: Role,
}

impl StreamEncryption {
    #[must_use]
    pub fn client(config: Arc<ClientConfig>) -> Self {
        StreamEncryption {
            role: Role::Client(config),
        }
    }

    #[must_use]
    pub fn server(config: Arc<ServerConfig>) -> Self {
        StreamEncryption {
            role: Role::Server(config),
        }
    }

    /// Client-side toggle built from context options.
    ///
    /// # Errors
    ///
    /// Returns `TlsError` if the options cannot be compiled.
    pub fn client_from_options(options: &TlsContextOptions) -> Result<Self, TlsError> {
        Ok(Self::client(Arc::new(context::client_config(options)?)))
    }

    /// Server-side toggle built from context options.
    ///
    /// # Errors
    ///
    /// Returns `TlsError` if the certificate or key cannot be loaded.
    pub fn server_from_options(options: &TlsContextOptions) -> Result<Self, TlsError> {
        Ok(Self::server(Arc::new(context::server_config(options)?)))
    }

    #[must_use]
    pub fn is_server(&self) -> bool {
        matches!(self.role, Role::Server(_))
    }

    /// Starts a TLS handshake on `connection`.
    ///
    /// Clients verify and announce `server_name`, falling back to the peer IP.
    /// Servers ignore it.
    pub fn enable(
        &self,
        connection: Connection,
        server_name: Option<ServerName<'static>>,
    ) -> EncryptionSession {
        EncryptionSession {
            state: SessionState::Idle {
                connection,
                role: self.role.clone(),
                server_name,
            },
        }
    }

    /// Shuts TLS down and returns the plaintext connection.
    ///
    /// Sends `close_notify`, then reads until the peer's `close_notify`.
    /// Plaintext connections are returned unchanged.
    ///
    /// # Errors
    ///
    /// Fails if the alert cannot be written, the read fails, or the peer sends
    /// application data before closing its side.
    pub async fn disable(&self, connection: Connection) -> Result<Connection, HandshakeFailure> {
        let (stream, local, remote) = connection.into_parts();
        let mut tls = match stream {
            Stream::Tls(tls) => tls,
            plain @ Stream::Plain(_) => return Ok(Connection::from_parts(plain, local, remote)),
        };

        tracing::debug!("disabling TLS on connection to {remote:?}");
        match tls.as_mut() {
            TlsStream::Client(stream) => stream.get_mut().1.send_close_notify(),
            TlsStream::Server(stream) => stream.get_mut().1.send_close_notify(),
        }
        if let Err(e) = tls.flush().await {
            return Err(HandshakeFailure::new(
                format!("Unable to send TLS close_notify: {e}"),
                None,
            ));
        }

        let mut scratch = [0u8; 512];
        loop {
            match tls.read(&mut scratch).await {
                Ok(0) => break,
                Ok(n) => {
                    return Err(HandshakeFailure::new(
                        format!("Received {n} bytes of application data while disabling TLS"),
                        None,
                    ));
                }
                Err(e) => {
                    return Err(HandshakeFailure::new(
                        format!("Unable to complete TLS shutdown: {e}"),
                        None,
                    ));
                }
            }
        }

        let plain = match *tls {
            TlsStream::Client(stream) => stream.into_inner().0,
            TlsStream::Server(stream) => stream.into_inner().0,
        };
        tracing::debug!("TLS disabled on connection to {remote:?}");
        Ok(Connection::from_parts(Stream::Plain(plain), local, remote))
    }
}

impl fmt::Debug for StreamEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = if self.is_server() { "server" } else { "client" };
        f.debug_struct("StreamEncryption").field("role", &role).finish()
    }
}

/// A TLS handshake that did not complete.
pub struct HandshakeFailure {
    message: String,
    connection: Option<Connection>,
}

impl HandshakeFailure {
    fn new(message: String, connection: Option<Connection>) -> Self {
        HandshakeFailure { message, connection }
    }

    /// The low-level TLS error text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The raw connection, when it could be recovered.
    #[must_use]
    pub fn into_connection(self) -> Option<Connection> {
        self.connection
    }

    /// Closes the recovered connection, if any, and returns the message.
    pub async fn close(self) -> String {
        if let Some(connection) = self.connection {
            connection.close().await;
        }
        self.message
    }
}

impl fmt::Debug for HandshakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandshakeFailure")
            .field("message", &self.message)
            .field("connection", &self.connection)
            .finish()
    }
}

impl fmt::Display for HandshakeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandshakeFailure {}

enum Handshake {
    Client(FallibleConnect<PlainStream>),
    Server(FallibleAccept<PlainStream>),
}

enum SessionState {
    Idle {
        connection: Connection,
        role: Role,
        server_name: Option<ServerName<'static>>,
    },
    Negotiating {
        handshake: Handshake,
        local: Option<PeerAddress>,
        remote: Option<PeerAddress>,
    },
    Settled,
}

/// A pending TLS handshake. Dropping it closes the socket.
#[must_use = "futures do nothing unless polled"]
pub struct EncryptionSession {
    state: SessionState,
}

impl EncryptionSession {
    /// Whether the handshake has started exchanging records.
    #[must_use]
    pub fn is_negotiating(&self) -> bool {
        matches!(self.state, SessionState::Negotiating { .. })
    }
}

impl Future for EncryptionSession {
    type Output = Result<Connection, HandshakeFailure>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match mem::replace(&mut this.state, SessionState::Settled) {
                SessionState::Idle {
                    connection,
                    role,
                    server_name,
                } => {
                    let (stream, local, remote) = connection.into_parts();
                    let plain = match stream {
                        Stream::Plain(plain) => plain,
                        tls @ Stream::Tls(_) => {
                            return Poll::Ready(Err(HandshakeFailure::new(
                                "Connection is already encrypted".to_owned(),
                                Some(Connection::from_parts(tls, local, remote)),
                            )));
                        }
                    };

                    let handshake = match role {
                        Role::Client(config) => {
                            let name = server_name.or_else(|| match &remote {
                                Some(PeerAddress::Inet(addr)) => {
                                    Some(ServerName::IpAddress(addr.ip().into()))
                                }
                                _ => None,
                            });
                            let Some(name) = name else {
                                return Poll::Ready(Err(HandshakeFailure::new(
                                    "No peer name available for TLS verification".to_owned(),
                                    Some(Connection::from_parts(Stream::Plain(plain), local, remote)),
                                )));
                            };
                            tracing::debug!("starting TLS client handshake with {name:?}");
                            Handshake::Client(TlsConnector::from(config).connect(name, plain).into_fallible())
                        }
                        Role::Server(config) => {
                            tracing::debug!("starting TLS server handshake with {remote:?}");
                            Handshake::Server(TlsAcceptor::from(config).accept(plain).into_fallible())
                        }
                    };
                    this.state = SessionState::Negotiating {
                        handshake,
                        local,
                        remote,
                    };
                }
                SessionState::Negotiating {
                    mut handshake,
                    local,
                    remote,
                } => {
                    let outcome: Poll<Result<TlsStream<PlainStream>, (io::Error, PlainStream)>> =
                        match &mut handshake {
                            Handshake::Client(pending) => {
                                Pin::new(pending).poll(cx).map(|r| r.map(TlsStream::from))
                            }
                            Handshake::Server(pending) => {
                                Pin::new(pending).poll(cx).map(|r| r.map(TlsStream::from))
                            }
                        };

                    return match outcome {
                        Poll::Pending => {
                            this.state = SessionState::Negotiating {
                                handshake,
                                local,
                                remote,
                            };
                            Poll::Pending
                        }
                        Poll::Ready(Ok(tls)) => {
                            tracing::debug!("TLS handshake with {remote:?} complete");
                            Poll::Ready(Ok(Connection::from_parts(
                                Stream::Tls(Box::new(tls)),
                                local,
                                remote,
                            )))
                        }
                        Poll::Ready(Err((err, plain))) => {
                            tracing::debug!("TLS handshake with {remote:?} failed: {err}");
                            Poll::Ready(Err(HandshakeFailure::new(
                                err.to_string(),
                                Some(Connection::from_parts(Stream::Plain(plain), local, remote)),
                            )))
                        }
                    };
                }
                SessionState::Settled => panic!("EncryptionSession polled after completion"),
            }
        }
    }
}
