//! Established connections and their address metadata.
//!
//! A [`Connection`] owns the duplex byte stream, plain or TLS-wrapped, and
//! remembers the local and remote addresses captured when the socket was
//! established. Address strings are rendered with `tls://` once encryption is
//! enabled and `tcp://` or `unix://` otherwise.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use socket2::SockRef;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_rustls::TlsStream;

/// A raw transport socket before any TLS layer.
#[derive(Debug)]
pub enum PlainStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

/// The byte stream behind a [`Connection`].
#[derive(Debug)]
pub enum Stream {
    Plain(PlainStream),
    Tls(Box<TlsStream<PlainStream>>),
}

/// One end of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerAddress {
    Inet(SocketAddr),
    Unix(PathBuf),
}

impl PeerAddress {
    fn render(&self, encrypted: bool) -> String {
        match self {
            PeerAddress::Inet(addr) if encrypted => format!("tls://{addr}"),
            PeerAddress::Inet(addr) => format!("tcp://{addr}"),
            PeerAddress::Unix(path) => format!("unix://{}", path.display()),
        }
    }
}

/// A fully established duplex connection.
pub struct Connection {
    stream: Stream,
    local: Option<PeerAddress>,
    remote: Option<PeerAddress>,
}

impl Connection {
    /// Wraps a connected TCP stream.
    #[must_use]
    pub fn from_tcp(stream: TcpStream) -> Self {
        let local = stream.local_addr().ok().map(PeerAddress::Inet);
        let remote = stream.peer_addr().ok().map(PeerAddress::Inet);
        Connection {
            stream: Stream::Plain(PlainStream::Tcp(stream)),
            local,
            remote,
        }
    }

    /// Wraps a connected Unix domain stream. Unnamed ends have no address.
    #[cfg(unix)]
    #[must_use]
    pub fn from_unix(stream: UnixStream) -> Self {
        let path_of = |addr: tokio::net::unix::SocketAddr| {
            addr.as_pathname().map(|path| PeerAddress::Unix(path.to_path_buf()))
        };
        let local = stream.local_addr().ok().and_then(path_of);
        let remote = stream.peer_addr().ok().and_then(path_of);
        Connection {
            stream: Stream::Plain(PlainStream::Unix(stream)),
            local,
            remote,
        }
    }

    pub(crate) fn from_parts(
        stream: Stream,
        local: Option<PeerAddress>,
        remote: Option<PeerAddress>,
    ) -> Self {
        Connection { stream, local, remote }
    }

    pub(crate) fn into_parts(self) -> (Stream, Option<PeerAddress>, Option<PeerAddress>) {
        (self.stream, self.local, self.remote)
    }

    /// The remote end as a URI, e.g. `tls://[::1]:443`.
    #[must_use]
    pub fn remote_address(&self) -> Option<String> {
        self.remote.as_ref().map(|addr| addr.render(self.is_encrypted()))
    }

    /// The local end as a URI, e.g. `tcp://127.0.0.1:50312`.
    #[must_use]
    pub fn local_address(&self) -> Option<String> {
        self.local.as_ref().map(|addr| addr.render(self.is_encrypted()))
    }

    #[must_use]
    pub fn remote_peer(&self) -> Option<&PeerAddress> {
        self.remote.as_ref()
    }

    #[must_use]
    pub fn local_peer(&self) -> Option<&PeerAddress> {
        self.local.as_ref()
    }

    /// The remote socket address for TCP connections.
    #[must_use]
    pub fn remote_socket_addr(&self) -> Option<SocketAddr> {
        match self.remote {
            Some(PeerAddress::Inet(addr)) => Some(addr),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        matches!(self.stream, Stream::Tls(_))
    }

    #[must_use]
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    pub fn stream_mut(&mut self) -> &mut Stream {
        &mut self.stream
    }

    #[must_use]
    pub fn into_stream(self) -> Stream {
        self.stream
    }

    /// The transport socket underneath any TLS layer.
    #[must_use]
    pub fn plain_stream(&self) -> &PlainStream {
        match &self.stream {
            Stream::Plain(plain) => plain,
            Stream::Tls(tls) => match tls.as_ref() {
                TlsStream::Client(stream) => stream.get_ref().0,
                TlsStream::Server(stream) => stream.get_ref().0,
            },
        }
    }

    /// The TCP socket, when the transport is TCP.
    #[must_use]
    pub fn tcp_stream(&self) -> Option<&TcpStream> {
        match self.plain_stream() {
            PlainStream::Tcp(stream) => Some(stream),
            #[cfg(unix)]
            PlainStream::Unix(_) => None,
        }
    }

    /// A borrowed handle to the OS socket for option mutation.
    #[must_use]
    pub fn socket_ref(&self) -> SockRef<'_> {
        match self.plain_stream() {
            PlainStream::Tcp(stream) => SockRef::from(stream),
            #[cfg(unix)]
            PlainStream::Unix(stream) => SockRef::from(stream),
        }
    }

    /// Toggles `TCP_NODELAY`; a no-op on Unix domain sockets.
    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        match self.tcp_stream() {
            Some(stream) => stream.set_nodelay(nodelay),
            None => Ok(()),
        }
    }

    /// Shuts down the write side and drops the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.shutdown().await {
            tracing::trace!("shutdown before close failed: {e}");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("local", &self.local_address())
            .field("remote", &self.remote_address())
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl AsyncRead for PlainStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            PlainStream::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(unix)]
            PlainStream::Unix(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for PlainStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        match self.get_mut() {
            PlainStream::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(unix)]
            PlainStream::Unix(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            PlainStream::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(unix)]
            PlainStream::Unix(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            PlainStream::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(unix)]
            PlainStream::Unix(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

impl AsyncRead for Stream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_read(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Stream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_write(cx, buf),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_flush(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        match self.get_mut() {
            Stream::Plain(stream) => Pin::new(stream).poll_shutdown(cx),
            Stream::Tls(stream) => Pin::new(stream.as_mut()).poll_shutdown(cx),
        }
    }
}

impl AsyncRead for Connection {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.stream).poll_read(cx, buf)
    }
}

impl AsyncWrite for Connection {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        Pin::new(&mut self.stream).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.stream).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), io::Error>> {
        Pin::new(&mut self.stream).poll_shutdown(cx)
    }
}
