//! Accepting connections.
//!
//! A [`Server`] yields [`ServerEvent`]s: established connections and
//! non-fatal errors. Backpressure is simply not asking for the next event.
//!
//! - [`TcpServer`] and [`UnixServer`] accept raw sockets
//! - [`SecureServer`] completes a TLS handshake on every accepted connection
//! - [`SocketServer`] picks one of the above from a URI

pub mod secure;
pub mod socket;
pub mod tcp;
pub mod unix;

use futures::future::BoxFuture;

use crate::connect::Connection;
use crate::error::Error;

pub use secure::SecureServer;
pub use socket::SocketServer;
pub use tcp::TcpServer;
pub use unix::UnixServer;

/// What a server produces.
#[derive(Debug)]
pub enum ServerEvent {
    /// A fully established connection, encrypted for secure servers.
    Connection(Connection),
    /// A problem with one inbound connection; the server keeps running.
    Error(Error),
}

/// A listening endpoint.
pub trait Server: Send + 'static {
    /// Waits for the next event. `None` once the server is closed.
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>>;

    /// The bound address as a URI, or `None` after [`close`](Server::close).
    fn address(&self) -> Option<String>;

    /// Stops listening and releases the socket. Idempotent.
    fn close(&mut self);

    /// Whether accepted connections expose their OS socket for option changes.
    fn supports_socket_options(&self) -> bool {
        true
    }
}

impl<S: Server + ?Sized> Server for Box<S> {
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>> {
        (**self).next_event()
    }

    fn address(&self) -> Option<String> {
        (**self).address()
    }

    fn close(&mut self) {
        (**self).close();
    }

    fn supports_socket_options(&self) -> bool {
        (**self).supports_socket_options()
    }
}
