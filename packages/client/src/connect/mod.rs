//! Connection establishment
//!
//! Every connector implements [`Connect`] and returns a cancellable
//! [`Connecting`] future. Connectors compose as decorators:
//!
//! - [`TcpConnector`] and [`UnixConnector`] open raw sockets
//! - [`DnsConnector`] and [`HappyEyeballsConnector`] resolve host names
//! - [`SecureConnector`] completes a TLS handshake on top
//! - [`TimeoutConnector`] bounds the whole call
//! - [`Connector`] dispatches on the URI scheme

pub mod dns;
pub mod happy_eyeballs;
pub mod opportunistic;
pub mod secure;
pub mod service;
pub mod tcp;
pub mod timeout;
pub mod types;
pub mod unix;

pub use dns::DnsConnector;
pub use happy_eyeballs::HappyEyeballsConnector;
pub use opportunistic::OpportunisticTlsConnection;
pub use secure::SecureConnector;
pub use service::Connector;
pub use service::core::OPPORTUNISTIC_SCHEME;
pub use tcp::TcpConnector;
pub use timeout::TimeoutConnector;
pub use types::{
    CancelHandle, Connect, Connecting, Connection, PeerAddress, PlainStream, Progress, Stream,
};
pub use unix::UnixConnector;
