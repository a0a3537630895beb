//! Connection types and the connector contract.
//!
//! - `connection`: the established duplex stream and its address metadata
//! - `connector`: the [`Connect`] trait every connector and decorator implements
//! - `connecting`: the cancellable future a connect call returns

pub mod connecting;
pub mod connection;
pub mod connector;

pub use connecting::{CancelHandle, Connecting, Progress};
pub use connection::{Connection, PeerAddress, PlainStream, Stream};
pub use connector::Connect;
