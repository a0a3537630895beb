//! Sockline prelude
//!
//! The types most callers need to connect, accept and handle errors.

pub use crate::config::{
    ConnectorConfig, DnsSetting, PemSource, SchemeSetting, ServerConfig, TcpConfig,
    TcpListenConfig, TlsContextOptions,
};
pub use crate::connect::{
    CancelHandle, Connect, Connecting, Connection, Connector, OpportunisticTlsConnection,
};
pub use crate::dns::{Resolve, StaticResolver};
pub use crate::endpoint::Endpoint;
pub use crate::error::{CancelPhase, Error, ErrorCode, Kind, Result};
pub use crate::server::{SecureServer, Server, ServerEvent, SocketServer, TcpServer, UnixServer};
pub use crate::tls::StreamEncryption;
