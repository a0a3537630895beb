//! # Sockline client
//!
//! Asynchronous stream connections by URI: TCP, Unix domain sockets and TLS,
//! with dual-stack racing per RFC 8305, per-call timeouts, in-place TLS
//! upgrades and cancellation that tears down every in-flight lookup, socket
//! and handshake.
//!
//! ## Connecting
//!
//! ```no_run
//! use tokio::io::AsyncWriteExt;
//!
//! # async fn run() -> sockline_client::Result<()> {
//! let mut connection = sockline_client::connect("tls://example.com:443").await?;
//! connection.write_all(b"GET / HTTP/1.0\r\nHost: example.com\r\n\r\n").await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Accepting
//!
//! ```no_run
//! use sockline_client::config::ServerConfig;
//! use sockline_client::server::{Server, ServerEvent, SocketServer};
//!
//! # async fn run() -> sockline_client::Result<()> {
//! let mut server = SocketServer::bind("127.0.0.1:8000", &ServerConfig::default())?;
//! while let Some(ServerEvent::Connection(connection)) = server.next_event().await {
//!     println!("accepted {:?}", connection.remote_address());
//! }
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

use std::sync::{Arc, OnceLock};

pub mod config;
pub mod connect;
pub mod dns;
pub mod endpoint;
pub mod error;
pub mod server;
pub mod tls;

pub mod prelude;

pub use crate::prelude::*;

static GLOBAL_CONNECTOR: OnceLock<Result<Arc<Connector>>> = OnceLock::new();

/// The shared connector used by [`connect`], built with default settings on
/// first use.
///
/// # Errors
///
/// Returns the configuration error if the default connector could not be
/// built, for example when the platform trust store is unusable.
pub fn global_connector() -> Result<Arc<Connector>> {
    GLOBAL_CONNECTOR
        .get_or_init(|| Connector::new().map(Arc::new))
        .clone()
}

/// Installs a custom configuration for the shared connector.
///
/// Only the first initialization wins; later calls, and calls after
/// [`connect`] has already been used, are logged and ignored.
pub fn init_global_connector(config: ConnectorConfig) {
    let mut installed = false;
    GLOBAL_CONNECTOR.get_or_init(|| {
        installed = true;
        Connector::with_config(config).map(Arc::new)
    });
    if !installed {
        tracing::warn!("global connector already initialized, ignoring new configuration");
    }
}

/// Connects `uri` with the shared connector.
pub fn connect(uri: &str) -> Connecting {
    match global_connector() {
        Ok(connector) => connector.connect(uri),
        Err(e) => {
            tracing::error!("global connector unavailable: {e}");
            Connecting::rejected(uri, e)
        }
    }
}
