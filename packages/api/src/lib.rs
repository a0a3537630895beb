//! Sockline public API
//!
//! Connect to `tcp://`, `tls://` and `unix://` URIs, race IPv6 and IPv4 per
//! RFC 8305, upgrade plaintext connections to TLS in place, and accept
//! connections on the same schemes.
//!
//! ```no_run
//! use tokio::io::AsyncWriteExt;
//!
//! # async fn run() -> sockline::Result<()> {
//! let mut connection = sockline::connect("example.com:80").await?;
//! connection.write_all(b"HEAD / HTTP/1.0\r\n\r\n").await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod builder;

pub use builder::SocketBuilder;

pub use sockline_client::prelude::*;
pub use sockline_client::connect::{
    DnsConnector, HappyEyeballsConnector, SecureConnector, TcpConnector, TimeoutConnector,
    UnixConnector,
};
pub use sockline_client::{config, dns, error, server, tls};
pub use sockline_client::{connect, global_connector, init_global_connector};
