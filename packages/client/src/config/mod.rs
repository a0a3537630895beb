//! Configuration for connectors and servers.
//!
//! Plain structs with `Default` impls and consuming `with_*` builders, checked
//! by [`ConfigurationValidator`] before anything is assembled.

pub mod connector;
pub mod server;
pub mod tcp;
pub mod tls;
pub mod validation;

pub use connector::{ConnectorConfig, DnsSetting, SchemeSetting};
pub use server::ServerConfig;
pub use tcp::{TcpConfig, TcpListenConfig};
pub use tls::{PemSource, TlsContextOptions};
pub use validation::{
    ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, ConfigurationValidator,
};
