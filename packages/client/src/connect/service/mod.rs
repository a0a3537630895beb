//! The facade connector.
//!
//! Assembles one decorator chain per URI scheme from a [`ConnectorConfig`]
//! and dispatches each connect call on the scheme prefix.
//!
//! [`ConnectorConfig`]: crate::config::ConnectorConfig

pub mod core;
pub mod direct;

pub use core::Connector;
