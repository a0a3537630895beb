//! Fluent builder for connectors and servers.

pub mod core;
pub mod methods;

pub use core::*;
