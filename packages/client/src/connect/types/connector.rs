//! The connector contract shared by base connectors and decorators.

use std::sync::Arc;

use super::connecting::Connecting;

/// Turns a destination URI into an established [`Connection`](super::Connection).
///
/// Implementations must reject malformed input synchronously: the returned
/// [`Connecting`] resolves to the error on its first poll without doing any
/// I/O. Decorators hold their inner connector as `Arc<dyn Connect>` so chains
/// can be assembled at runtime from configuration.
pub trait Connect: Send + Sync + 'static {
    /// Starts connecting to `uri`.
    fn connect(&self, uri: &str) -> Connecting;
}

impl<T: Connect + ?Sized> Connect for Arc<T> {
    fn connect(&self, uri: &str) -> Connecting {
        (**self).connect(uri)
    }
}

impl<T: Connect + ?Sized> Connect for Box<T> {
    fn connect(&self, uri: &str) -> Connecting {
        (**self).connect(uri)
    }
}
