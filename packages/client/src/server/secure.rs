//! TLS listener decorator.
//!
//! A driver task pulls raw connections from the inner server and runs each
//! TLS handshake in its own task, so a slow peer never holds up the others.
//! Only completed handshakes reach the application; failures are reported as
//! [`ServerEvent::Error`] after the raw socket has been closed.

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use super::{Server, ServerEvent};
use crate::config::{ConfigurationError, TlsContextOptions};
use crate::connect::Connection;
use crate::error::{self, Result};
use crate::tls::StreamEncryption;

const EVENT_BUFFER: usize = 64;

/// Wraps a server so that every accepted connection is TLS-encrypted.
pub struct SecureServer {
    events: mpsc::Receiver<ServerEvent>,
    driver: Option<JoinHandle<()>>,
    address: Option<String>,
}

impl SecureServer {
    /// Starts serving TLS on top of `inner`. `options.local_cert` is required.
    ///
    /// Must be called within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `inner` cannot expose its sockets or
    /// the certificate cannot be loaded.
    pub fn new<S: Server>(inner: S, options: &TlsContextOptions) -> Result<Self> {
        if !inner.supports_socket_options() {
            return Err(error::configuration(ConfigurationError::InvalidParameter(
                "secure servers require an inner server that exposes its sockets".to_owned(),
            )));
        }
        let encryption = StreamEncryption::server_from_options(options)?;
        Ok(Self::with_encryption(inner, encryption))
    }

    /// Starts serving TLS with a prebuilt server toggle.
    pub fn with_encryption<S: Server>(inner: S, encryption: StreamEncryption) -> Self {
        let address = inner
            .address()
            .map(|address| address.replacen("tcp://", "tls://", 1));
        if let Some(address) = &address {
            info!("serving TLS on {address}");
        }
        let (sender, events) = mpsc::channel(EVENT_BUFFER);
        let driver = tokio::spawn(drive(inner, encryption, sender));
        SecureServer {
            events,
            driver: Some(driver),
            address,
        }
    }
}

async fn drive<S: Server>(mut inner: S, encryption: StreamEncryption, events: mpsc::Sender<ServerEvent>) {
    let mut handshakes = JoinSet::new();
    loop {
        tokio::select! {
            event = inner.next_event() => match event {
                Some(ServerEvent::Connection(connection)) => {
                    handshakes.spawn(handshake(connection, encryption.clone(), events.clone()));
                }
                Some(ServerEvent::Error(e)) => {
                    if events.send(ServerEvent::Error(e)).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            Some(finished) = handshakes.join_next(), if !handshakes.is_empty() => {
                if let Err(e) = finished {
                    warn!("TLS handshake task failed: {e}");
                }
            }
            () = events.closed() => break,
        }
    }
    inner.close();
    while handshakes.join_next().await.is_some() {}
}

async fn handshake(connection: Connection, encryption: StreamEncryption, events: mpsc::Sender<ServerEvent>) {
    let remote = connection.remote_address().unwrap_or_default();
    let event = match encryption.enable(connection, None).await {
        Ok(connection) => {
            debug!("TLS handshake with {remote} complete");
            ServerEvent::Connection(connection)
        }
        Err(failure) => {
            let message = failure.close().await;
            debug!("TLS handshake with {remote} failed: {message}");
            ServerEvent::Error(error::handshake_from(&remote, message))
        }
    };
    if events.send(event).await.is_err() {
        debug!("secure server closed before {remote} could be delivered");
    }
}

impl Server for SecureServer {
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>> {
        self.events.recv().boxed()
    }

    fn address(&self) -> Option<String> {
        self.address.clone()
    }

    fn close(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
            debug!("secure server closed");
        }
        self.events.close();
        self.address = None;
    }
}

impl Drop for SecureServer {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl std::fmt::Debug for SecureServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureServer")
            .field("address", &self.address)
            .field("running", &self.driver.is_some())
            .finish()
    }
}
