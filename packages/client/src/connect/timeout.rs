//! Timeout decorator.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::connect::{Connect, Connecting};
use crate::error;

/// Bounds the total time of the inner connect.
///
/// On expiry the inner attempt is dropped, which closes anything it had
/// opened, including a socket that finished connecting in the same tick.
#[derive(Clone)]
pub struct TimeoutConnector {
    connector: Arc<dyn Connect>,
    timeout: Duration,
}

impl TimeoutConnector {
    pub fn new(connector: Arc<dyn Connect>, timeout: Duration) -> Self {
        TimeoutConnector { connector, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Connect for TimeoutConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let inner = self.connector.connect(uri);
        let progress = inner.progress();
        let timeout = self.timeout;
        let target = uri.to_owned();

        Connecting::new(uri, progress, async move {
            match tokio::time::timeout(timeout, inner).await {
                Ok(result) => result,
                Err(_) => {
                    warn!("connection to {target} timed out after {timeout:?}");
                    Err(error::timeout(&target, timeout))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{Connection, Progress};
    use crate::error::{CancelPhase, Result};

    struct Never;

    impl Connect for Never {
        fn connect(&self, uri: &str) -> Connecting {
            Connecting::new(
                uri,
                Progress::new(CancelPhase::TcpHandshake),
                futures::future::pending::<Result<Connection>>(),
            )
        }
    }

    #[tokio::test(start_paused = true)]
    async fn expires_pending_connect() {
        let connector = TimeoutConnector::new(Arc::new(Never), Duration::from_millis(250));
        let err = connector.connect("tcp://10.0.0.1:80").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Connection to tcp://10.0.0.1:80 timed out after 0.25 seconds (ETIMEDOUT)"
        );
    }

    #[tokio::test]
    async fn passes_synchronous_rejection_through() {
        let connector = TimeoutConnector::new(
            Arc::new(crate::connect::TcpConnector::new()),
            Duration::from_secs(1),
        );
        let err = connector.connect("tcp://example.com:80").await.unwrap_err();
        assert!(err.is_invalid_uri());
    }

    #[tokio::test]
    async fn cancel_reports_inner_phase() {
        let connector = TimeoutConnector::new(Arc::new(Never), Duration::from_secs(5));
        let mut connecting = connector.connect("tcp://10.0.0.1:80");
        connecting.cancel();
        let err = connecting.await.unwrap_err();
        assert_eq!(err.cancel_phase(), Some(CancelPhase::TcpHandshake));
        assert!(err.to_string().ends_with("cancelled during TCP/IP handshake (ECONNABORTED)"));
    }
}
