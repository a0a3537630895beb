//! Unix domain socket connector.

use tracing::debug;

use crate::connect::{Connect, Connecting};
use crate::error;

/// Connects to `unix:///path` endpoints. A bare path is accepted too.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixConnector;

impl UnixConnector {
    #[must_use]
    pub fn new() -> Self {
        UnixConnector
    }
}

impl Connect for UnixConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let uri = if uri.contains("://") {
            uri.to_owned()
        } else {
            format!("unix://{uri}")
        };
        let path = match uri.strip_prefix("unix://") {
            Some(path) if !path.is_empty() => path.to_owned(),
            _ => return Connecting::rejected(&uri, error::invalid_uri(&uri)),
        };

        #[cfg(unix)]
        {
            let progress = crate::connect::Progress::new(error::CancelPhase::Unspecified);
            Connecting::new(&uri, progress, async move {
                debug!("connecting to unix domain socket {path}");
                let stream = tokio::net::UnixStream::connect(&path)
                    .await
                    .map_err(|e| error::unix_connect(&path, e))?;
                Ok(crate::connect::Connection::from_unix(stream))
            })
        }

        #[cfg(not(unix))]
        {
            debug!("unix domain socket {path} requested on a platform without support");
            Connecting::rejected(
                &uri,
                error::configuration("Unix domain sockets are not supported on this platform"),
            )
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio_test::{assert_ready_err, task};

    #[test]
    fn rejects_foreign_scheme() {
        let mut connecting = task::spawn(UnixConnector::new().connect("tcp://127.0.0.1:80"));
        assert!(assert_ready_err!(connecting.poll()).is_invalid_uri());
    }

    #[tokio::test]
    async fn missing_socket_reports_path() {
        let err = UnixConnector::new()
            .connect("/nonexistent/sockline.sock")
            .await
            .unwrap_err();
        assert!(err.is_connect());
        assert!(
            err.to_string()
                .starts_with("Unable to connect to unix domain socket \"/nonexistent/sockline.sock\"")
        );
    }
}
