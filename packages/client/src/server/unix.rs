//! Unix domain socket listener.

use std::path::PathBuf;

use futures::FutureExt;
use futures::future::BoxFuture;
#[cfg(unix)]
use tokio::net::UnixListener;
use tracing::debug;
#[cfg(unix)]
use tracing::{info, warn};

use super::{Server, ServerEvent};
use crate::error::{self, Result};

/// Accepts connections on a filesystem socket path.
///
/// The socket file is left in place on close, matching the OS default.
#[derive(Debug)]
pub struct UnixServer {
    #[cfg(unix)]
    listener: Option<UnixListener>,
    path: PathBuf,
    open: bool,
}

impl UnixServer {
    /// Binds `path`, given as `unix:///path` or a plain path.
    ///
    /// # Errors
    ///
    /// An empty path or foreign scheme is an invalid-URI error; an existing
    /// socket file or missing directory is a listen error.
    pub fn bind(path: &str) -> Result<Self> {
        let uri = if path.contains("://") {
            path.to_owned()
        } else {
            format!("unix://{path}")
        };
        let path = match uri.strip_prefix("unix://") {
            Some(path) if !path.is_empty() => PathBuf::from(path),
            _ => return Err(error::invalid_uri(&uri)),
        };

        #[cfg(unix)]
        {
            let listener = UnixListener::bind(&path).map_err(|e| {
                error::listen(&format!("unix://{}", path.display()), e)
            })?;
            info!("listening on unix://{}", path.display());
            Ok(UnixServer {
                listener: Some(listener),
                path,
                open: true,
            })
        }

        #[cfg(not(unix))]
        {
            debug!("unix domain socket {} requested on a platform without support", path.display());
            Err(error::configuration(
                "Unix domain sockets are not supported on this platform",
            ))
        }
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    #[cfg(unix)]
    async fn accept(&mut self) -> Option<ServerEvent> {
        let listener = self.listener.as_ref()?;
        let event = match listener.accept().await {
            Ok((stream, _)) => {
                debug!("accepted connection on unix://{}", self.path.display());
                ServerEvent::Connection(crate::connect::Connection::from_unix(stream))
            }
            Err(e) => {
                warn!("accept on unix://{} failed: {e}", self.path.display());
                ServerEvent::Error(error::accept(e))
            }
        };
        Some(event)
    }

    #[cfg(not(unix))]
    async fn accept(&mut self) -> Option<ServerEvent> {
        None
    }
}

impl Server for UnixServer {
    fn next_event(&mut self) -> BoxFuture<'_, Option<ServerEvent>> {
        self.accept().boxed()
    }

    fn address(&self) -> Option<String> {
        self.open.then(|| format!("unix://{}", self.path.display()))
    }

    fn close(&mut self) {
        #[cfg(unix)]
        {
            self.listener = None;
        }
        if self.open {
            self.open = false;
            debug!("closed listener on unix://{}", self.path.display());
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio::net::UnixStream;

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sockline-{}-{name}.sock", std::process::id()))
    }

    #[tokio::test]
    async fn accepts_unix_connections() {
        let path = socket_path("accept");
        let _ = std::fs::remove_file(&path);
        let mut server = UnixServer::bind(path.to_str().unwrap()).unwrap();
        assert_eq!(server.address(), Some(format!("unix://{}", path.display())));

        let _client = UnixStream::connect(&path).await.unwrap();
        assert!(matches!(server.next_event().await, Some(ServerEvent::Connection(_))));

        server.close();
        assert!(server.next_event().await.is_none());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn existing_socket_file_fails() {
        let path = socket_path("busy");
        let _ = std::fs::remove_file(&path);
        let _first = UnixServer::bind(path.to_str().unwrap()).unwrap();
        let err = UnixServer::bind(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to listen on \"unix://"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_path_is_invalid() {
        assert!(UnixServer::bind("unix://").unwrap_err().is_invalid_uri());
    }
}
