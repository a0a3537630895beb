//! TCP socket configuration utilities
//!
//! Applies `TcpConfig` / `TcpListenConfig` options to sockets before they
//! connect or listen, through tokio's `TcpSocket` and `socket2` for the
//! options tokio does not expose.

use std::io;
use std::net::SocketAddr;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::{TcpListener, TcpSocket};

use crate::config::{TcpConfig, TcpListenConfig};

/// Creates an unconnected socket for `addr` with the configured options applied.
pub fn outbound_socket(addr: SocketAddr, config: &TcpConfig) -> io::Result<TcpSocket> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_nodelay(config.nodelay)?;

    if let Some(idle) = config.keepalive {
        let keepalive = TcpKeepalive::new().with_time(idle);
        SockRef::from(&socket).set_tcp_keepalive(&keepalive)?;
        tracing::trace!("TCP keepalive after {idle:?} idle for {addr}");
    }

    if let Some(local) = config.bind_to {
        socket.bind(local)?;
    }

    Ok(socket)
}

/// Binds and listens on `addr`.
pub fn listener(addr: SocketAddr, config: &TcpListenConfig) -> io::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(config.reuse_address)?;
    socket.bind(addr)?;
    socket.listen(config.backlog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn applies_keepalive_and_nodelay() {
        let config = TcpConfig::default().with_keepalive(Duration::from_secs(30));
        let socket = outbound_socket("127.0.0.1:80".parse().unwrap(), &config).unwrap();
        assert!(socket.nodelay().unwrap());
        assert!(socket.keepalive().unwrap());
    }

    #[tokio::test]
    async fn listener_binds_ephemeral_port() {
        let listener = listener("127.0.0.1:0".parse().unwrap(), &TcpListenConfig::default()).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }
}
