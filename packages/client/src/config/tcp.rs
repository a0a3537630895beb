//! TCP socket options for outbound connects and listeners.

use std::net::SocketAddr;
use std::time::Duration;

use super::validation::ConfigDefaults;

/// Options applied to every outbound TCP socket before connecting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    pub nodelay: bool,
    /// Idle time before keepalive probes start; `None` leaves keepalive off.
    pub keepalive: Option<Duration>,
    /// Local address to bind before connecting.
    pub bind_to: Option<SocketAddr>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: None,
            bind_to: None,
        }
    }
}

impl TcpConfig {
    /// Set `TCP_NODELAY` on connected sockets.
    ///
    /// # Examples
    /// ```
    /// use sockline_client::config::TcpConfig;
    ///
    /// let config = TcpConfig::default().with_nodelay(false);
    /// assert!(!config.nodelay);
    /// ```
    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    /// Enable keepalive probes after `idle` without traffic.
    #[must_use]
    pub fn with_keepalive(mut self, idle: Duration) -> Self {
        self.keepalive = Some(idle);
        self
    }

    /// Bind outbound sockets to a local address.
    #[must_use]
    pub fn with_bind_to(mut self, addr: SocketAddr) -> Self {
        self.bind_to = Some(addr);
        self
    }
}

/// Options for listening TCP sockets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpListenConfig {
    pub backlog: u32,
    pub reuse_address: bool,
    /// Set `TCP_NODELAY` on accepted connections.
    pub nodelay: bool,
}

impl Default for TcpListenConfig {
    fn default() -> Self {
        Self {
            backlog: ConfigDefaults::LISTEN_BACKLOG,
            reuse_address: true,
            nodelay: true,
        }
    }
}

impl TcpListenConfig {
    #[must_use]
    pub fn with_backlog(mut self, backlog: u32) -> Self {
        self.backlog = backlog;
        self
    }

    #[must_use]
    pub fn with_reuse_address(mut self, reuse: bool) -> Self {
        self.reuse_address = reuse;
        self
    }

    #[must_use]
    pub fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}
