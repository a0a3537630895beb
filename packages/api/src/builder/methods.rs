//! Chained setters for `SocketBuilder`.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use sockline_client::config::{
    DnsSetting, SchemeSetting, TcpConfig, TcpListenConfig, TlsContextOptions,
};
use sockline_client::{Connect, Resolve};

use super::core::SocketBuilder;

impl SocketBuilder {
    /// Bounds every connect call.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.connector.timeout = Some(timeout);
        self
    }

    /// Waits indefinitely.
    #[must_use]
    pub fn no_timeout(mut self) -> Self {
        self.connector.timeout = None;
        self
    }

    /// Sends every DNS query to `ip` on port 53.
    #[must_use]
    pub fn dns_nameserver(mut self, ip: IpAddr) -> Self {
        self.connector.dns = DnsSetting::nameserver(ip);
        self
    }

    /// Sends every DNS query to `addr`.
    #[must_use]
    pub fn dns_nameserver_addr(mut self, addr: SocketAddr) -> Self {
        self.connector.dns = DnsSetting::Nameserver(addr);
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.connector.dns = DnsSetting::Custom(resolver);
        self
    }

    /// Only literal IP addresses will connect.
    #[must_use]
    pub fn disable_dns(mut self) -> Self {
        self.connector.dns = DnsSetting::Disabled;
        self
    }

    #[must_use]
    pub fn happy_eyeballs(mut self, enabled: bool) -> Self {
        self.connector.happy_eyeballs = enabled;
        self
    }

    #[must_use]
    pub fn tcp(mut self, config: TcpConfig) -> Self {
        self.connector.tcp = SchemeSetting::Enabled(config);
        self
    }

    #[must_use]
    pub fn tcp_connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector.tcp = SchemeSetting::Custom(connector);
        self
    }

    /// Client TLS options for `tls://` and opportunistic connections, and
    /// server TLS options for `tls://` listeners.
    #[must_use]
    pub fn tls(mut self, options: TlsContextOptions) -> Self {
        self.connector.tls = SchemeSetting::Enabled(options.clone());
        self.server.tls = options;
        self
    }

    #[must_use]
    pub fn tls_connector(mut self, connector: Arc<dyn Connect>) -> Self {
        self.connector.tls = SchemeSetting::Custom(connector);
        self
    }

    #[must_use]
    pub fn disable_tls(mut self) -> Self {
        self.connector.tls = SchemeSetting::Disabled;
        self
    }

    #[must_use]
    pub fn disable_unix(mut self) -> Self {
        self.connector.unix = SchemeSetting::Disabled;
        self
    }

    #[must_use]
    pub fn listen(mut self, config: TcpListenConfig) -> Self {
        self.server.tcp = config;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setters_update_configuration() {
        let builder = SocketBuilder::new()
            .timeout(Duration::from_secs(3))
            .dns_nameserver("8.8.8.8".parse().unwrap())
            .happy_eyeballs(false)
            .disable_unix();

        let config = builder.connector_config();
        assert_eq!(config.timeout, Some(Duration::from_secs(3)));
        assert!(matches!(config.dns, DnsSetting::Nameserver(addr) if addr.port() == 53));
        assert!(!config.happy_eyeballs);
        assert!(config.unix.is_disabled());
    }

    #[test]
    fn tls_options_apply_to_both_sides() {
        let builder = SocketBuilder::new().tls(TlsContextOptions::default().with_peer_name("example.com"));
        assert_eq!(builder.server_config().tls.peer_name.as_deref(), Some("example.com"));
        assert!(matches!(builder.connector_config().tls, SchemeSetting::Enabled(_)));
    }

    #[tokio::test]
    async fn connector_reports_disabled_schemes() {
        let connector = SocketBuilder::new().disable_dns().disable_unix().connector().unwrap();
        assert!(!connector.supports("unix"));
        let err = connector.connect("unix:///tmp/none.sock").await.unwrap_err();
        assert!(err.is_invalid_uri());
    }
}
