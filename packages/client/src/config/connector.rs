//! Connector facade configuration.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use super::tcp::TcpConfig;
use super::tls::TlsContextOptions;
use super::validation::{
    ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, ConfigurationValidator,
};
use crate::connect::Connect;
use crate::dns::Resolve;

/// How one URI scheme is served.
#[derive(Clone)]
pub enum SchemeSetting<T> {
    /// URIs with this scheme always reject.
    Disabled,
    /// Use the built-in connector with these options.
    Enabled(T),
    /// Use a caller-supplied connector.
    Custom(Arc<dyn Connect>),
}

impl<T> SchemeSetting<T> {
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        matches!(self, SchemeSetting::Disabled)
    }
}

impl<T: Default> Default for SchemeSetting<T> {
    fn default() -> Self {
        SchemeSetting::Enabled(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for SchemeSetting<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemeSetting::Disabled => f.write_str("Disabled"),
            SchemeSetting::Enabled(options) => f.debug_tuple("Enabled").field(options).finish(),
            SchemeSetting::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How host names are resolved.
#[derive(Clone, Default)]
pub enum DnsSetting {
    /// Only literal IPs connect.
    Disabled,
    /// System resolver configuration.
    #[default]
    System,
    /// A single upstream nameserver.
    Nameserver(SocketAddr),
    /// A caller-supplied resolver.
    Custom(Arc<dyn Resolve>),
}

impl DnsSetting {
    /// Upstream nameserver on the standard DNS port.
    #[must_use]
    pub fn nameserver(ip: IpAddr) -> Self {
        DnsSetting::Nameserver(SocketAddr::new(ip, ConfigDefaults::DNS_PORT))
    }
}

impl fmt::Debug for DnsSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnsSetting::Disabled => f.write_str("Disabled"),
            DnsSetting::System => f.write_str("System"),
            DnsSetting::Nameserver(addr) => f.debug_tuple("Nameserver").field(addr).finish(),
            DnsSetting::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Everything the facade `Connector` is assembled from.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub tcp: SchemeSetting<TcpConfig>,
    pub tls: SchemeSetting<TlsContextOptions>,
    pub unix: SchemeSetting<()>,
    pub dns: DnsSetting,
    /// Bound on a whole connect call, DNS and handshakes included.
    pub timeout: Option<Duration>,
    /// Race address families per RFC 8305; otherwise use the first A record.
    pub happy_eyeballs: bool,
    pub attempt_delay: Duration,
    pub resolution_delay: Duration,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            tcp: SchemeSetting::default(),
            tls: SchemeSetting::default(),
            unix: SchemeSetting::Enabled(()),
            dns: DnsSetting::default(),
            timeout: Some(ConfigDefaults::CONNECT_TIMEOUT),
            happy_eyeballs: true,
            attempt_delay: ConfigDefaults::ATTEMPT_DELAY,
            resolution_delay: ConfigDefaults::RESOLUTION_DELAY,
        }
    }
}

impl ConnectorConfig {
    /// Set how `tcp://` and bare URIs are served.
    ///
    /// # Examples
    /// ```
    /// use sockline_client::config::{ConnectorConfig, SchemeSetting, TcpConfig};
    ///
    /// let config = ConnectorConfig::default()
    ///     .with_tcp(SchemeSetting::Enabled(TcpConfig::default().with_nodelay(false)));
    /// assert!(!config.tcp.is_disabled());
    /// ```
    #[must_use]
    pub fn with_tcp(mut self, tcp: SchemeSetting<TcpConfig>) -> Self {
        self.tcp = tcp;
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: SchemeSetting<TlsContextOptions>) -> Self {
        self.tls = tls;
        self
    }

    #[must_use]
    pub fn with_unix(mut self, unix: SchemeSetting<()>) -> Self {
        self.unix = unix;
        self
    }

    #[must_use]
    pub fn with_dns(mut self, dns: DnsSetting) -> Self {
        self.dns = dns;
        self
    }

    /// Set the overall connect timeout; `None` waits indefinitely.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use sockline_client::config::ConnectorConfig;
    ///
    /// let config = ConnectorConfig::default().with_timeout(Some(Duration::from_secs(5)));
    /// assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    /// ```
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_happy_eyeballs(mut self, enabled: bool) -> Self {
        self.happy_eyeballs = enabled;
        self
    }

    /// Pacing interval between overlapping attempts.
    #[must_use]
    pub fn with_attempt_delay(mut self, delay: Duration) -> Self {
        self.attempt_delay = delay;
        self
    }

    /// How long A results wait for a pending AAAA lookup.
    #[must_use]
    pub fn with_resolution_delay(mut self, delay: Duration) -> Self {
        self.resolution_delay = delay;
        self
    }
}

impl ConfigurationValidator for ConnectorConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(timeout) = self.timeout {
            ConfigValidator::validate_timeout(timeout, "connect timeout")?;
        }
        ConfigValidator::validate_timeout(self.attempt_delay, "attempt delay")?;
        ConfigValidator::validate_timeout(self.resolution_delay, "resolution delay")?;

        if let DnsSetting::Nameserver(addr) = self.dns {
            ConfigValidator::validate_nameserver(addr)?;
        }

        Ok(())
    }
}
