//! Connector assembly.
//!
//! The TCP chain is `TcpConnector`, wrapped in the Happy-Eyeballs builder (or
//! the single-address DNS decorator) unless DNS is disabled. `tls` layers the
//! secure decorator over that same chain. Both get the overall timeout;
//! `unix` does not.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::config::{
    ConfigurationValidator, ConnectorConfig, DnsSetting, SchemeSetting, TlsContextOptions,
};
use crate::connect::{
    Connect, DnsConnector, HappyEyeballsConnector, SecureConnector, TcpConnector,
    TimeoutConnector, UnixConnector,
};
use crate::dns::{HickoryResolver, Resolve};
use crate::error::Result;
use crate::tls::StreamEncryption;

/// Scheme used for plaintext connections that upgrade to TLS later.
pub const OPPORTUNISTIC_SCHEME: &str = "opportunistic+tls";

/// What `opportunistic+tls://` needs: the raw chain and a client toggle.
#[derive(Clone)]
pub(super) struct Opportunistic {
    pub(super) chain: Arc<dyn Connect>,
    pub(super) encryption: StreamEncryption,
    pub(super) peer_name: Option<String>,
}

/// Connects any supported URI through the chain registered for its scheme.
///
/// URIs without `://` are treated as `tcp`.
#[derive(Clone)]
pub struct Connector {
    pub(super) connectors: HashMap<String, Arc<dyn Connect>>,
    pub(super) opportunistic: Option<Opportunistic>,
    pub(super) timeout: Option<Duration>,
}

impl Connector {
    /// A connector with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the default TLS context cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_config(ConnectorConfig::default())
    }

    /// Validates `config` and assembles every enabled chain.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for inconsistent settings or TLS options
    /// that cannot be compiled.
    pub fn with_config(config: ConnectorConfig) -> Result<Self> {
        config.validate()?;

        let resolver = resolver(&config.dns);
        let base: Arc<dyn Connect> = match &config.tcp {
            SchemeSetting::Custom(custom) => custom.clone(),
            SchemeSetting::Enabled(tcp) => Arc::new(TcpConnector::with_config(tcp.clone())),
            SchemeSetting::Disabled => Arc::new(TcpConnector::new()),
        };
        let chain: Arc<dyn Connect> = match resolver {
            Some(resolver) if config.happy_eyeballs => Arc::new(
                HappyEyeballsConnector::new(base, resolver)
                    .with_attempt_delay(config.attempt_delay)
                    .with_resolution_delay(config.resolution_delay),
            ),
            Some(resolver) => Arc::new(DnsConnector::new(base, resolver)),
            None => base,
        };

        let bounded = |connector: Arc<dyn Connect>| -> Arc<dyn Connect> {
            match config.timeout {
                Some(timeout) => Arc::new(TimeoutConnector::new(connector, timeout)),
                None => connector,
            }
        };

        let mut connectors: HashMap<String, Arc<dyn Connect>> = HashMap::new();
        if !config.tcp.is_disabled() {
            connectors.insert("tcp".to_owned(), bounded(chain.clone()));
        }

        let mut opportunistic = None;
        match &config.tls {
            SchemeSetting::Disabled => {}
            SchemeSetting::Custom(custom) => {
                connectors.insert("tls".to_owned(), bounded(custom.clone()));
            }
            SchemeSetting::Enabled(options) => {
                let encryption = StreamEncryption::client_from_options(options)?;
                let secure = SecureConnector::with_encryption(
                    chain.clone(),
                    encryption.clone(),
                    options.peer_name.clone(),
                );
                connectors.insert("tls".to_owned(), bounded(Arc::new(secure)));
                opportunistic = Some(Opportunistic {
                    chain: bounded(chain),
                    encryption,
                    peer_name: options.peer_name.clone(),
                });
            }
        }

        match &config.unix {
            SchemeSetting::Disabled => {}
            SchemeSetting::Enabled(()) => {
                connectors.insert("unix".to_owned(), Arc::new(UnixConnector::new()));
            }
            SchemeSetting::Custom(custom) => {
                connectors.insert("unix".to_owned(), custom.clone());
            }
        }

        debug!(
            "connector assembled for schemes {:?}",
            connectors.keys().collect::<Vec<_>>()
        );
        Ok(Connector {
            connectors,
            opportunistic,
            timeout: config.timeout,
        })
    }

    /// Shorthand for a connector with TLS options and otherwise default settings.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the options cannot be compiled.
    pub fn with_tls(options: TlsContextOptions) -> Result<Self> {
        Self::with_config(ConnectorConfig::default().with_tls(SchemeSetting::Enabled(options)))
    }

    /// Whether URIs with `scheme` have a connector.
    #[must_use]
    pub fn supports(&self, scheme: &str) -> bool {
        self.connectors.contains_key(scheme)
            || (scheme == OPPORTUNISTIC_SCHEME && self.opportunistic.is_some())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut schemes: Vec<_> = self.connectors.keys().collect();
        schemes.sort();
        f.debug_struct("Connector")
            .field("schemes", &schemes)
            .field("opportunistic", &self.opportunistic.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn resolver(setting: &DnsSetting) -> Option<Arc<dyn Resolve>> {
    match setting {
        DnsSetting::Disabled => None,
        DnsSetting::System => Some(Arc::new(HickoryResolver::system())),
        DnsSetting::Nameserver(addr) => Some(Arc::new(HickoryResolver::with_nameserver(*addr))),
        DnsSetting::Custom(resolver) => Some(resolver.clone()),
    }
}
