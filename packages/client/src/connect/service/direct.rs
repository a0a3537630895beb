//! Scheme dispatch and the opportunistic TLS entry point.

use tracing::debug;

use super::core::{Connector, OPPORTUNISTIC_SCHEME};
use crate::connect::{Connect, Connecting, OpportunisticTlsConnection};
use crate::endpoint::Endpoint;
use crate::error::{self, Result};
use crate::tls::server_name;

/// The text before `://`, or `tcp` when there is none.
fn scheme_of(uri: &str) -> &str {
    match uri.find("://") {
        Some(index) => &uri[..index],
        None => "tcp",
    }
}

impl Connector {
    /// Connects `uri` through the chain registered for its scheme.
    ///
    /// Unknown or disabled schemes reject with an invalid-URI error on the
    /// first poll.
    pub fn connect(&self, uri: &str) -> Connecting {
        let scheme = scheme_of(uri);
        match self.connectors.get(scheme) {
            Some(connector) => connector.connect(uri),
            None => {
                debug!("no connector registered for scheme {scheme:?}");
                Connecting::rejected(uri, error::unsupported_scheme(scheme))
            }
        }
    }

    /// Connects `opportunistic+tls://host:port` in plaintext, ready for a
    /// later [`enable_encryption`](OpportunisticTlsConnection::enable_encryption).
    ///
    /// The peer name verified during the upgrade is the configured
    /// `peer_name`, else the `hostname` parameter, else the host.
    ///
    /// # Errors
    ///
    /// Fails with an invalid-URI error for other schemes or when TLS is not
    /// enabled, otherwise with whatever the TCP chain reports.
    pub async fn connect_opportunistic(&self, uri: &str) -> Result<OpportunisticTlsConnection> {
        if scheme_of(uri) != OPPORTUNISTIC_SCHEME {
            return Err(error::invalid_uri(uri));
        }
        let Some(opportunistic) = &self.opportunistic else {
            return Err(error::unsupported_scheme(OPPORTUNISTIC_SCHEME));
        };

        let endpoint = Endpoint::parse(uri)?;
        let name = opportunistic
            .peer_name
            .clone()
            .or_else(|| endpoint.peer_name())
            .ok_or_else(|| error::invalid_uri(uri))?;
        let name = server_name(&name).map_err(|e| error::configuration(e).with_uri(uri))?;

        let inner_uri = endpoint.without_scheme();
        let prefixed = format!("tcp://{inner_uri}");
        let connection = opportunistic.chain.connect(inner_uri).await.map_err(|e| {
            if e.message().contains(&prefixed) {
                e.replace_uri(&prefixed, uri)
            } else {
                e.replace_uri(inner_uri, uri)
            }
        })?;

        debug!("plaintext connection to {uri} established, TLS pending");
        Ok(OpportunisticTlsConnection::client(
            connection,
            opportunistic.encryption.clone(),
            Some(name),
            uri,
        ))
    }
}

impl Connect for Connector {
    fn connect(&self, uri: &str) -> Connecting {
        Connector::connect(self, uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectorConfig, DnsSetting, SchemeSetting};
    use tokio_test::{assert_ready_err, task};

    #[test]
    fn scheme_defaults_to_tcp() {
        assert_eq!(scheme_of("example.com:80"), "tcp");
        assert_eq!(scheme_of("tls://example.com:443"), "tls");
        assert_eq!(scheme_of("unix:///tmp/a.sock"), "unix");
    }

    #[test]
    fn unknown_scheme_rejects_synchronously() {
        let connector = Connector::with_config(
            ConnectorConfig::default().with_dns(DnsSetting::Disabled),
        )
        .unwrap();
        let mut connecting = task::spawn(connector.connect("udp://127.0.0.1:53"));
        let err = assert_ready_err!(connecting.poll());
        assert_eq!(
            err.to_string(),
            "No connector available for URI scheme \"udp\" (EINVAL)"
        );
    }

    #[test]
    fn disabled_scheme_is_unsupported() {
        let connector = Connector::with_config(
            ConnectorConfig::default()
                .with_dns(DnsSetting::Disabled)
                .with_unix(SchemeSetting::Disabled),
        )
        .unwrap();
        assert!(!connector.supports("unix"));
        assert!(connector.supports("tcp"));
        assert!(connector.supports(OPPORTUNISTIC_SCHEME));
        let mut connecting = task::spawn(connector.connect("unix:///tmp/a.sock"));
        assert!(assert_ready_err!(connecting.poll()).is_invalid_uri());
    }

    #[tokio::test]
    async fn opportunistic_requires_its_scheme() {
        let connector = Connector::with_config(
            ConnectorConfig::default().with_dns(DnsSetting::Disabled),
        )
        .unwrap();
        let err = connector
            .connect_opportunistic("tcp://127.0.0.1:25")
            .await
            .unwrap_err();
        assert!(err.is_invalid_uri());
    }
}
