//! Single-address DNS decorator.
//!
//! Resolves the first A record and forwards the rebuilt URI. Used when
//! Happy-Eyeballs racing is switched off.

use std::sync::Arc;

use tracing::debug;

use crate::connect::{Connect, Connecting, Progress};
use crate::dns::{Name, Resolve};
use crate::endpoint::Endpoint;
use crate::error::{self, CancelPhase};

/// Resolves host names before handing off to the inner connector.
#[derive(Clone)]
pub struct DnsConnector {
    connector: Arc<dyn Connect>,
    resolver: Arc<dyn Resolve>,
}

impl DnsConnector {
    pub fn new(connector: Arc<dyn Connect>, resolver: Arc<dyn Resolve>) -> Self {
        DnsConnector { connector, resolver }
    }
}

impl Connect for DnsConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let endpoint = match Endpoint::parse(uri) {
            Ok(endpoint) => endpoint,
            Err(err) => return Connecting::rejected(uri, err),
        };
        let Some(host) = endpoint.host() else {
            return Connecting::rejected(uri, error::invalid_uri(uri));
        };
        if endpoint.is_ip_literal() {
            return self.connector.connect(uri);
        }

        let progress = Progress::new(CancelPhase::DnsLookup);
        let lookup = self.resolver.resolve(&Name::from(host));
        let connector = self.connector.clone();
        let original = uri.to_owned();
        let shared = progress.clone();

        Connecting::new(uri, progress, async move {
            let ip = lookup.await.map_err(|e| error::dns(&original, e))?;
            let target = endpoint.with_host(ip);
            debug!("resolved {original} to {ip}, connecting to {target}");

            let inner = connector.connect(&target);
            shared.set(inner.phase());
            inner.await.map_err(|e| e.replace_uri(&target, &original))
        })
    }
}
