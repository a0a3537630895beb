//! DNS resolution via the [hickory-resolver](https://github.com/hickory-dns/hickory-dns) crate

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use futures::FutureExt;
use hickory_resolver::config::{NameServerConfigGroup, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::{Resolver, TokioResolver};
use once_cell::sync::OnceCell;

use super::resolve::{Name, RecordType, Resolve, ResolveError, Resolving};

/// Where the resolver sends its queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Upstream {
    /// Nameservers from the system configuration (`/etc/resolv.conf`).
    System,
    /// A single nameserver.
    Nameserver(SocketAddr),
}

/// Wrapper around an asynchronous hickory `Resolver`, which implements the `Resolve` trait.
#[derive(Clone)]
pub struct HickoryResolver {
    upstream: Upstream,
    /// Construction reads system configuration, so it is delayed until the first lookup.
    state: Arc<OnceCell<TokioResolver>>,
}

impl HickoryResolver {
    /// Resolver using the system configuration.
    #[must_use]
    pub fn system() -> Self {
        Self::with_upstream(Upstream::System)
    }

    /// Resolver sending every query to `nameserver` over UDP/TCP.
    #[must_use]
    pub fn with_nameserver(nameserver: SocketAddr) -> Self {
        Self::with_upstream(Upstream::Nameserver(nameserver))
    }

    fn with_upstream(upstream: Upstream) -> Self {
        HickoryResolver {
            upstream,
            state: Arc::new(OnceCell::new()),
        }
    }

    fn resolver(&self) -> Result<TokioResolver, ResolveError> {
        self.state
            .get_or_try_init(|| new_resolver(self.upstream))
            .cloned()
    }
}

impl Resolve for HickoryResolver {
    fn resolve_all(&self, name: &Name, record: RecordType) -> Resolving {
        let resolver = self.resolver();
        let host = name.as_str().to_owned();

        async move {
            let resolver = resolver?;
            let lookup_error = |e: hickory_resolver::ResolveError| {
                if e.is_no_records_found() {
                    ResolveError::NotFound {
                        name: host.clone(),
                        record,
                    }
                } else {
                    ResolveError::Lookup {
                        name: host.clone(),
                        record,
                        message: e.to_string(),
                    }
                }
            };

            let addrs: Vec<IpAddr> = match record {
                RecordType::A => resolver
                    .ipv4_lookup(host.as_str())
                    .await
                    .map_err(lookup_error)?
                    .iter()
                    .map(|a| IpAddr::V4(a.0))
                    .collect(),
                RecordType::Aaaa => resolver
                    .ipv6_lookup(host.as_str())
                    .await
                    .map_err(lookup_error)?
                    .iter()
                    .map(|aaaa| IpAddr::V6(aaaa.0))
                    .collect(),
            };

            tracing::trace!("resolved {host} ({record}) to {addrs:?}");
            if addrs.is_empty() {
                return Err(ResolveError::NotFound { name: host, record });
            }
            Ok(addrs)
        }
        .boxed()
    }
}

impl fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("upstream", &self.upstream)
            .field("initialized", &self.state.get().is_some())
            .finish()
    }
}

/// Builds the resolver. Address family selection is done per query, so the
/// lookup strategy option is left at its default.
fn new_resolver(upstream: Upstream) -> Result<TokioResolver, ResolveError> {
    match upstream {
        Upstream::System => TokioResolver::builder_tokio()
            .map(|builder| builder.build())
            .map_err(|e| ResolveError::Unavailable(format!("error reading DNS system conf: {e}"))),
        Upstream::Nameserver(addr) => {
            let group = NameServerConfigGroup::from_ips_clear(&[addr.ip()], addr.port(), true);
            let config = ResolverConfig::from_parts(None, Vec::new(), group);
            Ok(
                Resolver::builder_with_config(config, TokioConnectionProvider::default())
                    .with_options(ResolverOpts::default())
                    .build(),
            )
        }
    }
}
