//! Resolver with a fixed host table.
//!
//! Answers configured names directly and hands everything else to an
//! optional fallback resolver, hosts-file style.

use std::collections::HashMap;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use futures::FutureExt;
use futures::future;

use super::traits::{Resolve, Resolving};
use super::types::{Name, RecordType, ResolveError};

/// Resolver answering from a static table of names.
#[derive(Clone, Default)]
pub struct StaticResolver {
    overrides: Arc<HashMap<String, Vec<IpAddr>>>,
    fallback: Option<Arc<dyn Resolve>>,
}

impl StaticResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds addresses for `name`. Lookups match case-insensitively.
    #[must_use]
    pub fn with_host<I>(mut self, name: &str, addrs: I) -> Self
    where
        I: IntoIterator<Item = IpAddr>,
    {
        Arc::make_mut(&mut self.overrides)
            .entry(name.to_ascii_lowercase())
            .or_default()
            .extend(addrs);
        self
    }

    /// Resolver consulted for names not in the table.
    #[must_use]
    pub fn with_fallback(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.fallback = Some(resolver);
        self
    }

    fn lookup(&self, name: &Name, record: RecordType) -> Option<Vec<IpAddr>> {
        let addrs = self.overrides.get(&name.as_str().to_ascii_lowercase())?;
        Some(
            addrs
                .iter()
                .copied()
                .filter(|ip| match record {
                    RecordType::A => ip.is_ipv4(),
                    RecordType::Aaaa => ip.is_ipv6(),
                })
                .collect(),
        )
    }
}

impl Resolve for StaticResolver {
    fn resolve_all(&self, name: &Name, record: RecordType) -> Resolving {
        match self.lookup(name, record) {
            Some(addrs) if !addrs.is_empty() => future::ready(Ok(addrs)).boxed(),
            Some(_) => future::ready(Err(ResolveError::NotFound {
                name: name.to_string(),
                record,
            }))
            .boxed(),
            None => match &self.fallback {
                Some(fallback) => fallback.resolve_all(name, record),
                None => future::ready(Err(ResolveError::NotFound {
                    name: name.to_string(),
                    record,
                }))
                .boxed(),
            },
        }
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticResolver")
            .field("overrides", &self.overrides)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_by_family() {
        let resolver = StaticResolver::new().with_host(
            "Example.test",
            ["127.0.0.1".parse().unwrap(), "::1".parse().unwrap()],
        );
        let name = Name::from("example.test");

        let v4 = resolver.resolve_all(&name, RecordType::A).await.unwrap();
        assert_eq!(v4, vec!["127.0.0.1".parse::<IpAddr>().unwrap()]);
        let v6 = resolver.resolve_all(&name, RecordType::Aaaa).await.unwrap();
        assert_eq!(v6, vec!["::1".parse::<IpAddr>().unwrap()]);
        assert_eq!(
            resolver.resolve(&name).await.unwrap(),
            "127.0.0.1".parse::<IpAddr>().unwrap()
        );
    }

    #[tokio::test]
    async fn rejects_missing_family_and_unknown_names() {
        let resolver = StaticResolver::new().with_host("v4.test", ["10.0.0.1".parse().unwrap()]);

        let err = resolver
            .resolve_all(&Name::from("v4.test"), RecordType::Aaaa)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NotFound { record: RecordType::Aaaa, .. }));
        assert!(resolver.resolve_all(&Name::from("nope.test"), RecordType::A).await.is_err());
    }

    #[tokio::test]
    async fn defers_to_fallback() {
        let fallback = StaticResolver::new().with_host("other.test", ["10.0.0.2".parse().unwrap()]);
        let resolver = StaticResolver::new().with_fallback(Arc::new(fallback));
        let addrs = resolver
            .resolve_all(&Name::from("other.test"), RecordType::A)
            .await
            .unwrap();
        assert_eq!(addrs.len(), 1);
    }
}
