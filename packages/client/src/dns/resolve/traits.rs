//! The resolver contract.

use std::net::IpAddr;

use futures::FutureExt;
use futures::future::BoxFuture;

use super::types::{Name, RecordType, ResolveError};

/// A pending lookup.
pub type Resolving = BoxFuture<'static, Result<Vec<IpAddr>, ResolveError>>;

/// Resolves host names to addresses, one record family at a time.
///
/// Implementations must reject rather than return an empty list when the
/// name has no records for the requested family. Dropping the returned
/// future cancels the lookup.
pub trait Resolve: Send + Sync + 'static {
    /// Looks up every address of one family.
    fn resolve_all(&self, name: &Name, record: RecordType) -> Resolving;

    /// Looks up the first IPv4 address.
    fn resolve(&self, name: &Name) -> BoxFuture<'static, Result<IpAddr, ResolveError>> {
        let lookup = self.resolve_all(name, RecordType::A);
        let name = name.as_str().to_owned();
        async move {
            lookup.await?.into_iter().next().ok_or(ResolveError::NotFound {
                name,
                record: RecordType::A,
            })
        }
        .boxed()
    }
}

impl<T: Resolve + ?Sized> Resolve for std::sync::Arc<T> {
    fn resolve_all(&self, name: &Name, record: RecordType) -> Resolving {
        (**self).resolve_all(name, record)
    }
}
