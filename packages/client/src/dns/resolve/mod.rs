//! Resolver contract, shared types and the static override resolver.

mod overrides;
mod traits;
mod types;

pub use overrides::StaticResolver;
pub use traits::{Resolve, Resolving};
pub use types::{Name, RecordType, ResolveError};
