//! Address resolution.
//!
//! The [`Resolve`] trait is what the DNS decorator and the Happy-Eyeballs
//! builder consume. [`HickoryResolver`] talks to real DNS servers,
//! [`StaticResolver`] answers from a fixed table.

pub use hickory::HickoryResolver;
pub use resolve::{Name, RecordType, Resolve, ResolveError, Resolving, StaticResolver};

pub(crate) mod hickory;
pub(crate) mod resolve;
