//! Error model shared by every connector, resolver and server.
//!
//! A single [`Error`] type carries the failure [`Kind`], the URI the failure
//! relates to, an errno-style short code and an optional source error.
//! Free functions in [`constructors`] build errors with the exact message
//! formats callers match on; [`classification`] answers "what went wrong".

pub mod classification;
pub mod codes;
pub mod constructors;
pub mod types;

pub use codes::ErrorCode;
pub use constructors::*;
pub use types::{CancelPhase, Error, Kind, Result};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;
