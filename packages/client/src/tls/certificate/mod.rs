//! Certificate helpers
//!
//! Self-signed certificate generation for development servers and tests.

pub mod generation;

pub use generation::{SelfSignedCertificate, generate_self_signed};
