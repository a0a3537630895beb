//! TLS support: context compilation, certificate generation and the
//! encryption toggle shared by clients, servers and opportunistic upgrades.

pub mod certificate;
pub mod context;
pub mod errors;
pub mod toggle;
mod verifier;

pub use certificate::{SelfSignedCertificate, generate_self_signed};
pub use context::{client_config, crypto_provider, server_config, server_name};
pub use errors::TlsError;
pub use toggle::{EncryptionSession, HandshakeFailure, StreamEncryption};
