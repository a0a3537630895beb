//! TLS-specific error types for context compilation and certificate loading

/// TLS-specific error types for detailed error handling
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("Certificate parsing failed: {0}")]
    CertificateParsing(String),
    #[error("Private key parsing failed: {0}")]
    KeyParsing(String),
    #[error("Key encryption/decryption failed: {0}")]
    KeyProtection(String),
    #[error("Certificate generation failed: {0}")]
    CertificateGeneration(String),
    #[error("Trust store unavailable: {0}")]
    TrustStore(String),
    #[error("Invalid peer name: {0}")]
    InvalidPeerName(String),
    #[error("TLS configuration rejected: {0}")]
    Rustls(#[from] rustls::Error),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TlsError> for crate::Error {
    fn from(err: TlsError) -> Self {
        crate::error::configuration(err)
    }
}
