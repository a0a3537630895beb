//! Self-signed certificate generation

use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair};
use tracing::debug;

use crate::tls::errors::TlsError;

/// A PEM certificate and its PKCS#8 private key.
#[derive(Clone)]
pub struct SelfSignedCertificate {
    pub cert_pem: String,
    pub key_pem: String,
}

impl std::fmt::Debug for SelfSignedCertificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfSignedCertificate")
            .field("cert_pem", &self.cert_pem)
            .finish_non_exhaustive()
    }
}

/// Generates a self-signed certificate valid for `names`.
///
/// Entries that parse as IP addresses become IP subject alternative names,
/// everything else a DNS name. The first entry is also the common name.
///
/// # Errors
///
/// Returns `TlsError::CertificateGeneration` if a name is invalid or signing fails.
pub fn generate_self_signed(names: &[&str]) -> Result<SelfSignedCertificate, TlsError> {
    let sans: Vec<String> = names.iter().map(|name| (*name).to_owned()).collect();
    let mut params = CertificateParams::new(sans)
        .map_err(|e| TlsError::CertificateGeneration(format!("invalid subject names: {e}")))?;

    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, "sockline");
    if let Some(first) = names.first() {
        dn.push(DnType::CommonName, *first);
    }
    params.distinguished_name = dn;

    let key_pair = KeyPair::generate()
        .map_err(|e| TlsError::CertificateGeneration(format!("key generation failed: {e}")))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| TlsError::CertificateGeneration(format!("signing failed: {e}")))?;

    debug!("generated self-signed certificate for {names:?}");
    Ok(SelfSignedCertificate {
        cert_pem: cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produces_pem_pair() {
        let generated = generate_self_signed(&["localhost", "127.0.0.1"]).unwrap();
        assert!(generated.cert_pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert!(generated.key_pem.contains("PRIVATE KEY"));
        assert!(!format!("{generated:?}").contains("PRIVATE KEY"));
    }
}
