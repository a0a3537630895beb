//! Server certificate verification driven by TLS context options.

use std::sync::Arc;

use rustls::RootCertStore;
use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};

use crate::config::TlsContextOptions;

/// Wraps the webpki verifier and relaxes it per `verify_peer`,
/// `verify_peer_name` and `allow_self_signed`.
///
/// With `allow_self_signed`, a certificate rejected for its unknown issuer
/// is re-verified with itself as the only trust anchor. Only a certificate
/// that really signs itself passes, and its name is still checked unless
/// `verify_peer_name` is off.
#[derive(Debug)]
pub(crate) struct ContextVerifier {
    inner: Arc<WebPkiServerVerifier>,
    provider: Arc<CryptoProvider>,
    verify_peer: bool,
    verify_peer_name: bool,
    allow_self_signed: bool,
}

impl ContextVerifier {
    pub(crate) fn new(
        inner: Arc<WebPkiServerVerifier>,
        provider: Arc<CryptoProvider>,
        options: &TlsContextOptions,
    ) -> Self {
        ContextVerifier {
            inner,
            provider,
            verify_peer: options.verify_peer,
            verify_peer_name: options.verify_peer_name,
            allow_self_signed: options.allow_self_signed,
        }
    }

    fn tolerates_name(&self, reason: &CertificateError) -> bool {
        !self.verify_peer_name && is_name_mismatch(reason)
    }

    /// Verifies `end_entity` against a trust store holding only itself.
    fn verify_self_signed(
        &self,
        end_entity: &CertificateDer<'_>,
        server_name: &ServerName<'_>,
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let unknown_issuer = || rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer);

        let mut roots = RootCertStore::empty();
        roots
            .add(end_entity.clone().into_owned())
            .map_err(|_| unknown_issuer())?;
        let own = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), self.provider.clone())
            .build()
            .map_err(|e| rustls::Error::General(e.to_string()))?;

        match own.verify_server_cert(end_entity, &[], server_name, &[], now) {
            Ok(verified) => {
                tracing::debug!("accepting self-signed certificate for {server_name:?}");
                Ok(verified)
            }
            Err(rustls::Error::InvalidCertificate(reason)) if self.tolerates_name(&reason) => {
                tracing::debug!("accepting self-signed certificate for {server_name:?} despite {reason:?}");
                Ok(ServerCertVerified::assertion())
            }
            Err(rustls::Error::InvalidCertificate(reason)) if is_name_mismatch(&reason) => {
                Err(rustls::Error::InvalidCertificate(reason))
            }
            Err(_) => Err(unknown_issuer()),
        }
    }
}

fn is_name_mismatch(reason: &CertificateError) -> bool {
    matches!(
        reason,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

impl ServerCertVerifier for ContextVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        if !self.verify_peer {
            tracing::trace!("peer verification disabled, accepting certificate for {server_name:?}");
            return Ok(ServerCertVerified::assertion());
        }

        match self
            .inner
            .verify_server_cert(end_entity, intermediates, server_name, ocsp_response, now)
        {
            Err(rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))
                if self.allow_self_signed =>
            {
                self.verify_self_signed(end_entity, server_name, now)
            }
            Err(rustls::Error::InvalidCertificate(reason)) if self.tolerates_name(&reason) => {
                tracing::debug!("accepting certificate for {server_name:?} despite {reason:?}");
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tls::crypto_provider;
    use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, Issuer, KeyPair};

    fn verifier(options: &TlsContextOptions) -> ContextVerifier {
        let roots = RootCertStore {
            roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
        };
        let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), crypto_provider())
            .build()
            .unwrap();
        ContextVerifier::new(inner, crypto_provider(), options)
    }

    fn self_signed(name: &str) -> CertificateDer<'static> {
        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec![name.to_owned()])
            .unwrap()
            .self_signed(&key)
            .unwrap();
        cert.der().clone()
    }

    fn signed_by_unknown_ca(name: &str) -> CertificateDer<'static> {
        let mut ca = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca.distinguished_name.push(DnType::CommonName, "Unlisted Test CA");
        let issuer = Issuer::new(ca, KeyPair::generate().unwrap());

        let key = KeyPair::generate().unwrap();
        let cert = CertificateParams::new(vec![name.to_owned()])
            .unwrap()
            .signed_by(&key, &issuer)
            .unwrap();
        cert.der().clone()
    }

    fn verify(verifier: &ContextVerifier, cert: &CertificateDer<'_>, name: &str) -> Result<ServerCertVerified, rustls::Error> {
        let name = ServerName::try_from(name.to_owned()).unwrap();
        verifier.verify_server_cert(cert, &[], &name, &[], UnixTime::now())
    }

    #[test]
    fn self_signed_needs_allow_flag() {
        let cert = self_signed("localhost");
        assert!(verify(&verifier(&TlsContextOptions::default()), &cert, "localhost").is_err());

        let options = TlsContextOptions::default().with_allow_self_signed(true);
        assert!(verify(&verifier(&options), &cert, "localhost").is_ok());
    }

    #[test]
    fn self_signed_for_other_name_is_rejected() {
        let cert = self_signed("other.test");
        let options = TlsContextOptions::default().with_allow_self_signed(true);
        let err = verify(&verifier(&options), &cert, "localhost").unwrap_err();
        assert!(matches!(err, rustls::Error::InvalidCertificate(ref reason) if is_name_mismatch(reason)));

        let relaxed = options.with_verify_peer_name(false);
        assert!(verify(&verifier(&relaxed), &cert, "localhost").is_ok());
    }

    #[test]
    fn unknown_ca_is_not_self_signed() {
        let cert = signed_by_unknown_ca("localhost");
        let options = TlsContextOptions::default()
            .with_allow_self_signed(true)
            .with_verify_peer_name(false);
        let err = verify(&verifier(&options), &cert, "localhost").unwrap_err();
        assert_eq!(err, rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer));
    }

    #[test]
    fn disabled_verification_accepts_anything() {
        let cert = signed_by_unknown_ca("other.test");
        assert!(verify(&verifier(&TlsContextOptions::insecure()), &cert, "localhost").is_ok());
    }
}
