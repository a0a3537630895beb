//! Compiles [`TlsContextOptions`] into rustls configurations.
//!
//! Trust anchors come from `cafile` when set, otherwise from the bundled
//! Mozilla roots, optionally extended with the platform's native store.
//! Certificates and keys are PEM, loaded through `rustls-pemfile`.

use std::sync::Arc;

use rustls::client::WebPkiServerVerifier;
use rustls::crypto::CryptoProvider;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use super::errors::TlsError;
use super::verifier::ContextVerifier;
use crate::config::{PemSource, TlsContextOptions};

/// The crypto provider every configuration is built with.
#[must_use]
pub fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Builds a client configuration.
///
/// # Errors
///
/// Returns `TlsError` if the trust store, certificate or key cannot be loaded.
pub fn client_config(options: &TlsContextOptions) -> Result<ClientConfig, TlsError> {
    let provider = crypto_provider();
    let roots = Arc::new(root_store(options)?);
    let webpki = WebPkiServerVerifier::builder_with_provider(roots, provider.clone())
        .build()
        .map_err(|e| TlsError::TrustStore(e.to_string()))?;
    let verifier = Arc::new(ContextVerifier::new(webpki, provider.clone(), options));

    let builder = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(verifier);

    let mut config = if options.local_cert.is_some() {
        let (chain, key) = load_identity(options)?;
        builder.with_client_auth_cert(chain, key)?
    } else {
        builder.with_no_client_auth()
    };

    config.enable_sni = options.sni_enabled;
    config.alpn_protocols = alpn(options);
    Ok(config)
}

/// Builds a server configuration. `local_cert` is required.
///
/// # Errors
///
/// Returns `TlsError` if the certificate or key is missing or unreadable.
pub fn server_config(options: &TlsContextOptions) -> Result<ServerConfig, TlsError> {
    let (chain, key) = load_identity(options)?;
    let mut config = ServerConfig::builder_with_provider(crypto_provider())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(chain, key)?;
    config.alpn_protocols = alpn(options);
    Ok(config)
}

/// Parses the name a client verifies and sends as SNI. IP strings become IP names.
///
/// # Errors
///
/// Returns `TlsError::InvalidPeerName` for names rustls cannot represent.
pub fn server_name(name: &str) -> Result<ServerName<'static>, TlsError> {
    ServerName::try_from(name.to_owned()).map_err(|_| TlsError::InvalidPeerName(name.to_owned()))
}

fn alpn(options: &TlsContextOptions) -> Vec<Vec<u8>> {
    options
        .alpn_protocols
        .iter()
        .map(|protocol| protocol.as_bytes().to_vec())
        .collect()
}

fn root_store(options: &TlsContextOptions) -> Result<RootCertStore, TlsError> {
    let mut roots = match &options.cafile {
        Some(source) => {
            let mut roots = RootCertStore::empty();
            for cert in load_certs(source)? {
                roots
                    .add(cert)
                    .map_err(|e| TlsError::CertificateParsing(e.to_string()))?;
            }
            roots
        }
        None => webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect(),
    };

    if options.native_roots {
        let native = rustls_native_certs::load_native_certs();
        for err in &native.errors {
            tracing::warn!("skipping native root certificates: {err}");
        }
        let (added, ignored) = roots.add_parsable_certificates(native.certs);
        tracing::debug!("added {added} native root certificates ({ignored} ignored)");
    }

    Ok(roots)
}

fn load_certs(source: &PemSource) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let pem = source.read()?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TlsError::CertificateParsing(e.to_string()))?;
    if certs.is_empty() {
        return Err(TlsError::CertificateParsing(format!(
            "no certificates found in {source:?}"
        )));
    }
    Ok(certs)
}

fn load_identity(
    options: &TlsContextOptions,
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), TlsError> {
    let cert_source = options
        .local_cert
        .as_ref()
        .ok_or_else(|| TlsError::CertificateParsing("local_cert is not set".to_owned()))?;
    let chain = load_certs(cert_source)?;

    let key_source = options.local_pk.as_ref().unwrap_or(cert_source);
    let pem = key_source.read()?;
    let key = rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| TlsError::KeyParsing(e.to_string()))?;

    match key {
        Some(key) => Ok((chain, key)),
        // rustls-pemfile skips ENCRYPTED PRIVATE KEY sections.
        None if options.passphrase.is_some() => Err(TlsError::KeyProtection(
            "passphrase-protected private keys are not supported".to_owned(),
        )),
        None => Err(TlsError::KeyParsing(format!(
            "no private key found in {key_source:?}"
        ))),
    }
}
