//! TLS context options.
//!
//! The options mirror the stream-context keys callers already know
//! (`verify_peer`, `local_cert`, `cafile`, ...). They are compiled into rustls
//! configurations by `tls::context`; keys this crate does not interpret are
//! kept in [`TlsContextOptions::extra`] and otherwise ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// PEM material, either on disk or already in memory.
#[derive(Clone, PartialEq, Eq)]
pub enum PemSource {
    Path(PathBuf),
    Inline(String),
}

impl PemSource {
    /// Reads the PEM bytes.
    pub fn read(&self) -> io::Result<Vec<u8>> {
        match self {
            PemSource::Path(path) => std::fs::read(path),
            PemSource::Inline(pem) => Ok(pem.as_bytes().to_vec()),
        }
    }
}

impl fmt::Debug for PemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PemSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PemSource::Inline(pem) => write!(f, "Inline({} bytes)", pem.len()),
        }
    }
}

impl From<PathBuf> for PemSource {
    fn from(path: PathBuf) -> Self {
        PemSource::Path(path)
    }
}

impl From<&std::path::Path> for PemSource {
    fn from(path: &std::path::Path) -> Self {
        PemSource::Path(path.to_path_buf())
    }
}

/// TLS options for clients and servers.
#[derive(Clone, PartialEq, Eq)]
pub struct TlsContextOptions {
    /// Validate the peer certificate chain.
    pub verify_peer: bool,
    /// Check that the certificate matches the peer name.
    pub verify_peer_name: bool,
    /// Accept certificates whose issuer is unknown.
    pub allow_self_signed: bool,
    /// Name to verify and send as SNI instead of the URI host.
    pub peer_name: Option<String>,
    pub sni_enabled: bool,
    /// Trust anchors replacing the bundled Mozilla roots.
    pub cafile: Option<PemSource>,
    /// Add the platform's native roots to the trust store.
    pub native_roots: bool,
    /// Certificate chain, optionally followed by its private key.
    pub local_cert: Option<PemSource>,
    /// Private key when not bundled with `local_cert`.
    pub local_pk: Option<PemSource>,
    pub passphrase: Option<String>,
    pub alpn_protocols: Vec<String>,
    /// Keys passed through but not interpreted.
    pub extra: BTreeMap<String, String>,
}

impl Default for TlsContextOptions {
    fn default() -> Self {
        Self {
            verify_peer: true,
            verify_peer_name: true,
            allow_self_signed: false,
            peer_name: None,
            sni_enabled: true,
            cafile: None,
            native_roots: false,
            local_cert: None,
            local_pk: None,
            passphrase: None,
            alpn_protocols: Vec::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl TlsContextOptions {
    /// Options with every peer check switched off. Test setups only.
    #[must_use]
    pub fn insecure() -> Self {
        Self::default()
            .with_verify_peer(false)
            .with_verify_peer_name(false)
            .with_allow_self_signed(true)
    }

    #[must_use]
    pub fn with_verify_peer(mut self, verify: bool) -> Self {
        self.verify_peer = verify;
        self
    }

    #[must_use]
    pub fn with_verify_peer_name(mut self, verify: bool) -> Self {
        self.verify_peer_name = verify;
        self
    }

    #[must_use]
    pub fn with_allow_self_signed(mut self, allow: bool) -> Self {
        self.allow_self_signed = allow;
        self
    }

    #[must_use]
    pub fn with_peer_name(mut self, name: impl Into<String>) -> Self {
        self.peer_name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_sni(mut self, enabled: bool) -> Self {
        self.sni_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_cafile(mut self, source: impl Into<PemSource>) -> Self {
        self.cafile = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_native_roots(mut self, enabled: bool) -> Self {
        self.native_roots = enabled;
        self
    }

    /// Set the certificate chain (and optionally the key) presented to peers.
    ///
    /// # Examples
    /// ```
    /// use sockline_client::config::{PemSource, TlsContextOptions};
    ///
    /// let options = TlsContextOptions::default()
    ///     .with_local_cert(PemSource::Path("server.pem".into()));
    /// assert!(options.local_cert.is_some());
    /// ```
    #[must_use]
    pub fn with_local_cert(mut self, source: impl Into<PemSource>) -> Self {
        self.local_cert = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_local_pk(mut self, source: impl Into<PemSource>) -> Self {
        self.local_pk = Some(source.into());
        self
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    #[must_use]
    pub fn with_alpn_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alpn_protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    /// Sets an option by its stream-context key.
    ///
    /// Boolean keys accept `true`/`false`/`1`/`0`; unknown keys, and known
    /// keys with unparsable values, land in [`extra`](Self::extra).
    #[must_use]
    pub fn with_option(mut self, key: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        let flag = match value.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        };
        match (key, flag) {
            ("verify_peer", Some(flag)) => self.verify_peer = flag,
            ("verify_peer_name", Some(flag)) => self.verify_peer_name = flag,
            ("allow_self_signed", Some(flag)) => self.allow_self_signed = flag,
            ("SNI_enabled", Some(flag)) => self.sni_enabled = flag,
            ("peer_name", _) => self.peer_name = Some(value),
            ("cafile", _) => self.cafile = Some(PemSource::Path(value.into())),
            ("local_cert", _) => self.local_cert = Some(PemSource::Path(value.into())),
            ("local_pk", _) => self.local_pk = Some(PemSource::Path(value.into())),
            ("passphrase", _) => self.passphrase = Some(value),
            ("alpn_protocols", _) => {
                self.alpn_protocols = value.split(',').map(str::trim).map(str::to_owned).collect();
            }
            _ => {
                self.extra.insert(key.to_owned(), value);
            }
        }
        self
    }
}

impl fmt::Debug for TlsContextOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsContextOptions")
            .field("verify_peer", &self.verify_peer)
            .field("verify_peer_name", &self.verify_peer_name)
            .field("allow_self_signed", &self.allow_self_signed)
            .field("peer_name", &self.peer_name)
            .field("sni_enabled", &self.sni_enabled)
            .field("cafile", &self.cafile)
            .field("native_roots", &self.native_roots)
            .field("local_cert", &self.local_cert)
            .field("local_pk", &self.local_pk)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .field("alpn_protocols", &self.alpn_protocols)
            .field("extra", &self.extra)
            .finish()
    }
}
