use std::error::Error as StdError;
use std::fmt;

use super::codes::ErrorCode;

/// A Result alias where the Err case is `sockline_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents errors that can occur establishing, securing or accepting connections.
pub struct Error {
    pub(crate) inner: Box<Inner>,
}

pub(crate) struct Inner {
    pub(crate) kind: Kind,
    pub(crate) message: String,
    pub(crate) code: Option<ErrorCode>,
    pub(crate) uri: Option<String>,
    pub(crate) source: Option<Box<dyn StdError + Send + Sync>>,
}

/// Failure category, one per terminal outcome a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Malformed URI, unsupported scheme or missing port. Always raised synchronously.
    InvalidUri,
    /// Name resolution failed for every family that was needed.
    Dns,
    /// A single address refused or could not be reached.
    Connect,
    /// Every resolved address was tried and every attempt failed.
    AllAttemptsFailed,
    /// TLS negotiation did not complete.
    Handshake,
    /// The caller aborted the operation.
    Cancelled(CancelPhase),
    /// The configured time bound elapsed.
    Timeout,
    /// Invalid options or an incompatible server.
    Configuration,
    /// Runtime I/O failure after establishment.
    Io,
}

/// Where a pending connection was when it got cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelPhase {
    DnsLookup,
    TcpHandshake,
    TlsHandshake,
    /// An attempt had started but no finer phase is known.
    Unspecified,
}

impl CancelPhase {
    pub(crate) const fn suffix(self) -> &'static str {
        match self {
            CancelPhase::DnsLookup => " during DNS lookup",
            CancelPhase::TcpHandshake => " during TCP/IP handshake",
            CancelPhase::TlsHandshake => " during TLS handshake",
            CancelPhase::Unspecified => "",
        }
    }
}

impl Error {
    pub(crate) fn new(kind: Kind, message: impl Into<String>) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                message: message.into(),
                code: None,
                uri: None,
                source: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub(crate) fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(source.into());
        self
    }

    #[must_use]
    pub(crate) fn with_code(mut self, code: ErrorCode) -> Self {
        self.inner.code = Some(code);
        self
    }

    #[must_use]
    pub(crate) fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.inner.uri = Some(uri.into());
        self
    }

    /// Rewrites every mention of `from` in the message to `to`.
    ///
    /// Decorators use this so an error raised for a resolved attempt URI
    /// names the URI the caller asked for.
    #[must_use]
    pub(crate) fn replace_uri(mut self, from: &str, to: &str) -> Self {
        if from != to && !from.is_empty() {
            self.inner.message = self.inner.message.replace(from, to);
        }
        self.inner.uri = Some(to.to_owned());
        self
    }

    /// The failure category.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// The errno-style code, when one applies.
    #[must_use]
    pub fn code(&self) -> Option<ErrorCode> {
        self.inner.code
    }

    /// The URI the failure relates to, if any.
    #[must_use]
    pub fn uri(&self) -> Option<&str> {
        self.inner.uri.as_deref()
    }

    /// The full human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.inner.message
    }
}

impl Clone for Error {
    fn clone(&self) -> Self {
        Error {
            inner: Box::new(Inner {
                kind: self.inner.kind,
                message: self.inner.message.clone(),
                code: self.inner.code,
                uri: self.inner.uri.clone(),
                source: None, // Cannot clone trait objects, so we lose the source
            }),
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("sockline::Error");

        f.field("kind", &self.inner.kind);
        f.field("message", &self.inner.message);

        if let Some(code) = self.inner.code {
            f.field("code", &code);
        }

        if let Some(ref uri) = self.inner.uri {
            f.field("uri", uri);
        }

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        super::constructors::io(err)
    }
}
