use std::error::Error as StdError;
use std::io;

use super::types::{CancelPhase, Error, Kind};

impl Error {
    /// Returns true if the URI was malformed or used an unsupported scheme.
    #[must_use]
    pub fn is_invalid_uri(&self) -> bool {
        matches!(self.inner.kind, Kind::InvalidUri)
    }

    /// Returns true if name resolution failed.
    #[must_use]
    pub fn is_dns(&self) -> bool {
        matches!(self.inner.kind, Kind::Dns)
    }

    /// Returns true if a single address could not be connected.
    #[must_use]
    pub fn is_connect(&self) -> bool {
        matches!(self.inner.kind, Kind::Connect)
    }

    /// Returns true if every resolved address was tried and failed.
    #[must_use]
    pub fn is_all_attempts_failed(&self) -> bool {
        matches!(self.inner.kind, Kind::AllAttemptsFailed)
    }

    /// Returns true if a TLS handshake did not complete.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        matches!(self.inner.kind, Kind::Handshake)
    }

    /// Returns true if the caller cancelled the operation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.kind, Kind::Cancelled(_))
    }

    /// The phase a cancelled operation was in.
    #[must_use]
    pub fn cancel_phase(&self) -> Option<CancelPhase> {
        match self.inner.kind {
            Kind::Cancelled(phase) => Some(phase),
            _ => None,
        }
    }

    /// Returns true if the error is related to a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::Timeout) {
            return true;
        }

        let mut source = self.source();
        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }

    /// Returns true if options were invalid or a component was incompatible.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(self.inner.kind, Kind::Configuration)
    }

    /// Returns true if the error is a runtime I/O failure.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(self.inner.kind, Kind::Io)
    }
}
