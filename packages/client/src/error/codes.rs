//! errno-style short codes appended to error messages.

use std::fmt;
use std::io;

/// Short POSIX-style code describing the failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Invalid argument, used for every URI and configuration problem.
    Einval,
    Econnrefused,
    Econnreset,
    Econnaborted,
    Etimedout,
    Ehostunreach,
    Enetunreach,
    Eaddrinuse,
    Eaddrnotavail,
    Enoent,
    Eacces,
    Enotconn,
    Epipe,
    Enotsup,
    /// Catch-all for I/O failures without a more specific mapping.
    Eio,
}

impl ErrorCode {
    /// The symbolic name, e.g. `ECONNREFUSED`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ErrorCode::Einval => "EINVAL",
            ErrorCode::Econnrefused => "ECONNREFUSED",
            ErrorCode::Econnreset => "ECONNRESET",
            ErrorCode::Econnaborted => "ECONNABORTED",
            ErrorCode::Etimedout => "ETIMEDOUT",
            ErrorCode::Ehostunreach => "EHOSTUNREACH",
            ErrorCode::Enetunreach => "ENETUNREACH",
            ErrorCode::Eaddrinuse => "EADDRINUSE",
            ErrorCode::Eaddrnotavail => "EADDRNOTAVAIL",
            ErrorCode::Enoent => "ENOENT",
            ErrorCode::Eacces => "EACCES",
            ErrorCode::Enotconn => "ENOTCONN",
            ErrorCode::Epipe => "EPIPE",
            ErrorCode::Enotsup => "ENOTSUP",
            ErrorCode::Eio => "EIO",
        }
    }

    /// Maps an I/O error onto the closest code.
    #[must_use]
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::ConnectionRefused => ErrorCode::Econnrefused,
            io::ErrorKind::ConnectionReset => ErrorCode::Econnreset,
            io::ErrorKind::ConnectionAborted => ErrorCode::Econnaborted,
            io::ErrorKind::TimedOut => ErrorCode::Etimedout,
            io::ErrorKind::HostUnreachable => ErrorCode::Ehostunreach,
            io::ErrorKind::NetworkUnreachable => ErrorCode::Enetunreach,
            io::ErrorKind::AddrInUse => ErrorCode::Eaddrinuse,
            io::ErrorKind::AddrNotAvailable => ErrorCode::Eaddrnotavail,
            io::ErrorKind::NotFound => ErrorCode::Enoent,
            io::ErrorKind::PermissionDenied => ErrorCode::Eacces,
            io::ErrorKind::NotConnected => ErrorCode::Enotconn,
            io::ErrorKind::BrokenPipe => ErrorCode::Epipe,
            io::ErrorKind::Unsupported => ErrorCode::Enotsup,
            io::ErrorKind::InvalidInput => ErrorCode::Einval,
            _ => ErrorCode::Eio,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
