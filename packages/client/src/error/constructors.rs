use std::fmt::Display;
use std::io;
use std::time::Duration;

use super::BoxError;
use super::codes::ErrorCode;
use super::types::{CancelPhase, Error, Kind};

/// Creates an `Error` for a URI that could not be parsed or uses the wrong scheme.
pub fn invalid_uri(uri: &str) -> Error {
    Error::new(Kind::InvalidUri, format!("Given URI \"{uri}\" is invalid (EINVAL)"))
        .with_code(ErrorCode::Einval)
        .with_uri(uri)
}

/// Creates an `Error` for a host that is not a literal IP where one is required.
pub fn invalid_host_ip(uri: &str) -> Error {
    Error::new(
        Kind::InvalidUri,
        format!("Given URI \"{uri}\" does not contain a valid host IP (EINVAL)"),
    )
    .with_code(ErrorCode::Einval)
    .with_uri(uri)
}

/// Creates an `Error` for a URI without a port.
pub fn missing_port(uri: &str) -> Error {
    Error::new(
        Kind::InvalidUri,
        format!("Given URI \"{uri}\" is invalid: missing port (EINVAL)"),
    )
    .with_code(ErrorCode::Einval)
    .with_uri(uri)
}

/// Creates an `Error` for a scheme no connector is registered for.
pub fn unsupported_scheme(scheme: &str) -> Error {
    Error::new(
        Kind::InvalidUri,
        format!("No connector available for URI scheme \"{scheme}\" (EINVAL)"),
    )
    .with_code(ErrorCode::Einval)
}

/// Creates an `Error` for a socket-level connect failure.
pub fn connect(uri: &str, err: io::Error) -> Error {
    let code = ErrorCode::from_io(&err);
    Error::new(Kind::Connect, format!("Connection to {uri} failed: {err} ({code})"))
        .with_code(code)
        .with_uri(uri)
        .with(err)
}

/// Creates an `Error` for a failed Unix domain socket connect.
pub fn unix_connect(path: &str, err: io::Error) -> Error {
    let code = ErrorCode::from_io(&err);
    Error::new(
        Kind::Connect,
        format!("Unable to connect to unix domain socket \"{path}\": {err} ({code})"),
    )
    .with_code(code)
    .with_uri(format!("unix://{path}"))
    .with(err)
}

/// Creates an `Error` for a name that could not be resolved.
pub fn dns<C: Display>(uri: &str, cause: C) -> Error {
    Error::new(
        Kind::Dns,
        format!("Connection to {uri} failed during DNS lookup: {cause}"),
    )
    .with_uri(uri)
}

/// Creates an `Error` for a dual-stack lookup where both families failed differently.
pub fn dns_families<C: Display>(uri: &str, detail: C) -> Error {
    Error::new(
        Kind::Dns,
        format!("Connection to {uri} failed during DNS lookup. {detail}"),
    )
    .with_uri(uri)
}

/// Creates the aggregate `Error` raised once every resolved address failed.
pub fn all_attempts_failed<C: Display>(uri: &str, detail: C, code: Option<ErrorCode>) -> Error {
    let err = Error::new(
        Kind::AllAttemptsFailed,
        format!("Connection to {uri} failed: {detail}"),
    )
    .with_uri(uri);
    match code {
        Some(code) => err.with_code(code),
        None => err,
    }
}

/// Creates an `Error` for an outbound TLS handshake that did not complete.
pub fn handshake<C: Display>(uri: &str, cause: C) -> Error {
    Error::new(
        Kind::Handshake,
        format!("Connection to {uri} failed during TLS handshake: {cause}"),
    )
    .with_code(ErrorCode::Econnreset)
    .with_uri(uri)
}

/// Creates an `Error` for an inbound TLS handshake that did not complete.
pub fn handshake_from<C: Display>(remote: &str, cause: C) -> Error {
    Error::new(
        Kind::Handshake,
        format!("Connection from {remote} failed during TLS handshake: {cause}"),
    )
    .with_code(ErrorCode::Econnreset)
    .with_uri(remote)
}

/// Creates an `Error` for a caller-initiated abort.
pub fn cancelled(uri: &str, phase: CancelPhase) -> Error {
    Error::new(
        Kind::Cancelled(phase),
        format!("Connection to {uri} cancelled{} (ECONNABORTED)", phase.suffix()),
    )
    .with_code(ErrorCode::Econnaborted)
    .with_uri(uri)
}

/// Creates an `Error` for an elapsed connect bound.
pub fn timeout(uri: &str, after: Duration) -> Error {
    Error::new(
        Kind::Timeout,
        format!(
            "Connection to {uri} timed out after {} seconds (ETIMEDOUT)",
            after.as_secs_f64()
        ),
    )
    .with_code(ErrorCode::Etimedout)
    .with_uri(uri)
}

/// Creates an `Error` for invalid options or an incompatible component.
pub fn configuration<E: Into<BoxError>>(e: E) -> Error {
    let source = e.into();
    Error::new(Kind::Configuration, source.to_string())
        .with_code(ErrorCode::Einval)
        .with(source)
}

/// Creates an `Error` for a listener that could not be bound.
pub fn listen(uri: &str, err: io::Error) -> Error {
    let code = ErrorCode::from_io(&err);
    Error::new(Kind::Io, format!("Failed to listen on \"{uri}\": {err} ({code})"))
        .with_code(code)
        .with_uri(uri)
        .with(err)
}

/// Creates an `Error` for a failed `accept` on a bound listener.
pub fn accept(err: io::Error) -> Error {
    let code = ErrorCode::from_io(&err);
    Error::new(Kind::Io, format!("Unable to accept new connection: {err} ({code})"))
        .with_code(code)
        .with(err)
}

/// Creates an `Error` for a runtime I/O failure.
pub fn io(err: io::Error) -> Error {
    let code = ErrorCode::from_io(&err);
    Error::new(Kind::Io, err.to_string()).with_code(code).with(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_uri_message() {
        let err = invalid_uri("tcp://example.com");
        assert_eq!(err.to_string(), "Given URI \"tcp://example.com\" is invalid (EINVAL)");
        assert_eq!(err.code(), Some(ErrorCode::Einval));
        assert!(err.is_invalid_uri());
    }

    #[test]
    fn cancellation_messages_name_the_phase() {
        let uri = "tcp://example.com:80";
        assert_eq!(
            cancelled(uri, CancelPhase::DnsLookup).to_string(),
            "Connection to tcp://example.com:80 cancelled during DNS lookup (ECONNABORTED)"
        );
        assert_eq!(
            cancelled(uri, CancelPhase::TcpHandshake).to_string(),
            "Connection to tcp://example.com:80 cancelled during TCP/IP handshake (ECONNABORTED)"
        );
        assert_eq!(
            cancelled(uri, CancelPhase::Unspecified).to_string(),
            "Connection to tcp://example.com:80 cancelled (ECONNABORTED)"
        );
    }

    #[test]
    fn timeout_message_uses_fractional_seconds() {
        let err = timeout("tcp://10.0.0.1:80", Duration::from_millis(100));
        assert_eq!(
            err.to_string(),
            "Connection to tcp://10.0.0.1:80 timed out after 0.1 seconds (ETIMEDOUT)"
        );
        let err = timeout("tcp://10.0.0.1:80", Duration::from_secs(60));
        assert!(err.to_string().contains("after 60 seconds"));
        assert!(err.is_timeout());
    }

    #[test]
    fn connect_error_carries_io_code() {
        let err = connect(
            "tcp://127.0.0.1:1",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        );
        assert_eq!(err.code(), Some(ErrorCode::Econnrefused));
        assert!(err.to_string().starts_with("Connection to tcp://127.0.0.1:1 failed: "));
        assert!(err.to_string().ends_with("(ECONNREFUSED)"));
    }

    #[test]
    fn replace_uri_rewrites_message() {
        let err = connect(
            "tcp://127.0.0.1:80?hostname=localhost",
            io::Error::from(io::ErrorKind::ConnectionRefused),
        )
        .replace_uri("tcp://127.0.0.1:80?hostname=localhost", "tcp://localhost:80");
        assert!(err.to_string().starts_with("Connection to tcp://localhost:80 failed"));
        assert_eq!(err.uri(), Some("tcp://localhost:80"));
    }
}
