//! Endpoint URIs: `tcp://host:port`, `tls://host:port`, `unix:///path` or a
//! bare `host:port`, which defaults to `tcp`.
//!
//! An [`Endpoint`] is parsed once and keeps the caller's original text so
//! error messages always quote what the caller asked for. Connection attempts
//! against resolved addresses are built with [`Endpoint::with_host`], which
//! reattaches port, path, query and fragment and records the original name in
//! a `hostname` query parameter for TLS peer verification.

use std::fmt;
use std::fmt::Write as _;
use std::net::IpAddr;

use url::{Host, Url};

use crate::error::{self, Result};

/// Scheme assumed when the URI carries none.
pub const DEFAULT_SCHEME: &str = "tcp";

/// Query parameter carrying the original host name on resolved attempt URIs.
pub const HOSTNAME_PARAM: &str = "hostname";

/// A parsed connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    raw: String,
    scheme: String,
    explicit_scheme: bool,
    host: Option<String>,
    ip: Option<IpAddr>,
    port: Option<u16>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Endpoint {
    /// Parses `uri`, rejecting anything that is not a valid authority-based URI.
    ///
    /// ```
    /// use sockline_client::Endpoint;
    ///
    /// let endpoint = Endpoint::parse("example.com:443").unwrap();
    /// assert_eq!(endpoint.scheme(), "tcp");
    /// assert_eq!(endpoint.host(), Some("example.com"));
    /// assert_eq!(endpoint.port(), Some(443));
    /// ```
    pub fn parse(uri: &str) -> Result<Self> {
        let explicit_scheme = uri.contains("://");
        let text = if explicit_scheme {
            uri.to_owned()
        } else {
            format!("{DEFAULT_SCHEME}://{uri}")
        };

        if let Some(path) = text.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(error::invalid_uri(uri));
            }
            return Ok(Endpoint {
                raw: uri.to_owned(),
                scheme: "unix".to_owned(),
                explicit_scheme,
                host: None,
                ip: None,
                port: None,
                path: path.to_owned(),
                query: None,
                fragment: None,
            });
        }

        let url = Url::parse(&text).map_err(|_| error::invalid_uri(uri))?;
        let (host, ip) = match url.host() {
            Some(Host::Ipv4(addr)) => (addr.to_string(), Some(IpAddr::V4(addr))),
            Some(Host::Ipv6(addr)) => (addr.to_string(), Some(IpAddr::V6(addr))),
            Some(Host::Domain(domain)) if !domain.is_empty() => {
                // Non-special schemes keep IPv4 literals as opaque hosts.
                let ip = domain.parse::<IpAddr>().ok();
                (domain.to_owned(), ip)
            }
            _ => return Err(error::invalid_uri(uri)),
        };

        Ok(Endpoint {
            raw: uri.to_owned(),
            scheme: url.scheme().to_owned(),
            explicit_scheme,
            host: Some(host),
            ip,
            port: url.port(),
            path: url.path().to_owned(),
            query: url.query().map(str::to_owned),
            fragment: url.fragment().map(str::to_owned),
        })
    }

    /// The scheme, `tcp` when the caller gave none.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Whether the caller's text spelled out a scheme.
    #[must_use]
    pub fn has_explicit_scheme(&self) -> bool {
        self.explicit_scheme
    }

    /// The host without IPv6 brackets.
    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// The host as an address, when it is a literal IP.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    #[must_use]
    pub fn is_ip_literal(&self) -> bool {
        self.ip.is_some()
    }

    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Path component; the socket path for `unix` endpoints.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// The caller's original text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Looks up a decoded query parameter.
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    /// The name a TLS layer should verify: the `hostname` parameter if present,
    /// otherwise the host itself.
    #[must_use]
    pub fn peer_name(&self) -> Option<String> {
        self.query_param(HOSTNAME_PARAM)
            .or_else(|| self.host.clone())
    }

    /// The caller's text with any `scheme://` prefix removed.
    #[must_use]
    pub fn without_scheme(&self) -> &str {
        match self.raw.find("://") {
            Some(index) => &self.raw[index + 3..],
            None => &self.raw,
        }
    }

    /// Builds the attempt URI for a resolved address.
    ///
    /// IPv6 addresses are bracketed. When `ip` differs from the original host
    /// and no `hostname` parameter exists yet, one is appended.
    #[must_use]
    pub fn with_host(&self, ip: IpAddr) -> String {
        let mut uri = String::with_capacity(self.raw.len() + 32);
        if self.explicit_scheme {
            uri.push_str(&self.scheme);
            uri.push_str("://");
        }
        match ip {
            IpAddr::V6(addr) => {
                let _ = write!(uri, "[{addr}]");
            }
            IpAddr::V4(addr) => {
                let _ = write!(uri, "{addr}");
            }
        }
        if let Some(port) = self.port {
            let _ = write!(uri, ":{port}");
        }
        uri.push_str(&self.path);
        if let Some(query) = &self.query {
            uri.push('?');
            uri.push_str(query);
        }

        let ip_text = ip.to_string();
        let host_differs = self.host.as_deref().is_some_and(|host| host != ip_text);
        if host_differs && self.query_param(HOSTNAME_PARAM).is_none() {
            uri.push(if self.query.is_some() { '&' } else { '?' });
            uri.push_str(HOSTNAME_PARAM);
            uri.push('=');
            uri.push_str(&urlencoding::encode(self.host.as_deref().unwrap_or_default()));
        }

        if let Some(fragment) = &self.fragment {
            uri.push('#');
            uri.push_str(fragment);
        }
        uri
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl std::str::FromStr for Endpoint {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self> {
        Endpoint::parse(s)
    }
}
