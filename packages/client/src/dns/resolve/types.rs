//! Core DNS types: names, record types and lookup errors.

use std::fmt;

/// DNS name representation for hostname resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(String);

impl Name {
    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Name(s)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Name(s.to_owned())
    }
}

/// The address record families a lookup can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// IPv4 addresses.
    A,
    /// IPv6 addresses.
    Aaaa,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::A => f.write_str("A"),
            RecordType::Aaaa => f.write_str("AAAA"),
        }
    }
}

/// Why a lookup produced no addresses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// The name has no records of the requested family.
    #[error("DNS query for {name} ({record}) did not return a valid answer")]
    NotFound { name: String, record: RecordType },

    /// The query itself failed.
    #[error("DNS query for {name} ({record}) failed: {message}")]
    Lookup {
        name: String,
        record: RecordType,
        message: String,
    },

    /// No resolver could be constructed.
    #[error("DNS resolver unavailable: {0}")]
    Unavailable(String),
}
