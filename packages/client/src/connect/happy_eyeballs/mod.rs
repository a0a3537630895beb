//! Happy Eyeballs (RFC 8305) dual-stack connection racing
//!
//! Resolves AAAA and A concurrently, interleaves the address families into a
//! single connect queue and starts overlapping attempts at a fixed pacing
//! interval. The first attempt to succeed wins; everything else is dropped.
//! Literal IP hosts skip resolution entirely.

mod builder;

use std::sync::Arc;
use std::time::Duration;

use crate::config::ConfigDefaults;
use crate::connect::{Connect, Connecting};
use crate::dns::Resolve;
use crate::endpoint::Endpoint;
use crate::error;

use builder::HappyEyeballsRun;

/// Resolves host names per RFC 8305 and races the inner connector across
/// every returned address.
#[derive(Clone)]
pub struct HappyEyeballsConnector {
    connector: Arc<dyn Connect>,
    resolver: Arc<dyn Resolve>,
    attempt_delay: Duration,
    resolution_delay: Duration,
}

impl HappyEyeballsConnector {
    pub fn new(connector: Arc<dyn Connect>, resolver: Arc<dyn Resolve>) -> Self {
        HappyEyeballsConnector {
            connector,
            resolver,
            attempt_delay: ConfigDefaults::ATTEMPT_DELAY,
            resolution_delay: ConfigDefaults::RESOLUTION_DELAY,
        }
    }

    /// Interval between starting overlapping attempts.
    #[must_use]
    pub fn with_attempt_delay(mut self, delay: Duration) -> Self {
        self.attempt_delay = delay;
        self
    }

    /// How long IPv4 results wait for a pending AAAA lookup.
    #[must_use]
    pub fn with_resolution_delay(mut self, delay: Duration) -> Self {
        self.resolution_delay = delay;
        self
    }
}

impl Connect for HappyEyeballsConnector {
    fn connect(&self, uri: &str) -> Connecting {
        let endpoint = match Endpoint::parse(uri) {
            Ok(endpoint) => endpoint,
            Err(err) => return Connecting::rejected(uri, err),
        };
        if endpoint.host().is_none() {
            return Connecting::rejected(uri, error::invalid_uri(uri));
        }
        if endpoint.is_ip_literal() {
            return self.connector.connect(uri);
        }

        let run = HappyEyeballsRun::new(
            uri,
            endpoint,
            self.connector.clone(),
            self.resolver.as_ref(),
            self.attempt_delay,
            self.resolution_delay,
        );
        let progress = run.progress();
        Connecting::new(uri, progress, run.run())
    }
}
