//! State of a single Happy Eyeballs connect call.
//!
//! [`HappyEyeballsRun`] owns both lookups, the interleaved connect queue, the
//! in-flight attempts and both timers. Its event loop feeds every completion
//! into one of the `on_*` methods, which mutate the run and report whether it
//! has settled. Returning from [`HappyEyeballsRun::run`] drops the run, so
//! every loser is released the moment a winner or a terminal error is known.

use std::collections::VecDeque;
use std::fmt;
use std::future::{Future, poll_fn};
use std::net::IpAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info, warn};

use crate::connect::{Connect, Connecting, Connection, Progress};
use crate::dns::{Name, RecordType, Resolve, ResolveError, Resolving};
use crate::endpoint::Endpoint;
use crate::error::{self, CancelPhase, Error, ErrorCode, Result};

/// Matches the `hostname` parameter appended to per-attempt URIs.
static ATTEMPT_HOSTNAME: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^(Connection to [^ ]+)[&?]hostname=[^ &]+").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    V4,
    V6,
}

impl Family {
    fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => f.write_str("IPv4"),
            Family::V6 => f.write_str("IPv6"),
        }
    }
}

/// One pending connect to a resolved address.
struct Attempt {
    ip: IpAddr,
    connecting: Connecting,
}

impl Future for Attempt {
    type Output = (IpAddr, Result<Connection>);

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let ip = this.ip;
        Pin::new(&mut this.connecting).poll(cx).map(|result| (ip, result))
    }
}

enum Event {
    Lookup(Family, std::result::Result<Vec<IpAddr>, ResolveError>),
    ResolutionDelayElapsed,
    AttemptDelayElapsed,
    Attempt(IpAddr, Result<Connection>),
}

pub(super) struct HappyEyeballsRun {
    uri: String,
    endpoint: Endpoint,
    connector: Arc<dyn Connect>,
    progress: Progress,
    attempt_delay: Duration,
    resolution_delay: Duration,

    lookup_v6: Option<Resolving>,
    lookup_v4: Option<Resolving>,
    resolved_v6: bool,
    resolved_v4: bool,
    /// IPv4 results waiting for AAAA to settle or the resolution delay to pass.
    held_v4: Option<Vec<IpAddr>>,
    resolution_timer: Option<Pin<Box<Sleep>>>,
    next_attempt: Option<Pin<Box<Sleep>>>,

    queue: VecDeque<IpAddr>,
    attempts: FuturesUnordered<Attempt>,
    total: usize,
    failures: usize,

    last_error_v4: Option<String>,
    last_error_v6: Option<String>,
    last_family: Option<Family>,
    last_code: Option<ErrorCode>,
}

impl HappyEyeballsRun {
    /// Creates the run and queues both lookups. Nothing happens until polled.
    pub(super) fn new(
        uri: &str,
        endpoint: Endpoint,
        connector: Arc<dyn Connect>,
        resolver: &dyn Resolve,
        attempt_delay: Duration,
        resolution_delay: Duration,
    ) -> Self {
        let name = Name::from(endpoint.host().unwrap_or_default());
        HappyEyeballsRun {
            uri: uri.to_owned(),
            lookup_v6: Some(resolver.resolve_all(&name, RecordType::Aaaa)),
            lookup_v4: Some(resolver.resolve_all(&name, RecordType::A)),
            endpoint,
            connector,
            progress: Progress::new(CancelPhase::DnsLookup),
            attempt_delay,
            resolution_delay,
            resolved_v6: false,
            resolved_v4: false,
            held_v4: None,
            resolution_timer: None,
            next_attempt: None,
            queue: VecDeque::new(),
            attempts: FuturesUnordered::new(),
            total: 0,
            failures: 0,
            last_error_v4: None,
            last_error_v6: None,
            last_family: None,
            last_code: None,
        }
    }

    pub(super) fn progress(&self) -> Progress {
        self.progress.clone()
    }

    pub(super) async fn run(mut self) -> Result<Connection> {
        debug!("resolving AAAA and A records for {}", self.uri);
        loop {
            if let Some(outcome) = self.on_idle() {
                return self.finish(outcome);
            }

            let event = tokio::select! {
                biased;
                Some((ip, result)) = self.attempts.next(), if !self.attempts.is_empty() => {
                    Event::Attempt(ip, result)
                }
                result = settle(&mut self.lookup_v6) => Event::Lookup(Family::V6, result),
                result = settle(&mut self.lookup_v4) => Event::Lookup(Family::V4, result),
                () = settle(&mut self.resolution_timer) => Event::ResolutionDelayElapsed,
                () = settle(&mut self.next_attempt) => Event::AttemptDelayElapsed,
            };

            let outcome = match event {
                Event::Lookup(family, result) => self.on_lookup_settled(family, result),
                Event::ResolutionDelayElapsed => self.on_resolution_delay_elapsed(),
                Event::AttemptDelayElapsed => {
                    self.tick();
                    None
                }
                Event::Attempt(ip, result) => self.on_attempt_settled(ip, result),
            };
            if let Some(outcome) = outcome {
                return self.finish(outcome);
            }
        }
    }

    /// Handles a settled AAAA or A lookup.
    ///
    /// A failed lookup contributes no addresses and its message is kept for the
    /// aggregate error. Non-empty IPv4 results arriving while AAAA is still
    /// pending are held back for the resolution delay.
    fn on_lookup_settled(
        &mut self,
        family: Family,
        result: std::result::Result<Vec<IpAddr>, ResolveError>,
    ) -> Option<Result<Connection>> {
        let ips = match result {
            Ok(ips) => {
                debug!("{family} lookup for {} returned {ips:?}", self.uri);
                ips
            }
            Err(e) => {
                warn!("{family} lookup for {} failed: {e}", self.uri);
                self.record_error(family, e.to_string(), None);
                Vec::new()
            }
        };

        if family == Family::V4 && !self.resolved_v6 && !ips.is_empty() {
            debug!(
                "holding IPv4 addresses for {} up to {:?} while AAAA is pending",
                self.uri, self.resolution_delay
            );
            self.held_v4 = Some(ips);
            self.resolution_timer = Some(Box::pin(sleep(self.resolution_delay)));
            return None;
        }

        if let Some(outcome) = self.merge(family, ips) {
            return Some(outcome);
        }
        if family == Family::V6 {
            if let Some(held) = self.held_v4.take() {
                self.resolution_timer = None;
                return self.merge(Family::V4, held);
            }
        }
        None
    }

    fn on_resolution_delay_elapsed(&mut self) -> Option<Result<Connection>> {
        let held = self.held_v4.take()?;
        debug!("AAAA for {} still pending, releasing IPv4 addresses", self.uri);
        self.merge(Family::V4, held)
    }

    /// The pacing timer fired.
    fn tick(&mut self) {
        if !self.queue.is_empty() {
            self.start_next_attempt();
        }
    }

    /// Handles a settled connection attempt.
    fn on_attempt_settled(&mut self, ip: IpAddr, result: Result<Connection>) -> Option<Result<Connection>> {
        let err = match result {
            Ok(connection) => {
                info!("connected to {} via {ip}", self.uri);
                return Some(Ok(connection));
            }
            Err(e) => e,
        };

        self.failures += 1;
        debug!("attempt {}/{} for {} via {ip} failed: {err}", self.failures, self.total, self.uri);
        self.record_error(Family::of(&ip), strip_hostname(err.message()), err.code());

        if !self.queue.is_empty() {
            self.next_attempt = None;
            self.start_next_attempt();
        }
        self.exhausted().map(Err)
    }

    /// Mixes newly resolved addresses into the queue and starts an attempt if
    /// the pacing timer is idle.
    fn merge(&mut self, family: Family, ips: Vec<IpAddr>) -> Option<Result<Connection>> {
        match family {
            Family::V4 => self.resolved_v4 = true,
            Family::V6 => self.resolved_v6 = true,
        }
        self.total += ips.len();
        self.mix(ips);

        if self.all_resolved() && self.total == 0 {
            return Some(Err(self.dns_failure()));
        }
        if self.all_resolved() && self.queue.is_empty() {
            self.next_attempt = None;
        }
        if self.next_attempt.is_none() && !self.queue.is_empty() {
            self.start_next_attempt();
        }
        self.exhausted().map(Err)
    }

    /// New addresses go first, alternating with whatever is still queued.
    fn mix(&mut self, ips: Vec<IpAddr>) {
        let mut stashed = std::mem::take(&mut self.queue);
        let mut fresh = ips.into_iter();
        loop {
            let next = fresh.next();
            let old = stashed.pop_front();
            if next.is_none() && old.is_none() {
                break;
            }
            self.queue.extend(next);
            self.queue.extend(old);
        }
    }

    fn start_next_attempt(&mut self) {
        let Some(ip) = self.queue.pop_front() else {
            return;
        };
        let target = self.endpoint.with_host(ip);
        debug!("attempting {target} for {}", self.uri);
        self.progress.set(CancelPhase::Unspecified);
        let connecting = self.connector.connect(&target);
        self.attempts.push(Attempt { ip, connecting });

        if self.next_attempt.is_none() && (!self.queue.is_empty() || !self.all_resolved()) {
            self.next_attempt = Some(Box::pin(sleep(self.attempt_delay)));
        }
    }

    /// Settles a run that has nothing left to wait for.
    fn on_idle(&mut self) -> Option<Result<Connection>> {
        let waiting = self.lookup_v6.is_some()
            || self.lookup_v4.is_some()
            || self.resolution_timer.is_some()
            || self.next_attempt.is_some()
            || !self.attempts.is_empty();
        if waiting {
            return None;
        }
        if !self.queue.is_empty() {
            self.start_next_attempt();
            return None;
        }
        if self.total == 0 {
            Some(Err(self.dns_failure()))
        } else {
            Some(Err(self.all_failed()))
        }
    }

    /// The aggregate error once both families are in and every address failed.
    fn exhausted(&self) -> Option<Error> {
        let done = self.all_resolved()
            && self.total > 0
            && self.failures == self.total
            && self.attempts.is_empty();
        done.then(|| self.all_failed())
    }

    fn all_resolved(&self) -> bool {
        self.resolved_v4 && self.resolved_v6
    }

    fn record_error(&mut self, family: Family, message: String, code: Option<ErrorCode>) {
        match family {
            Family::V4 => self.last_error_v4 = Some(message),
            Family::V6 => self.last_error_v6 = Some(message),
        }
        self.last_family = Some(family);
        if code.is_some() {
            self.last_code = code;
        }
    }

    fn composed_error(&self) -> String {
        let v4 = self.last_error_v4.as_deref().unwrap_or_default();
        let v6 = self.last_error_v6.as_deref().unwrap_or_default();
        if v4 == v6 {
            return v6.to_owned();
        }
        match self.last_family {
            Some(Family::V6) => format!("Last error for IPv6: {v6}. Previous error for IPv4: {v4}"),
            _ => format!("Last error for IPv4: {v4}. Previous error for IPv6: {v6}"),
        }
    }

    fn dns_failure(&self) -> Error {
        if self.last_error_v4.is_none() && self.last_error_v6.is_none() {
            return error::dns(&self.uri, "no addresses returned");
        }
        if self.last_error_v4 == self.last_error_v6 {
            error::dns(&self.uri, self.composed_error())
        } else {
            error::dns_families(&self.uri, self.composed_error())
        }
    }

    fn all_failed(&self) -> Error {
        error::all_attempts_failed(&self.uri, self.composed_error(), self.last_code)
    }

    fn finish(mut self, outcome: Result<Connection>) -> Result<Connection> {
        let abandoned = self.attempts.len();
        if abandoned > 0 {
            debug!("cancelling {abandoned} pending attempts for {}", self.uri);
        }
        self.attempts.clear();
        self.queue.clear();
        self.lookup_v6 = None;
        self.lookup_v4 = None;
        self.resolution_timer = None;
        self.next_attempt = None;
        outcome
    }
}

/// Resolves with the slot's output and empties it; pends forever when empty.
fn settle<F: Future + Unpin>(slot: &mut Option<F>) -> impl Future<Output = F::Output> + '_ {
    poll_fn(move |cx| {
        let Some(pending) = slot.as_mut() else {
            return Poll::Pending;
        };
        let output = ready!(Pin::new(pending).poll(cx));
        *slot = None;
        Poll::Ready(output)
    })
}

fn strip_hostname(message: &str) -> String {
    match ATTEMPT_HOSTNAME.as_ref() {
        Some(pattern) => pattern.replace(message, "$1").into_owned(),
        None => message.to_owned(),
    }
}
