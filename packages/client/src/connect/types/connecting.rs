//! The cancellable future returned by every connector.
//!
//! [`Connecting`] wraps the connector's work in an [`Abortable`] so it can be
//! cancelled either in place with [`Connecting::cancel`] or from elsewhere
//! through a [`CancelHandle`]. Cancelling drops the in-flight work, which
//! closes any socket, lookup or timer it owned, and the future then resolves
//! to a cancellation error naming the phase recorded in its [`Progress`].

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::task::{Context, Poll};

use futures::future::{AbortHandle, Abortable, Aborted, BoxFuture};
use futures::FutureExt;

use super::connection::Connection;
use crate::error::{self, CancelPhase, Error, Result};

/// Shared record of how far a pending connect has progressed.
///
/// Decorators hand their inner connector's `Progress` to the outer
/// [`Connecting`] so a cancellation reports the innermost phase.
#[derive(Debug, Clone)]
pub struct Progress(Arc<AtomicU8>);

impl Progress {
    #[must_use]
    pub fn new(phase: CancelPhase) -> Self {
        Progress(Arc::new(AtomicU8::new(encode(phase))))
    }

    pub fn set(&self, phase: CancelPhase) {
        self.0.store(encode(phase), Ordering::Release);
    }

    #[must_use]
    pub fn get(&self) -> CancelPhase {
        decode(self.0.load(Ordering::Acquire))
    }
}

const fn encode(phase: CancelPhase) -> u8 {
    match phase {
        CancelPhase::DnsLookup => 0,
        CancelPhase::TcpHandshake => 1,
        CancelPhase::TlsHandshake => 2,
        CancelPhase::Unspecified => 3,
    }
}

const fn decode(value: u8) -> CancelPhase {
    match value {
        0 => CancelPhase::DnsLookup,
        1 => CancelPhase::TcpHandshake,
        2 => CancelPhase::TlsHandshake,
        _ => CancelPhase::Unspecified,
    }
}

enum State {
    Running(Abortable<BoxFuture<'static, Result<Connection>>>),
    Rejected(Error),
    Cancelled,
    Done,
}

/// A pending connection attempt.
///
/// Dropping a `Connecting` cancels it as well; the only difference with
/// [`cancel`](Connecting::cancel) is that nobody observes the error.
#[must_use = "futures do nothing unless polled"]
pub struct Connecting {
    uri: Arc<str>,
    progress: Progress,
    abort: Option<AbortHandle>,
    state: State,
}

impl Connecting {
    /// Wraps the work of a connect call.
    pub fn new<F>(uri: &str, progress: Progress, future: F) -> Self
    where
        F: Future<Output = Result<Connection>> + Send + 'static,
    {
        let (abort, registration) = AbortHandle::new_pair();
        Connecting {
            uri: Arc::from(uri),
            progress,
            abort: Some(abort),
            state: State::Running(Abortable::new(future.boxed(), registration)),
        }
    }

    /// A connect call that failed before doing any I/O.
    ///
    /// The error is yielded on the first poll.
    pub fn rejected(uri: &str, err: Error) -> Self {
        Connecting {
            uri: Arc::from(uri),
            progress: Progress::new(CancelPhase::Unspecified),
            abort: None,
            state: State::Rejected(err),
        }
    }

    /// The URI this attempt was started for.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    #[must_use]
    pub fn phase(&self) -> CancelPhase {
        self.progress.get()
    }

    /// Whether the future already yielded its result.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Cancels the attempt now.
    ///
    /// All in-flight work is dropped before this returns. The next poll
    /// resolves to a cancellation error. Cancelling a settled or rejected
    /// attempt has no effect.
    pub fn cancel(&mut self) {
        if let State::Running(_) = self.state {
            tracing::debug!("cancelling connection to {}", self.uri);
            self.state = State::Cancelled;
        }
    }

    /// A handle that cancels this attempt from another task.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            abort: self.abort.clone(),
        }
    }
}

impl Future for Connecting {
    type Output = Result<Connection>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match mem::replace(&mut this.state, State::Done) {
            State::Running(mut work) => match Pin::new(&mut work).poll(cx) {
                Poll::Pending => {
                    this.state = State::Running(work);
                    Poll::Pending
                }
                Poll::Ready(Ok(result)) => Poll::Ready(result),
                Poll::Ready(Err(Aborted)) => {
                    tracing::debug!("connection to {} cancelled remotely", this.uri);
                    Poll::Ready(Err(error::cancelled(&this.uri, this.progress.get())))
                }
            },
            State::Rejected(err) => Poll::Ready(Err(err)),
            State::Cancelled => Poll::Ready(Err(error::cancelled(&this.uri, this.progress.get()))),
            State::Done => panic!("Connecting polled after completion"),
        }
    }
}

impl std::fmt::Debug for Connecting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self.state {
            State::Running(_) => "running",
            State::Rejected(_) => "rejected",
            State::Cancelled => "cancelled",
            State::Done => "done",
        };
        f.debug_struct("Connecting")
            .field("uri", &self.uri)
            .field("phase", &self.progress.get())
            .field("state", &state)
            .finish()
    }
}

/// Cancels a [`Connecting`] from anywhere.
///
/// The pending work is released the next time the future is polled, or when
/// it is dropped.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    abort: Option<AbortHandle>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future;
    use tokio_test::{assert_pending, assert_ready_err, task};

    fn pending_forever(phase: CancelPhase) -> Connecting {
        Connecting::new(
            "tcp://example.com:80",
            Progress::new(phase),
            future::pending::<Result<Connection>>(),
        )
    }

    #[test]
    fn rejected_resolves_on_first_poll() {
        let mut connecting = task::spawn(Connecting::rejected(
            "foo",
            error::invalid_uri("foo"),
        ));
        let err = assert_ready_err!(connecting.poll());
        assert!(err.is_invalid_uri());
    }

    #[test]
    fn cancel_reports_current_phase() {
        let mut connecting = pending_forever(CancelPhase::DnsLookup);
        let mut polled = task::spawn(async move {
            connecting.cancel();
            connecting.await
        });
        let err = assert_ready_err!(polled.poll());
        assert_eq!(err.cancel_phase(), Some(CancelPhase::DnsLookup));
        assert_eq!(
            err.to_string(),
            "Connection to tcp://example.com:80 cancelled during DNS lookup (ECONNABORTED)"
        );
    }

    #[test]
    fn cancel_handle_aborts_remotely() {
        let connecting = pending_forever(CancelPhase::TcpHandshake);
        let handle = connecting.cancel_handle();
        let progress = connecting.progress();
        let mut polled = task::spawn(connecting);
        assert_pending!(polled.poll());

        progress.set(CancelPhase::TlsHandshake);
        handle.cancel();
        assert!(polled.is_woken());
        let err = assert_ready_err!(polled.poll());
        assert_eq!(err.cancel_phase(), Some(CancelPhase::TlsHandshake));
    }

    #[test]
    fn cancel_drops_pending_work() {
        struct Guard(Arc<AtomicU8>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(1, Ordering::SeqCst);
            }
        }

        let dropped = Arc::new(AtomicU8::new(0));
        let guard = Guard(dropped.clone());
        let mut connecting = Connecting::new(
            "tcp://10.0.0.1:80",
            Progress::new(CancelPhase::TcpHandshake),
            async move {
                let _guard = guard;
                future::pending::<Result<Connection>>().await
            },
        );
        connecting.cancel();
        assert_eq!(dropped.load(Ordering::SeqCst), 1);
    }
}
