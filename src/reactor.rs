// src/reactor.rs

//! Tokio-backed fulfilment of the readiness boundary.
//!
//! Hosts that already run inside a tokio runtime can hand
//! [`TokioRegistrar`] to [`Command::spawn`](crate::Command::spawn) and
//! receive readiness tokens on a channel. Each registration is fulfilled by
//! a small guard task that waits for the descriptor to become ready,
//! forwards the token once, and exits; deregistration aborts the guard.
//!
//! Registrations carry level-triggered semantics (a registration placed
//! while the descriptor is already ready must still fire), while tokio's
//! `AsyncFd` readiness is edge-triggered and cached. The guard bridges the
//! two: it probes actual readiness with a zero-timeout `poll(2)` and only
//! sleeps on the edge notification when the probe says not-ready, clearing
//! the cached state before re-probing so no edge is ever consumed without
//! being checked against the real descriptor state.

use std::collections::HashMap;
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::sync::{Arc, Mutex};

use tokio::io::Interest;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::readiness::{Direction, ReadinessRegistrar, Token};

/// A raw descriptor wrapper for [`AsyncFd`]; the registrar borrows the
/// handle's descriptor, it never owns or closes it.
struct FdSource(RawFd);

impl AsRawFd for FdSource {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

struct Subscription {
    afd: Arc<AsyncFd<FdSource>>,
    guard: JoinHandle<()>,
}

/// [`ReadinessRegistrar`] implementation for tokio hosts.
///
/// `register` and the guard tasks it spawns require a tokio runtime
/// context. Tokens arrive on the receiver returned by
/// [`TokioRegistrar::new`] in readiness order; the host reacts by retrying
/// the corresponding operation on the owning handle.
pub struct TokioRegistrar {
    ready_tx: mpsc::UnboundedSender<Token>,
    subscriptions: Mutex<HashMap<(RawFd, Direction), Subscription>>,
}

impl TokioRegistrar {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Token>) {
        let (ready_tx, ready_rx) = mpsc::unbounded_channel();
        let registrar = Arc::new(Self {
            ready_tx,
            subscriptions: Mutex::new(HashMap::new()),
        });
        (registrar, ready_rx)
    }

    fn spawn_guard(
        &self,
        afd: Arc<AsyncFd<FdSource>>,
        direction: Direction,
        token: Token,
    ) -> JoinHandle<()> {
        let tx = self.ready_tx.clone();
        tokio::spawn(async move {
            let fd = afd.get_ref().0;
            loop {
                if probe_ready(fd, direction) {
                    let _ = tx.send(token);
                    return;
                }
                let waited = match direction {
                    Direction::Input => afd.writable().await.map(|mut g| g.clear_ready()),
                    Direction::Output => afd.readable().await.map(|mut g| g.clear_ready()),
                };
                if waited.is_err() {
                    return;
                }
            }
        })
    }
}

impl ReadinessRegistrar for TokioRegistrar {
    fn register(&self, fd: RawFd, direction: Direction, token: Token) -> io::Result<()> {
        let interest = match direction {
            Direction::Input => Interest::WRITABLE,
            Direction::Output => Interest::READABLE,
        };

        let mut subscriptions = self.subscriptions.lock().unwrap();
        // Re-registering the same descriptor re-arms the existing AsyncFd
        // rather than inserting it into the reactor a second time.
        let afd = match subscriptions.remove(&(fd, direction)) {
            Some(previous) => {
                previous.guard.abort();
                previous.afd
            }
            None => Arc::new(AsyncFd::with_interest(FdSource(fd), interest)?),
        };

        let guard = self.spawn_guard(afd.clone(), direction, token);
        subscriptions.insert((fd, direction), Subscription { afd, guard });
        trace!(fd, %direction, token = token.0, "armed tokio readiness guard");
        Ok(())
    }

    fn deregister(&self, fd: RawFd, direction: Direction) -> io::Result<()> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(subscription) = subscriptions.remove(&(fd, direction)) {
            subscription.guard.abort();
            trace!(fd, %direction, "dropped tokio readiness guard");
        }
        Ok(())
    }
}

/// Level-triggered readiness check: a zero-timeout `poll(2)` on the single
/// descriptor. Error and hangup states count as ready so the caller's retry
/// observes them through the regular read/write path.
fn probe_ready(fd: RawFd, direction: Direction) -> bool {
    let events = match direction {
        Direction::Input => libc::POLLOUT,
        Direction::Output => libc::POLLIN,
    };
    let mut pollfd = libc::pollfd {
        fd,
        events,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pollfd, 1, 0) };
    rc > 0 && pollfd.revents != 0
}
