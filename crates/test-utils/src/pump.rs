//! A stand-in for the host reactor.
//!
//! `PollPump` records every readiness registration the library places and
//! lets a test block on `poll(2)` until one of the registered descriptors
//! becomes ready. Registrations are one-shot: a fired registration is
//! removed, mirroring how a real reactor hands the token back to the caller
//! exactly once.

use std::os::fd::{BorrowedFd, RawFd};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use procpipe::{Direction, ReadinessRegistrar, Token};
use tracing::trace;

struct Registration {
    fd: RawFd,
    direction: Direction,
    token: Token,
}

#[derive(Default)]
pub struct PollPump {
    registrations: Mutex<Vec<Registration>>,
}

impl PollPump {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of currently outstanding registrations.
    pub fn registration_count(&self) -> usize {
        self.registrations.lock().unwrap().len()
    }

    /// Whether the given token has an outstanding registration.
    pub fn is_registered(&self, token: Token) -> bool {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.token == token)
    }

    /// Poll all registered descriptors once, waiting at most `timeout`.
    /// Returns the tokens whose descriptors became ready (including error
    /// and hangup states) and drops those registrations.
    pub fn pump(&self, timeout: Duration) -> Vec<Token> {
        let mut registrations = self.registrations.lock().unwrap();
        if registrations.is_empty() {
            return Vec::new();
        }

        let mut pollfds: Vec<PollFd> = registrations
            .iter()
            .map(|r| {
                let fd = unsafe { BorrowedFd::borrow_raw(r.fd) };
                let events = match r.direction {
                    Direction::Input => PollFlags::POLLOUT,
                    Direction::Output => PollFlags::POLLIN,
                };
                PollFd::new(fd, events)
            })
            .collect();

        let timeout_ms = timeout.as_millis().min(u16::MAX as u128) as u16;
        let ready = match poll(&mut pollfds, PollTimeout::from(timeout_ms)) {
            Ok(n) if n > 0 => {
                let fired: Vec<bool> = pollfds
                    .iter()
                    .map(|p| p.revents().is_some_and(|r| !r.is_empty()))
                    .collect();
                let mut tokens = Vec::new();
                let mut index = 0;
                registrations.retain(|r| {
                    let keep = !fired[index];
                    if !keep {
                        tokens.push(r.token);
                    }
                    index += 1;
                    keep
                });
                tokens
            }
            _ => Vec::new(),
        };
        ready
    }

    /// Pump until `token` fires or `timeout` elapses.
    pub fn wait_ready(&self, token: Token, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.pump(Duration::from_millis(50)).contains(&token) {
                return true;
            }
        }
        false
    }
}

impl ReadinessRegistrar for PollPump {
    fn register(&self, fd: RawFd, direction: Direction, token: Token) -> std::io::Result<()> {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.retain(|r| !(r.fd == fd && r.direction == direction));
        registrations.push(Registration {
            fd,
            direction,
            token,
        });
        trace!(fd, %direction, token = token.0, "pump registration");
        Ok(())
    }

    fn deregister(&self, fd: RawFd, direction: Direction) -> std::io::Result<()> {
        let mut registrations = self.registrations.lock().unwrap();
        registrations.retain(|r| !(r.fd == fd && r.direction == direction));
        trace!(fd, %direction, "pump deregistration");
        Ok(())
    }
}
