// src/readiness.rs

//! The readiness boundary between this crate and the host's reactor.
//!
//! The core never polls, sleeps, or retries. Whenever a read or write leaves
//! work undone it places a registration with the host's
//! [`ReadinessRegistrar`] and hands control back to the caller. The host's
//! event loop is expected to invoke the caller's retry path (another `read`
//! or `write` on the same handle) once the descriptor becomes ready, passing
//! the [`Token`] through whatever notification channel the host uses.

use std::fmt;
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};

/// Which half of the handle an operation or subscription refers to.
///
/// `Input` is the parent's write end feeding the child's stdin; `Output` is
/// the parent's read end draining the child's stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Input,
    Output,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Input => f.write_str("input"),
            Direction::Output => f.write_str("output"),
        }
    }
}

/// Opaque identifier for one direction of one handle.
///
/// Allocated once per handle at spawn time; the same token is reused every
/// time that direction re-registers. Hosts route it back to the owning
/// caller when the registered descriptor becomes ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Token(pub u64);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Allocate the (input, output) token pair for a new handle.
pub(crate) fn next_token_pair() -> (Token, Token) {
    let n = NEXT_TOKEN.fetch_add(2, Ordering::Relaxed);
    (Token(n), Token(n + 1))
}

/// Host-supplied readiness registration.
///
/// Implementations must be cheap and non-blocking: `register` is called with
/// the owning handle's internal lock held, so it must not call back into the
/// same handle synchronously. Registering a `(fd, direction)` pair that is
/// already registered replaces the previous registration; deregistering a
/// pair that is not registered is a no-op.
///
/// Registrations are one-shot: once the host has delivered a readiness
/// notification for a token, the next incomplete operation on that direction
/// places a fresh registration.
pub trait ReadinessRegistrar: Send + Sync {
    fn register(&self, fd: RawFd, direction: Direction, token: Token) -> std::io::Result<()>;

    fn deregister(&self, fd: RawFd, direction: Direction) -> std::io::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pairs_are_unique_and_adjacent() {
        let (a_in, a_out) = next_token_pair();
        let (b_in, b_out) = next_token_pair();

        assert_eq!(a_out.0, a_in.0 + 1);
        assert_eq!(b_out.0, b_in.0 + 1);
        assert_ne!(a_in, b_in);
        assert_ne!(a_out, b_out);
    }

    #[test]
    fn direction_display() {
        assert_eq!(Direction::Input.to_string(), "input");
        assert_eq!(Direction::Output.to_string(), "output");
    }
}
