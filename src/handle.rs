// src/handle.rs

//! The per-process handle and its ownership rules.
//!
//! A [`ProcessHandle`] owns exactly three OS resources: the write end of the
//! child's stdin pipe, the read end of the child's stdout pipe, and the
//! child pid until it has been reaped. All state sits behind one mutex so
//! concurrent calls from different execution contexts (a read racing a
//! close, a close racing a terminate) observe a consistent snapshot and
//! fail fast instead of touching a descriptor that may already be reused.
//!
//! Transitions are monotonic: a direction closes at most once, the pid is
//! reaped at most once, and neither ever reverts.

use std::os::fd::RawFd;
use std::sync::{Arc, Mutex};

use nix::errno::Errno;
use nix::unistd::Pid;
use tracing::{debug, trace, warn};

use crate::errors::{Error, Result};
use crate::io::timeslice::TimesliceMeter;
use crate::readiness::{Direction, ReadinessRegistrar, Token};

/// Where the child process currently stands.
///
/// `Running` until exactly one successful non-blocking reap observes
/// termination; the terminal value is cached and immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitState {
    Running,
    /// Normal exit with the given code.
    Exited(i32),
    /// Terminated by the given signal number.
    Signaled(i32),
    /// Job-control stop; carries no status payload.
    Stopped,
}

pub(crate) struct HandleState {
    /// Write end feeding the child's stdin; `None` once closed.
    pub(crate) input_fd: Option<RawFd>,
    /// Read end draining the child's stdout; `None` once closed.
    pub(crate) output_fd: Option<RawFd>,
    /// Child pid; `None` once reaped.
    pub(crate) pid: Option<Pid>,
    pub(crate) exit_state: ExitState,
}

/// Handle to one spawned process and its two pipe endpoints.
pub struct ProcessHandle {
    pub(crate) state: Mutex<HandleState>,
    pub(crate) registrar: Arc<dyn ReadinessRegistrar>,
    pub(crate) meter: Arc<dyn TimesliceMeter>,
    input_token: Token,
    output_token: Token,
}

impl ProcessHandle {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        input_fd: RawFd,
        output_fd: RawFd,
        pid: Pid,
        input_token: Token,
        output_token: Token,
        registrar: Arc<dyn ReadinessRegistrar>,
        meter: Arc<dyn TimesliceMeter>,
    ) -> Self {
        Self {
            state: Mutex::new(HandleState {
                input_fd: Some(input_fd),
                output_fd: Some(output_fd),
                pid: Some(pid),
                exit_state: ExitState::Running,
            }),
            registrar,
            meter,
            input_token,
            output_token,
        }
    }

    /// Token the host will receive when the input (write) direction becomes
    /// ready after a `WouldBlock`/partial write.
    pub fn input_token(&self) -> Token {
        self.input_token
    }

    /// Token the host will receive when the output (read) direction becomes
    /// ready after a `WouldBlock`/partial read.
    pub fn output_token(&self) -> Token {
        self.output_token
    }

    pub(crate) fn token_for(&self, direction: Direction) -> Token {
        match direction {
            Direction::Input => self.input_token,
            Direction::Output => self.output_token,
        }
    }

    /// Last observed exit state. `Running` until a `wait` call has reaped
    /// the child; the terminal value afterwards.
    pub fn exit_state(&self) -> ExitState {
        self.state.lock().unwrap().exit_state
    }

    /// Close one direction of the handle.
    ///
    /// Idempotent: closing an already-closed direction succeeds. The
    /// direction's readiness subscription is deregistered before the
    /// descriptor is closed, so no stale notification can fire on a
    /// descriptor number the OS may immediately reuse. Closing a direction
    /// does not affect the other one and does not signal the process.
    pub fn close(&self, direction: Direction) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let slot = match direction {
            Direction::Input => &mut state.input_fd,
            Direction::Output => &mut state.output_fd,
        };
        let Some(fd) = *slot else {
            return Ok(());
        };

        if let Err(err) = self.registrar.deregister(fd, direction) {
            warn!(fd, %direction, error = %err, "readiness deregistration failed");
        }

        let rc = unsafe { libc::close(fd) };
        if rc != 0 {
            return Err(Error::Os(Errno::last()));
        }
        *slot = None;
        debug!(fd, %direction, "closed pipe direction");
        Ok(())
    }

    /// Place a readiness registration for `direction` on `fd`.
    pub(crate) fn register_readiness(&self, fd: RawFd, direction: Direction) -> Result<()> {
        let token = self.token_for(direction);
        self.registrar
            .register(fd, direction, token)
            .map_err(Error::Registrar)?;
        trace!(fd, %direction, token = token.0, "registered readiness interest");
        Ok(())
    }
}

impl Drop for ProcessHandle {
    /// Release both directions deterministically, however the owning scope
    /// exits. The child itself is left alone: dropping the handle does not
    /// kill or reap the process.
    fn drop(&mut self) {
        for direction in [Direction::Input, Direction::Output] {
            if let Err(err) = self.close(direction) {
                trace!(%direction, error = %err, "close during drop failed");
            }
        }
    }
}

impl std::fmt::Debug for ProcessHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock().unwrap();
        f.debug_struct("ProcessHandle")
            .field("input_fd", &state.input_fd)
            .field("output_fd", &state.output_fd)
            .field("pid", &state.pid.map(Pid::as_raw))
            .field("exit_state", &state.exit_state)
            .finish()
    }
}
