// src/lifecycle.rs

//! Process lifecycle: signal delivery, non-blocking reap, exit
//! classification.
//!
//! The lifecycle is a one-way state machine: `running` until exactly one
//! successful non-blocking reap observes termination, then permanently
//! `exited` / `signaled` / `stopped`. Once reaped the pid may be recycled
//! by the OS, so every operation short-circuits on the cached terminal
//! state instead of touching the pid again.

use nix::sys::signal::{Signal, kill};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use tracing::debug;

use crate::errors::{Error, Result};
use crate::handle::{ExitState, ProcessHandle};

impl ProcessHandle {
    /// Non-blocking reap attempt.
    ///
    /// Returns the terminal classification once the child has changed
    /// state; afterwards every call returns the cached value without a
    /// syscall. While the child is still running this returns
    /// [`Error::WaitPending`] carrying the raw observation, and an
    /// unrecognised wait status is surfaced as [`Error::WaitAnomaly`]
    /// rather than swallowed.
    pub fn wait(&self) -> Result<ExitState> {
        let mut state = self.state.lock().unwrap();
        let Some(pid) = state.pid else {
            return Ok(state.exit_state);
        };

        let observed = match waitpid(pid, Some(WaitPidFlag::WNOHANG))? {
            WaitStatus::StillAlive => return Err(Error::WaitPending { pid: 0, status: 0 }),
            WaitStatus::Exited(_, code) => ExitState::Exited(code),
            WaitStatus::Signaled(_, signal, _) => ExitState::Signaled(signal as i32),
            WaitStatus::Stopped(_, _) => ExitState::Stopped,
            other => {
                return Err(Error::WaitAnomaly {
                    pid: pid.as_raw(),
                    observed: format!("{other:?}"),
                });
            }
        };

        state.exit_state = observed;
        state.pid = None;
        debug!(pid = pid.as_raw(), exit_state = ?observed, "reaped child process");
        Ok(observed)
    }

    /// Send SIGTERM. No-op success once the child has been reaped.
    pub fn terminate(&self) -> Result<()> {
        self.signal(Signal::SIGTERM)
    }

    /// Send SIGKILL. No-op success once the child has been reaped.
    pub fn kill(&self) -> Result<()> {
        self.signal(Signal::SIGKILL)
    }

    fn signal(&self, signal: Signal) -> Result<()> {
        let state = self.state.lock().unwrap();
        let Some(pid) = state.pid else {
            return Ok(());
        };
        kill(pid, signal)?;
        debug!(pid = pid.as_raw(), %signal, "delivered signal");
        Ok(())
    }

    /// Whether the child is still running.
    ///
    /// While unreaped this probes the process with a zero signal; once a
    /// terminal state has been recorded it is `false` without a syscall.
    pub fn is_alive(&self) -> bool {
        let state = self.state.lock().unwrap();
        match state.pid {
            Some(pid) => kill(pid, None::<Signal>).is_ok(),
            None => false,
        }
    }

    /// The child's OS pid, or 0 once it has been reaped.
    pub fn pid(&self) -> i32 {
        let state = self.state.lock().unwrap();
        state.pid.map_or(0, |pid| pid.as_raw())
    }
}
