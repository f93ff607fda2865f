// src/io/mod.rs

//! Non-blocking pipe I/O engine.
//!
//! Each operation issues exactly one syscall on a non-blocking descriptor
//! and classifies the outcome. The engine never retries, never buffers, and
//! never blocks: when an operation cannot complete it places a readiness
//! registration and returns, leaving the retry policy to the caller.

pub mod timeslice;

use std::time::Instant;

use nix::errno::Errno;
use tracing::trace;

use crate::errors::{Error, Result};
use crate::handle::ProcessHandle;
use crate::io::timeslice::timeslice_percent;
use crate::readiness::Direction;

/// Upper bound on a single read, regardless of the requested size.
pub const MAX_CHUNK_SIZE: usize = 65535;

impl ProcessHandle {
    /// Attempt a single non-blocking write of `bytes` to the child's stdin.
    ///
    /// - `Ok(n)` with `n == bytes.len()`: fully consumed.
    /// - `Ok(n)` with `n < bytes.len()`: partially consumed; a
    ///   write-readiness registration has been placed and the caller is
    ///   responsible for resubmitting the remainder.
    /// - `Err(WouldBlock)`: nothing was accepted; registration placed.
    /// - `Err(Closed)`: the input direction was closed; no syscall issued.
    /// - `Err(Os)`: any other OS error, verbatim. The direction stays open;
    ///   whether to close it is the caller's decision.
    pub fn write(&self, bytes: &[u8]) -> Result<usize> {
        let start = Instant::now();
        let state = self.state.lock().unwrap();
        let fd = state.input_fd.ok_or(Error::Closed(Direction::Input))?;

        if bytes.is_empty() {
            return Err(Error::EmptyWrite);
        }

        let written = unsafe { libc::write(fd, bytes.as_ptr().cast(), bytes.len()) };
        let errno = Errno::last();
        self.meter.consumed(timeslice_percent(start.elapsed()));
        trace!(
            fd,
            requested = bytes.len(),
            written,
            elapsed_us = start.elapsed().as_micros() as u64,
            "write attempt"
        );

        if written >= bytes.len() as isize {
            Ok(written as usize)
        } else if written >= 0 {
            self.register_readiness(fd, Direction::Input)?;
            Ok(written as usize)
        } else if errno == Errno::EAGAIN || errno == Errno::EWOULDBLOCK {
            self.register_readiness(fd, Direction::Input)?;
            Err(Error::WouldBlock)
        } else {
            Err(Error::Os(errno))
        }
    }

    /// Attempt a single non-blocking read from the child's stdout.
    ///
    /// `request` selects the mode:
    /// - `Some(n)` — buffered: read up to `n` bytes (capped at
    ///   [`MAX_CHUNK_SIZE`]). A nonzero result shorter than `n` places a
    ///   read-readiness registration, since more may already be on the way.
    /// - `None` — unbuffered: one best-effort read at the cap; never places
    ///   a registration for a short result.
    ///
    /// `Ok` with an empty buffer means end of stream; stop reading.
    /// `Err(WouldBlock)` means nothing was ready; a registration has been
    /// placed. Other errnos are returned verbatim with the direction left
    /// open.
    pub fn read(&self, request: Option<usize>) -> Result<Vec<u8>> {
        let start = Instant::now();
        let state = self.state.lock().unwrap();
        let fd = state.output_fd.ok_or(Error::Closed(Direction::Output))?;

        let capacity = match request {
            Some(0) => return Err(Error::ZeroSizedRead),
            Some(n) => n.min(MAX_CHUNK_SIZE),
            None => MAX_CHUNK_SIZE,
        };

        let mut buf = vec![0u8; capacity];
        let count = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), capacity) };
        let errno = Errno::last();
        self.meter.consumed(timeslice_percent(start.elapsed()));
        trace!(
            fd,
            capacity,
            count,
            elapsed_us = start.elapsed().as_micros() as u64,
            "read attempt"
        );

        if count >= 0 {
            let count = count as usize;
            buf.truncate(count);
            // A short but nonzero buffered read hints that more output is
            // in flight; subscribe so the caller hears about it.
            let satisfied = match request {
                Some(n) => count == n || count == 0,
                None => true,
            };
            if !satisfied {
                self.register_readiness(fd, Direction::Output)?;
            }
            Ok(buf)
        } else if errno == Errno::EAGAIN || errno == Errno::EWOULDBLOCK {
            self.register_readiness(fd, Direction::Output)?;
            Err(Error::WouldBlock)
        } else {
            Err(Error::Os(errno))
        }
    }
}
