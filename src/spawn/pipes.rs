// src/spawn/pipes.rs

//! Pipe setup for a child's stdin and stdout.
//!
//! Both pipes are created close-on-exec so that neither end leaks into the
//! child beyond what the launcher explicitly `dup2`s onto the standard
//! streams. The two parent-retained ends additionally get `O_NONBLOCK`, so
//! every later read/write attempt returns immediately.

use std::os::fd::{AsRawFd, OwnedFd, RawFd};

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::unistd::pipe2;

use crate::errors::Result;

/// Both ends of one pipe. Dropping an end closes it.
pub(crate) struct PipePair {
    pub(crate) read: OwnedFd,
    pub(crate) write: OwnedFd,
}

/// The two pipes wired to a child: `input` carries parent → child-stdin,
/// `output` carries child-stdout → parent.
pub(crate) struct StdioPipes {
    pub(crate) input: PipePair,
    pub(crate) output: PipePair,
}

impl StdioPipes {
    /// Create both pipes and flag the parent-retained ends non-blocking.
    ///
    /// On any failure every descriptor opened so far is closed before the
    /// error is returned; callers never see a half-built set.
    pub(crate) fn create() -> Result<Self> {
        let (input_read, input_write) = pipe2(OFlag::O_CLOEXEC)?;
        let (output_read, output_write) = pipe2(OFlag::O_CLOEXEC)?;

        set_nonblocking(input_write.as_raw_fd())?;
        set_nonblocking(output_read.as_raw_fd())?;

        Ok(Self {
            input: PipePair {
                read: input_read,
                write: input_write,
            },
            output: PipePair {
                read: output_read,
                write: output_write,
            },
        })
    }
}

fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(Errno::last().into());
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(Errno::last().into());
    }
    Ok(())
}
