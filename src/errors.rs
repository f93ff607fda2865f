// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Transient conditions ([`Error::WouldBlock`], [`Error::WaitPending`]) are
//! modelled as errors so they travel through `?`, but they are not failures:
//! they mean "retry later". `WouldBlock` is always paired with a fresh
//! readiness registration on the affected direction.

use thiserror::Error;

use crate::readiness::Direction;

#[derive(Error, Debug)]
pub enum Error {
    /// The named direction of the handle was closed by an earlier `close`
    /// call. No syscall was attempted.
    #[error("the {0} direction of this handle is closed")]
    Closed(Direction),

    /// The non-blocking syscall could not make progress right now. A
    /// readiness registration has been placed; retry once it fires.
    #[error("operation would block; retry after the readiness notification")]
    WouldBlock,

    /// Writes of zero bytes are a caller error, not a no-op.
    #[error("cannot write an empty payload")]
    EmptyWrite,

    /// Buffered reads must request at least one byte.
    #[error("read size must be at least one byte")]
    ZeroSizedRead,

    /// The child has not changed state yet. Carries the raw pid/status pair
    /// observed by the non-blocking wait (0/0 when nothing changed at all).
    #[error("process has not changed state yet (waitpid observed pid {pid}, status {status})")]
    WaitPending { pid: i32, status: i32 },

    /// The non-blocking wait observed something that is neither "still
    /// running" nor a recognised terminal state.
    #[error("unexpected wait observation for pid {pid}: {observed}")]
    WaitAnomaly { pid: i32, observed: String },

    /// An argument destined for exec contained an interior NUL byte and
    /// cannot be represented as a C string.
    #[error("argument contains an interior NUL byte")]
    NulArgument(#[from] std::ffi::NulError),

    /// An OS error returned verbatim, with the raw errno preserved.
    #[error("os error: {0}")]
    Os(#[from] nix::errno::Errno),

    /// The host's readiness registrar refused a registration.
    #[error("readiness registrar failed: {0}")]
    Registrar(#[source] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
