// src/lib.rs

//! Non-blocking external process execution over pipes.
//!
//! `procpipe` launches a child process with its stdin/stdout wired to pipes
//! and drives both directions without ever blocking the calling thread:
//! every syscall operates on a non-blocking descriptor and returns
//! immediately. When an operation cannot complete it registers readiness
//! interest with a host-supplied [`ReadinessRegistrar`] and hands control
//! back; the host's reactor decides when to retry. Hosts running on tokio
//! can use the bundled [`TokioRegistrar`].
//!
//! ```no_run
//! use procpipe::{Command, Direction, Error, TokioRegistrar};
//!
//! # async fn example() -> procpipe::Result<()> {
//! let (registrar, mut ready) = TokioRegistrar::new();
//! let handle = Command::new("/bin/cat").spawn(registrar)?;
//!
//! match handle.write(b"hello") {
//!     Ok(n) => println!("accepted {n} bytes"),
//!     Err(Error::WouldBlock) => {
//!         // retry after the reactor delivers handle.input_token()
//!         let _token = ready.recv().await;
//!     }
//!     Err(other) => return Err(other),
//! }
//! handle.close(Direction::Input)?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod handle;
pub mod io;
pub mod lifecycle;
pub mod logging;
pub mod reactor;
pub mod readiness;
pub mod spawn;

pub use errors::{Error, Result};
pub use handle::{ExitState, ProcessHandle};
pub use io::MAX_CHUNK_SIZE;
pub use io::timeslice::{NoopMeter, TimesliceMeter, timeslice_percent};
pub use reactor::TokioRegistrar;
pub use readiness::{Direction, ReadinessRegistrar, Token};
pub use spawn::{Command, SETUP_FAILURE_EXIT_CODE, StderrMode};
