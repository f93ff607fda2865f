// src/spawn/launcher.rs

//! Fork/exec core.
//!
//! The child branch runs between `fork` and `execve` and is restricted to
//! async-signal-safe libc calls: no allocation, no locking, no tracing.
//! Everything it touches (C strings, pointer vectors, raw fds) is prepared
//! in the parent before the fork.
//!
//! A child-side failure is reported through the only channel that exists
//! before exec succeeds: the child exits with [`SETUP_FAILURE_EXIT_CODE`].

use std::ffi::CString;
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::sync::Arc;
use std::time::Instant;

use libc::c_char;
use nix::unistd::{ForkResult, fork};
use tracing::debug;

use crate::errors::Result;
use crate::handle::ProcessHandle;
use crate::io::timeslice::{TimesliceMeter, timeslice_percent};
use crate::readiness::{ReadinessRegistrar, next_token_pair};
use crate::spawn::command::ExecImage;
use crate::spawn::pipes::StdioPipes;
use crate::spawn::StderrMode;

/// Exit code a child uses to signal a setup or exec failure.
///
/// 125 sits outside the codes commonly produced by well-behaved programs,
/// but nothing reserves it: a target program exiting 125 on its own is
/// indistinguishable from a failed launch.
pub const SETUP_FAILURE_EXIT_CODE: i32 = 125;

pub(crate) fn spawn(
    image: ExecImage,
    stderr: StderrMode,
    registrar: Arc<dyn ReadinessRegistrar>,
    meter: Arc<dyn TimesliceMeter>,
) -> Result<ProcessHandle> {
    let start = Instant::now();

    let pipes = StdioPipes::create()?;
    let child_stdin = pipes.input.read.as_raw_fd();
    let child_stdout = pipes.output.write.as_raw_fd();

    let argv_ptrs = nul_terminated(&image.argv);
    let env_ptrs = nul_terminated(&image.env);

    match unsafe { fork() }? {
        ForkResult::Child => {
            unsafe { child_exec(&image, &argv_ptrs, &env_ptrs, child_stdin, child_stdout, stderr) }
        }
        ForkResult::Parent { child } => {
            // These two ends now belong to the child.
            drop(pipes.input.read);
            drop(pipes.output.write);

            let input_fd = pipes.input.write.into_raw_fd();
            let output_fd = pipes.output.read.into_raw_fd();
            let (input_token, output_token) = next_token_pair();

            debug!(
                pid = child.as_raw(),
                input_fd,
                output_fd,
                "spawned child process"
            );

            let handle = ProcessHandle::new(
                input_fd,
                output_fd,
                child,
                input_token,
                output_token,
                registrar,
                meter.clone(),
            );
            meter.consumed(timeslice_percent(start.elapsed()));
            Ok(handle)
        }
    }
}

/// Build the NUL-terminated pointer vector exec expects. The returned
/// pointers borrow from `strings`, which must outlive any use.
fn nul_terminated(strings: &[CString]) -> Vec<*const c_char> {
    let mut ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
    ptrs.push(std::ptr::null());
    ptrs
}

/// Child-side setup. Never returns: either execs or exits with the sentinel.
unsafe fn child_exec(
    image: &ExecImage,
    argv: &[*const c_char],
    env: &[*const c_char],
    child_stdin: RawFd,
    child_stdout: RawFd,
    stderr: StderrMode,
) -> ! {
    unsafe {
        if let Some(dir) = &image.dir {
            if libc::chdir(dir.as_ptr()) != 0 {
                child_fail(b"procpipe: failed to change directory\n");
            }
        }

        libc::close(libc::STDIN_FILENO);
        libc::close(libc::STDOUT_FILENO);

        if libc::dup2(child_stdin, libc::STDIN_FILENO) < 0 {
            child_fail(b"procpipe: failed to dup stdin\n");
        }
        if libc::dup2(child_stdout, libc::STDOUT_FILENO) < 0 {
            child_fail(b"procpipe: failed to dup stdout\n");
        }

        if stderr == StderrMode::Null {
            libc::close(libc::STDERR_FILENO);
            let dev_null = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
            if dev_null < 0 {
                child_fail(b"procpipe: failed to open /dev/null\n");
            }
            if libc::dup2(dev_null, libc::STDERR_FILENO) < 0 {
                child_fail(b"procpipe: failed to dup stderr\n");
            }
            libc::close(dev_null);
        }

        close_descriptors_above_stderr();

        libc::execve(image.program.as_ptr(), argv.as_ptr(), env.as_ptr());
        child_fail(b"procpipe: exec failed\n");
    }
}

/// Defensive sweep against descriptors inherited from the parent that were
/// opened without close-on-exec before this crate took control. There is no
/// portable way to enumerate open descriptors, so close everything above
/// stderr up to the process limit.
unsafe fn close_descriptors_above_stderr() {
    unsafe {
        let mut limit = libc::sysconf(libc::_SC_OPEN_MAX);
        if limit < 0 {
            limit = 1024;
        }
        let limit = limit.min(RawFd::MAX as libc::c_long) as RawFd;
        for fd in (libc::STDERR_FILENO + 1)..limit {
            libc::close(fd);
        }
    }
}

unsafe fn child_fail(msg: &[u8]) -> ! {
    unsafe {
        let _ = libc::write(libc::STDERR_FILENO, msg.as_ptr().cast(), msg.len());
        libc::_exit(SETUP_FAILURE_EXIT_CODE);
    }
}
