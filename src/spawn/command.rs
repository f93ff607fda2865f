// src/spawn/command.rs

//! Launch configuration builder.
//!
//! A [`Command`] collects everything the launcher needs — program path,
//! argument vector, environment, optional working directory, and the stderr
//! disposition — and materialises it into C strings *before* the fork, so
//! the child branch never allocates.

use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::handle::ProcessHandle;
use crate::io::timeslice::{NoopMeter, TimesliceMeter};
use crate::readiness::ReadinessRegistrar;
use crate::spawn::launcher;

/// What the child's stderr is wired to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrMode {
    /// Share the parent's stderr.
    #[default]
    Inherit,
    /// Redirect to `/dev/null`.
    Null,
}

/// Builder for launching an external process.
///
/// The program is executed directly (no shell, no `PATH` lookup); give it a
/// resolvable path. The environment passed to the child is exactly the set
/// configured here — call [`Command::inherit_env`] to start from the
/// parent's environment.
///
/// A child-side setup failure (bad working directory, failed fd wiring,
/// failed exec) makes the child exit with the reserved code
/// [`SETUP_FAILURE_EXIT_CODE`](crate::spawn::SETUP_FAILURE_EXIT_CODE).
/// A target program that itself exits with that code is indistinguishable
/// from a launch failure; no side channel exists before exec succeeds.
pub struct Command {
    program: OsString,
    args: Vec<OsString>,
    env: Vec<(OsString, OsString)>,
    inherit_env: bool,
    current_dir: Option<PathBuf>,
    stderr: StderrMode,
    meter: Arc<dyn TimesliceMeter>,
}

impl Command {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            inherit_env: false,
            current_dir: None,
            stderr: StderrMode::Inherit,
            meter: Arc::new(NoopMeter),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Seed the child's environment from the parent's at spawn time.
    /// Variables set with [`Command::env`] are appended afterwards and thus
    /// win for duplicate keys under the usual first/last-wins rules of the
    /// target program's libc.
    pub fn inherit_env(mut self) -> Self {
        self.inherit_env = true;
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.current_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn stderr(mut self, mode: StderrMode) -> Self {
        self.stderr = mode;
        self
    }

    /// Install a scheduler-budget hook; every launch/read/write reports its
    /// syscall cost to it. Defaults to a no-op.
    pub fn timeslice_meter(mut self, meter: Arc<dyn TimesliceMeter>) -> Self {
        self.meter = meter;
        self
    }

    /// Fork and exec, returning a fully-populated handle or a setup error.
    ///
    /// The handle's readiness registrations will be placed with `registrar`.
    pub fn spawn(self, registrar: Arc<dyn ReadinessRegistrar>) -> Result<ProcessHandle> {
        let image = self.materialise()?;
        launcher::spawn(image, self.stderr, registrar, self.meter)
    }

    /// Convert the configuration into the NUL-terminated vectors exec needs.
    fn materialise(&self) -> Result<ExecImage> {
        let program = cstring(self.program.as_os_str().as_bytes())?;

        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(program.clone());
        for arg in &self.args {
            argv.push(cstring(arg.as_os_str().as_bytes())?);
        }

        let mut env = Vec::new();
        if self.inherit_env {
            for (key, value) in std::env::vars_os() {
                env.push(env_entry(&key, &value)?);
            }
        }
        for (key, value) in &self.env {
            env.push(env_entry(key, value)?);
        }

        let dir = match &self.current_dir {
            Some(dir) => Some(cstring(dir.as_os_str().as_bytes())?),
            None => None,
        };

        Ok(ExecImage { program, argv, env, dir })
    }
}

/// Pre-fork snapshot of everything the child branch touches.
#[derive(Debug)]
pub(crate) struct ExecImage {
    pub(crate) program: CString,
    pub(crate) argv: Vec<CString>,
    pub(crate) env: Vec<CString>,
    pub(crate) dir: Option<CString>,
}

fn cstring(bytes: &[u8]) -> Result<CString> {
    Ok(CString::new(bytes)?)
}

fn env_entry(key: &OsString, value: &OsString) -> Result<CString> {
    let mut entry = Vec::with_capacity(key.len() + value.len() + 1);
    entry.extend_from_slice(key.as_os_str().as_bytes());
    entry.push(b'=');
    entry.extend_from_slice(value.as_os_str().as_bytes());
    cstring(&entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;

    #[test]
    fn argv_starts_with_the_program() {
        let image = Command::new("/bin/echo")
            .arg("one")
            .args(["two", "three"])
            .materialise()
            .unwrap();

        let argv: Vec<&str> = image.argv.iter().map(|a| a.to_str().unwrap()).collect();
        assert_eq!(argv, ["/bin/echo", "one", "two", "three"]);
        assert_eq!(image.program.to_str().unwrap(), "/bin/echo");
    }

    #[test]
    fn env_entries_are_key_equals_value() {
        let image = Command::new("/bin/true")
            .env("HOME", "/tmp")
            .env("LANG", "C")
            .materialise()
            .unwrap();

        let env: Vec<&str> = image.env.iter().map(|e| e.to_str().unwrap()).collect();
        assert_eq!(env, ["HOME=/tmp", "LANG=C"]);
    }

    #[test]
    fn interior_nul_is_rejected_before_fork() {
        let err = Command::new("/bin/true")
            .arg(OsString::from("a\0b"))
            .materialise()
            .unwrap_err();

        assert!(matches!(err, Error::NulArgument(_)));
    }

    #[test]
    fn working_dir_is_materialised() {
        let image = Command::new("/bin/true")
            .current_dir("/var/tmp")
            .materialise()
            .unwrap();

        assert_eq!(image.dir.unwrap().to_str().unwrap(), "/var/tmp");
    }
}
