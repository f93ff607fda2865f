#![allow(dead_code)]

use procpipe::Command;

/// A command that copies stdin to stdout until end of stream.
pub fn cat() -> Command {
    Command::new("/bin/cat")
}

/// Run a shell snippet. Used for fixtures only; the library itself never
/// involves a shell.
pub fn sh(script: &str) -> Command {
    Command::new("/bin/sh").arg("-c").arg(script)
}
