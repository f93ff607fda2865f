//! Drive loops shared by the integration and property tests.

use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use procpipe::{Direction, Error, ExitState, ProcessHandle};

use crate::pump::PollPump;

/// Feed `payload` into the child and collect its output until end of
/// stream, retrying through the pump whenever neither direction can make
/// progress. Exercises full, partial, and would-block outcomes on both
/// directions for payloads larger than the pipe capacity.
pub fn roundtrip_through(
    handle: &ProcessHandle,
    pump: &PollPump,
    payload: &[u8],
) -> anyhow::Result<Vec<u8>> {
    let deadline = Instant::now() + Duration::from_secs(30);
    let mut sent = 0;
    let mut input_open = true;
    let mut collected = Vec::with_capacity(payload.len());

    loop {
        if Instant::now() > deadline {
            bail!("roundtrip did not finish within 30s ({sent} sent, {} read)", collected.len());
        }

        let mut progressed = false;

        if input_open {
            if sent == payload.len() {
                handle.close(Direction::Input).context("closing input")?;
                input_open = false;
                progressed = true;
            } else {
                match handle.write(&payload[sent..]) {
                    Ok(n) => {
                        sent += n;
                        progressed = true;
                    }
                    Err(Error::WouldBlock) => {}
                    Err(other) => return Err(other).context("writing payload"),
                }
            }
        }

        match handle.read(Some(procpipe::MAX_CHUNK_SIZE)) {
            Ok(chunk) if chunk.is_empty() => break,
            Ok(chunk) => {
                collected.extend_from_slice(&chunk);
                progressed = true;
            }
            Err(Error::WouldBlock) => {}
            Err(other) => return Err(other).context("reading output"),
        }

        if !progressed {
            pump.pump(Duration::from_millis(100));
        }
    }

    Ok(collected)
}

/// Repeatedly attempt a non-blocking reap until the child reaches a
/// terminal state or `timeout` elapses.
pub fn await_exit(handle: &ProcessHandle, timeout: Duration) -> anyhow::Result<ExitState> {
    let deadline = Instant::now() + timeout;
    loop {
        match handle.wait() {
            Ok(state) => return Ok(state),
            Err(Error::WaitPending { .. }) => {
                if Instant::now() > deadline {
                    bail!("child did not exit within {timeout:?}");
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(other) => return Err(other).context("waiting for child"),
        }
    }
}

/// Read everything until end of stream, waiting through the pump on
/// would-block.
pub fn read_to_end(handle: &ProcessHandle, pump: &PollPump) -> anyhow::Result<Vec<u8>> {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut collected = Vec::new();
    loop {
        if Instant::now() > deadline {
            bail!("output did not reach end of stream within 10s");
        }
        match handle.read(Some(procpipe::MAX_CHUNK_SIZE)) {
            Ok(chunk) if chunk.is_empty() => return Ok(collected),
            Ok(chunk) => collected.extend_from_slice(&chunk),
            Err(Error::WouldBlock) => {
                pump.pump(Duration::from_millis(50));
            }
            Err(other) => return Err(other).context("reading output"),
        }
    }
}
