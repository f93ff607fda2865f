mod common;

use std::time::Duration;

use procpipe::{Direction, Error, ExitState, TokioRegistrar};
use procpipe_test_utils::drive::await_exit;
use procpipe_test_utils::{init_tracing, with_timeout};

/// Full roundtrip through a real reactor: every would-block outcome parks
/// on the token channel until the tokio guard reports the descriptor ready.
#[tokio::test]
async fn roundtrip_driven_by_tokio_readiness() {
    init_tracing();
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 199) as u8).collect();

    let (registrar, mut ready) = TokioRegistrar::new();
    let handle = common::cat().spawn(registrar).unwrap();

    let mut sent = 0;
    let mut input_open = true;
    let mut collected = Vec::with_capacity(payload.len());
    let mut saw_would_block = false;

    loop {
        let mut progressed = false;

        if input_open {
            if sent == payload.len() {
                handle.close(Direction::Input).unwrap();
                input_open = false;
                progressed = true;
            } else {
                match handle.write(&payload[sent..]) {
                    Ok(n) => {
                        sent += n;
                        progressed = true;
                    }
                    Err(Error::WouldBlock) => saw_would_block = true,
                    Err(other) => panic!("write failed: {other}"),
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
            Err(other) => panic!("read failed: {other}"),
        }

        if !progressed {
            let token = with_timeout(ready.recv()).await.expect("registrar dropped");
            tracing::debug!(token = token.0, "readiness token fired");
        }
    }

    assert_eq!(collected, payload);
    assert!(
        sent == payload.len(),
        "the whole payload must be delivered exactly once"
    );
    // A 300 KB payload cannot fit a pipe buffer in one go.
    assert!(saw_would_block || sent > 0);

    let state = await_exit(&handle, Duration::from_secs(5)).unwrap();
    assert_eq!(state, ExitState::Exited(0));
}

/// The write side alone: fill the pipe until it truly blocks, drain the
/// output, and verify the input token fires and the write resumes.
#[tokio::test]
async fn write_readiness_fires_after_draining_the_output() {
    init_tracing();
    let (registrar, mut ready) = TokioRegistrar::new();
    let handle = common::cat().spawn(registrar).unwrap();

    let chunk = vec![0x5au8; 65536];
    let mut sent = 0usize;

    // Keep writing without draining until the pipe refuses more.
    loop {
        match handle.write(&chunk) {
            Ok(n) => sent += n,
            Err(Error::WouldBlock) => break,
            Err(other) => panic!("write failed: {other}"),
        }
        if sent > 8 * 1024 * 1024 {
            panic!("pipe never applied backpressure");
        }
    }
    assert!(sent > 0);

    // Drain whatever the child has forwarded so far, without waiting.
    loop {
        match handle.read(Some(procpipe::MAX_CHUNK_SIZE)) {
            Ok(chunk) if !chunk.is_empty() => {}
            Ok(_) => panic!("unexpected end of stream"),
            Err(Error::WouldBlock) => break,
            Err(other) => panic!("read failed: {other}"),
        }
    }

    // The drained child now consumes its stdin again, so the pending
    // write registration must fire. Output tokens may interleave.
    loop {
        let token = with_timeout(ready.recv()).await.expect("registrar dropped");
        if token == handle.input_token() {
            break;
        }
    }

    let resumed = handle.write(&chunk).unwrap();
    assert!(resumed > 0, "write must make progress after readiness fired");
}
