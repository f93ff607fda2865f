mod common;

use std::time::Duration;

use procpipe::{Direction, Error, ExitState};
use procpipe_test_utils::drive::{await_exit, read_to_end};
use procpipe_test_utils::init_tracing;
use procpipe_test_utils::pump::PollPump;

#[test]
fn double_close_is_a_noop() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    handle.close(Direction::Input).unwrap();
    handle.close(Direction::Input).unwrap();
    handle.close(Direction::Output).unwrap();
    handle.close(Direction::Output).unwrap();
}

#[test]
fn read_after_close_returns_closed_without_a_syscall() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    handle.close(Direction::Output).unwrap();

    // A syscall on the stale fd would surface EBADF as Error::Os; the
    // fail-fast path must report Closed instead.
    match handle.read(Some(16)) {
        Err(Error::Closed(Direction::Output)) => {}
        other => panic!("expected Closed(Output), got {other:?}"),
    }
}

#[test]
fn write_after_close_returns_closed_without_a_syscall() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    handle.close(Direction::Input).unwrap();

    match handle.write(b"late") {
        Err(Error::Closed(Direction::Input)) => {}
        other => panic!("expected Closed(Input), got {other:?}"),
    }
}

#[test]
fn empty_write_is_a_caller_error() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    match handle.write(b"") {
        Err(Error::EmptyWrite) => {}
        other => panic!("expected EmptyWrite, got {other:?}"),
    }
}

#[test]
fn close_drops_the_pending_subscription() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    // Nothing to read yet: registers output readiness.
    match handle.read(Some(16)) {
        Err(Error::WouldBlock) => {}
        other => panic!("expected WouldBlock, got {other:?}"),
    }
    assert!(pump.is_registered(handle.output_token()));

    handle.close(Direction::Output).unwrap();
    assert!(
        !pump.is_registered(handle.output_token()),
        "close must deregister before releasing the descriptor"
    );
}

#[test]
fn drop_releases_both_directions() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    match handle.read(Some(16)) {
        Err(Error::WouldBlock) => {}
        other => panic!("expected WouldBlock, got {other:?}"),
    }
    assert_eq!(pump.registration_count(), 1);

    drop(handle);
    assert_eq!(
        pump.registration_count(),
        0,
        "dropping the handle must deregister every subscription"
    );
}

/// Closing the input direction signals end of stream to the child but does
/// not kill it; the output direction keeps working independently.
#[test]
fn closing_input_leaves_output_and_process_intact() {
    init_tracing();
    let pump = PollPump::new();
    let handle = common::cat().spawn(pump.clone()).unwrap();

    assert_eq!(handle.write(b"x").unwrap(), 1);
    handle.close(Direction::Input).unwrap();

    let out = read_to_end(&handle, &pump).unwrap();
    assert_eq!(out, b"x");

    let state = await_exit(&handle, Duration::from_secs(5)).unwrap();
    assert_eq!(state, ExitState::Exited(0));
}
