mod common;

use std::time::Duration;

use procpipe::ExitState;
use procpipe_test_utils::drive::{await_exit, roundtrip_through};
use procpipe_test_utils::init_tracing;
use procpipe_test_utils::pump::PollPump;
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    /// Whatever goes in comes back out, byte for byte, regardless of how
    /// the individual writes and reads were satisfied.
    #[test]
    fn roundtrip_preserves_arbitrary_payloads(
        payload in proptest::collection::vec(any::<u8>(), 1..131_072usize)
    ) {
        init_tracing();
        let pump = PollPump::new();
        let handle = common::cat().spawn(pump.clone()).unwrap();

        let out = roundtrip_through(&handle, &pump, &payload).unwrap();
        prop_assert_eq!(&out, &payload);

        let state = await_exit(&handle, Duration::from_secs(5)).unwrap();
        prop_assert_eq!(state, ExitState::Exited(0));
    }
}
