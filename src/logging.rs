// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The library itself only emits `tracing` events; embedding applications
//! normally install their own subscriber. This helper is for binaries and
//! examples that want a sensible default:
//! 1. `RUST_LOG` (standard env-filter syntax), else
//! 2. `PROCPIPE_LOG` (a bare level like "debug"), else
//! 3. `info`.

use tracing_subscriber::{EnvFilter, fmt};

/// Initialise a global logging subscriber.
///
/// Safe to call once at startup; a second call will panic, as with any
/// global subscriber installation.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            std::env::var("PROCPIPE_LOG").map(|level| EnvFilter::new(level.trim().to_lowercase()))
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}
