//! Shared test setup.
//!
//! `RUST_LOG` filters the output (for example `RUST_LOG=nbbst=trace`); the trees only
//! emit events when built with `--features tracing`.

#![allow(dead_code)]

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Installs a console subscriber once per test binary.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_thread_ids(true)
            .with_test_writer()
            .try_init();
    });
}
