//! Tracing helpers that vanish from release builds.
//!
//! With the `tracing` feature enabled the macros forward to the `tracing` crate,
//! otherwise they expand to nothing. The trees log lost CAS races, help dispatches
//! and search restarts at `trace` level and relocation outcomes at `debug` level.
//!
//! ```bash
//! RUST_LOG=nbbst::ebr::howley_tree=trace cargo test --features tracing
//! ```

#![allow(unused_macros)]

/// Trace-level logging. Compiles to a no-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

/// Debug-level logging. Compiles to a no-op without the `tracing` feature.
#[cfg(feature = "tracing")]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}
