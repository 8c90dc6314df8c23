#![deny(missing_docs)]
//! Shared logging utilities for the cuefinder workspace.
//!
//! This crate provides the `search_*` logging macros used across the codebase,
//! a thread-local tag for the search generation currently being driven, and a
//! minimal test initializer for the global logger.

use std::cell::Cell;

#[doc(hidden)]
pub use log as __log;

thread_local! {
    /// Generation of the search step currently running on this thread.
    static ACTIVE_GENERATION: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Sets the generation tag for the current thread.
/// Messages logged through the `search_*` macros are prefixed with it.
pub fn set_active_generation(generation: Option<u64>) {
    ACTIVE_GENERATION.with(|v| v.set(generation));
}

/// Retrieves the generation tag for the current thread, if any.
pub fn active_generation() -> Option<u64> {
    ACTIVE_GENERATION.with(|v| v.get())
}

/// Tags the current thread with a generation until dropped, then restores the
/// previous tag.
#[must_use = "the tag is removed as soon as the scope is dropped"]
pub struct GenerationScope {
    previous: Option<u64>,
}

impl GenerationScope {
    /// Enters a scope tagged with `generation`.
    pub fn enter(generation: u64) -> Self {
        let previous = active_generation();
        set_active_generation(Some(generation));
        Self { previous }
    }
}

impl Drop for GenerationScope {
    fn drop(&mut self) {
        set_active_generation(self.previous);
    }
}

/// Runs `f` with the thread tagged as `generation`.
///
/// Use this instead of holding a [`GenerationScope`] across an `.await`, where
/// other tasks on the same thread would inherit the tag.
pub fn with_generation<R>(generation: u64, f: impl FnOnce() -> R) -> R {
    let _scope = GenerationScope::enter(generation);
    f()
}

#[doc(hidden)]
#[macro_export]
macro_rules! __search_log {
    ($level:ident, $($arg:tt)*) => {{
        match $crate::active_generation() {
            Some(generation) => {
                $crate::__log::$level!("[g{}] {}", generation, format_args!($($arg)*))
            }
            None => $crate::__log::$level!($($arg)*),
        }
    }};
}

/// Logs a trace-level message, tagged with the active generation.
#[macro_export]
macro_rules! search_trace {
    ($($arg:tt)*) => { $crate::__search_log!(trace, $($arg)*) };
}

/// Logs a debug-level message, tagged with the active generation.
#[macro_export]
macro_rules! search_debug {
    ($($arg:tt)*) => { $crate::__search_log!(debug, $($arg)*) };
}

/// Logs an info-level message, tagged with the active generation.
#[macro_export]
macro_rules! search_info {
    ($($arg:tt)*) => { $crate::__search_log!(info, $($arg)*) };
}

/// Logs a warn-level message, tagged with the active generation.
#[macro_export]
macro_rules! search_warn {
    ($($arg:tt)*) => { $crate::__search_log!(warn, $($arg)*) };
}

/// Logs an error-level message, tagged with the active generation.
#[macro_export]
macro_rules! search_error {
    ($($arg:tt)*) => { $crate::__search_log!(error, $($arg)*) };
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
