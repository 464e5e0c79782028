//! Agent isolation for `cursor-agent`.
//!
//! Built as a `cdylib` and injected into `cursor-agent` with `LD_PRELOAD`.
//! Once loaded, file-system calls for paths under `CURSOR_REDIRECT_SOURCE`
//! are served from `CURSOR_REDIRECT_TARGET` instead. Without both variables
//! the library is a pass-through.

use std::ffi::{c_char, c_int};

pub mod contract;
#[cfg(all(target_os = "linux", not(test)))]
mod redirect;
pub mod rule;
pub mod state;

pub use rule::{RedirectConfig, rewrite};
pub use state::RedirectState;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "\0");

/// Library version, as a static NUL-terminated string.
#[unsafe(no_mangle)]
pub extern "C" fn cursor_redirect_version() -> *const c_char {
    VERSION.as_ptr().cast()
}

/// Current [`RedirectState`] as an integer (0 unconfigured, 1 disabled, 2 configured).
#[unsafe(no_mangle)]
pub extern "C" fn cursor_redirect_state() -> c_int {
    state::state() as c_int
}
