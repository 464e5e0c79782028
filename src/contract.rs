//! Names shared between the launcher and the interception library.
//!
//! The launcher includes this file directly instead of linking the library,
//! so it never carries the interposed symbols itself.

/// Shared configuration root whose contents are redirected.
pub const SOURCE_VAR: &str = "CURSOR_REDIRECT_SOURCE";
/// Per-agent root read in place of [`SOURCE_VAR`].
pub const TARGET_VAR: &str = "CURSOR_REDIRECT_TARGET";

/// Loader variable that injects the library into the child.
#[cfg(target_os = "linux")]
pub const PRELOAD_VAR: &str = "LD_PRELOAD";
#[cfg(target_os = "macos")]
pub const PRELOAD_VAR: &str = "DYLD_INSERT_LIBRARIES";

#[cfg(target_os = "linux")]
pub const LIBRARY_FILE_NAME: &str = "libcursor_redirect.so";
#[cfg(target_os = "macos")]
pub const LIBRARY_FILE_NAME: &str = "libcursor_redirect.dylib";

/// Exported symbol returning the library version as a C string.
pub const VERSION_SYMBOL: &[u8] = b"cursor_redirect_version";
