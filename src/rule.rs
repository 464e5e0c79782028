//! Lexical path rewrite rule
//!
//! A path is redirected when it is the source directory itself or lies below
//! it on a segment boundary. Nothing here touches the file system: symlinks
//! are never resolved, so the rule is safe to run inside file-system hooks.
//! The byte-level entry points write into a fixed [`PathBuffer`] and never
//! allocate.

use crate::contract::{SOURCE_VAR, TARGET_VAR};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString, c_char};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};

/// Unprefixed pair, used only when neither prefixed variable is set.
pub const FALLBACK_SOURCE_VAR: &str = "REDIRECT_SOURCE";
pub const FALLBACK_TARGET_VAR: &str = "REDIRECT_TARGET";

/// Size of a [`PathBuffer`], terminator included.
pub const PATH_CAPACITY: usize = libc::PATH_MAX as usize;

/// NUL-terminated path held on the stack.
///
/// Every push keeps room for the terminator, so `as_ptr` is always a valid C
/// string no longer than `PATH_MAX` bytes.
pub struct PathBuffer {
    bytes: [u8; PATH_CAPACITY],
    len: usize,
}

impl Default for PathBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl PathBuffer {
    pub const fn new() -> Self {
        Self {
            bytes: [0; PATH_CAPACITY],
            len: 0,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn as_bytes_with_nul(&self) -> &[u8] {
        &self.bytes[..=self.len]
    }

    pub fn as_ptr(&self) -> *const c_char {
        self.bytes.as_ptr().cast()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    fn truncate(&mut self, len: usize) {
        self.len = len;
        self.bytes[len] = 0;
    }

    /// Append `bytes`; `None` when the result would not fit.
    pub fn push(&mut self, bytes: &[u8]) -> Option<()> {
        let end = self.len + bytes.len();
        if end >= PATH_CAPACITY {
            return None;
        }
        self.bytes[self.len..end].copy_from_slice(bytes);
        self.truncate(end);
        Some(())
    }

    /// Append `path` as a child of the current contents.
    pub fn join(&mut self, path: &[u8]) -> Option<()> {
        if !self.as_bytes().ends_with(b"/") {
            self.push(b"/")?;
        }
        self.push(path)
    }

    /// Let `fill` write a C string over the whole buffer, as `getcwd` does.
    ///
    /// `fill` returns `false` on failure, which leaves the buffer empty.
    pub fn fill(&mut self, fill: impl FnOnce(&mut [u8]) -> bool) -> Option<()> {
        let filled = fill(&mut self.bytes);
        match self.bytes.iter().position(|&b| b == 0) {
            Some(len) if filled => {
                self.len = len;
                Some(())
            }
            _ => {
                self.clear();
                None
            }
        }
    }
}

/// Outcome of a byte-level rewrite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rewrite {
    /// Use the original path.
    Unchanged,
    /// The output buffer holds the new path.
    Rewritten,
    /// The new path would exceed `PATH_MAX`.
    TooLong,
}

/// Source/target directory pair, both absolute and lexically normalized
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RedirectConfig {
    source: PathBuf,
    target: PathBuf,
}

impl RedirectConfig {
    /// Build a config from two absolute directories.
    ///
    /// Returns `None` for relative or empty paths, and for a source that
    /// normalizes to `/`.
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Option<Self> {
        let source = normalize(source.as_ref().as_os_str().as_bytes())?;
        let target = normalize(target.as_ref().as_os_str().as_bytes())?;
        if source == b"/" {
            return None;
        }
        Some(Self {
            source: PathBuf::from(OsString::from_vec(source)),
            target: PathBuf::from(OsString::from_vec(target)),
        })
    }

    /// Build a config from raw variable values; unset or empty means disabled.
    pub fn from_vars(source: Option<&OsStr>, target: Option<&OsStr>) -> Option<Self> {
        match (source, target) {
            (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => Self::new(s, t),
            _ => None,
        }
    }

    /// Read the config through `lookup`.
    ///
    /// The prefixed pair wins as soon as either of its variables is set, so a
    /// half-set prefixed pair disables redirection instead of mixing pairs.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Option<Self> {
        let (source, target) = match (lookup(SOURCE_VAR), lookup(TARGET_VAR)) {
            (None, None) => (lookup(FALLBACK_SOURCE_VAR), lookup(FALLBACK_TARGET_VAR)),
            pair => pair,
        };
        Self::from_vars(source.as_deref(), target.as_deref())
    }

    /// Read the config from the process environment.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var_os(key))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    fn source_bytes(&self) -> &[u8] {
        self.source.as_os_str().as_bytes()
    }

    fn target_bytes(&self) -> &[u8] {
        self.target.as_os_str().as_bytes()
    }

    /// Rewrite `path` if it lies under the source directory.
    ///
    /// Clean paths keep their raw suffix; paths with `.`, `..` or repeated
    /// separators are normalized first.
    pub fn rewrite<'a>(&self, path: &'a Path) -> Cow<'a, Path> {
        match self.rewrite_bytes(path.as_os_str().as_bytes()) {
            Some(v) => Cow::Owned(PathBuf::from(OsString::from_vec(v))),
            None => Cow::Borrowed(path),
        }
    }

    /// Byte-level rewrite; `None` means the path is left untouched.
    pub fn rewrite_bytes(&self, path: &[u8]) -> Option<Vec<u8>> {
        let mut out = PathBuffer::new();
        match self.rewrite_into(path, &mut out) {
            Rewrite::Rewritten => Some(out.as_bytes().to_vec()),
            Rewrite::Unchanged | Rewrite::TooLong => None,
        }
    }

    /// Rewrite an absolute `path` into `out`.
    pub fn rewrite_into(&self, path: &[u8], out: &mut PathBuffer) -> Rewrite {
        if self.source == self.target || path.first() != Some(&b'/') {
            return Rewrite::Unchanged;
        }
        map_prefix(path, self.source_bytes(), self.target_bytes(), out)
    }

    /// Map an absolute `path` under the target back under the source.
    ///
    /// Used for paths the host gets back from the file system, so that
    /// reopening them lands on the same file again.
    pub fn restore_into(&self, path: &[u8], out: &mut PathBuffer) -> Rewrite {
        if self.source == self.target || path.first() != Some(&b'/') {
            return Rewrite::Unchanged;
        }
        map_prefix(path, self.target_bytes(), self.source_bytes(), out)
    }
}

/// Replace the `from` directory prefix of `path` with `to`.
fn map_prefix(path: &[u8], from: &[u8], to: &[u8], out: &mut PathBuffer) -> Rewrite {
    if is_lexically_clean(path) {
        return match strip_dir_prefix(path, from) {
            Some(rest) => join_prefix(to, rest, out),
            None => Rewrite::Unchanged,
        };
    }
    // "/src/../x" must not match on its raw prefix
    let mut normalized = PathBuffer::new();
    if normalize_into(path, &mut normalized).is_none() {
        return Rewrite::TooLong;
    }
    if path.ends_with(b"/") && normalized.len() > 1 && normalized.push(b"/").is_none() {
        return Rewrite::TooLong;
    }
    match strip_dir_prefix(normalized.as_bytes(), from) {
        Some(rest) => join_prefix(to, rest, out),
        None => Rewrite::Unchanged,
    }
}

fn join_prefix(prefix: &[u8], rest: &[u8], out: &mut PathBuffer) -> Rewrite {
    out.clear();
    // avoid "//x" when the prefix is the root
    let prefix = if prefix == b"/" && !rest.is_empty() {
        &[][..]
    } else {
        prefix
    };
    match out.push(prefix).and_then(|()| out.push(rest)) {
        Some(()) => Rewrite::Rewritten,
        None => Rewrite::TooLong,
    }
}

/// Rewrite `path` for an optional source/target pair.
///
/// Either side unset means pass-through.
pub fn rewrite<'a>(path: &'a Path, source: Option<&Path>, target: Option<&Path>) -> Cow<'a, Path> {
    match (source, target) {
        (Some(s), Some(t)) => match RedirectConfig::new(s, t) {
            Some(config) => config.rewrite(path),
            None => Cow::Borrowed(path),
        },
        _ => Cow::Borrowed(path),
    }
}

/// Strip `dir` from the front of `path` on a segment boundary.
///
/// The remainder is empty or starts with `/`.
fn strip_dir_prefix<'a>(path: &'a [u8], dir: &[u8]) -> Option<&'a [u8]> {
    if dir == b"/" {
        return Some(if path == b"/" { &[] } else { path });
    }
    let rest = path.strip_prefix(dir)?;
    match rest.first() {
        None | Some(b'/') => Some(rest),
        Some(_) => None,
    }
}

fn is_lexically_clean(path: &[u8]) -> bool {
    !path.windows(2).any(|w| w == b"//")
        && !path
            .split(|&b| b == b'/')
            .any(|segment| segment == b"." || segment == b"..")
}

/// Lexically normalize an absolute path.
///
/// Collapses repeated separators, drops `.` segments, and lets `..` pop the
/// previous segment (never above `/`). The trailing separator is dropped.
/// Relative or empty input yields `None`.
pub fn normalize(path: &[u8]) -> Option<Vec<u8>> {
    let mut out = PathBuffer::new();
    normalize_into(path, &mut out)?;
    Some(out.as_bytes().to_vec())
}

/// [`normalize`] into a fixed buffer; `None` also when the result is too long.
pub fn normalize_into(path: &[u8], out: &mut PathBuffer) -> Option<()> {
    if path.first() != Some(&b'/') {
        return None;
    }
    out.clear();
    for segment in path.split(|&b| b == b'/') {
        match segment {
            b"" | b"." => {}
            b".." => {
                let cut = out.as_bytes().iter().rposition(|&b| b == b'/').unwrap_or(0);
                out.truncate(cut);
            }
            _ => {
                out.push(b"/")?;
                out.push(segment)?;
            }
        }
    }
    if out.is_empty() {
        out.push(b"/")?;
    }
    Some(())
}
