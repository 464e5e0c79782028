//! Path redirect functions for LD_PRELOAD
//!
//! Every hook rewrites its path arguments with the process-wide
//! [`RedirectConfig`](crate::rule::RedirectConfig) and calls the next
//! definition of the same symbol, found with `dlsym(RTLD_NEXT, ...)`.
//!
//! # Safety
//!
//! All functions in this module are FFI wrappers that intercept libc calls.
//! They require the same safety guarantees as the original libc functions:
//! - Pointers must be valid and point to properly initialized memory
//! - String pointers must be null-terminated C strings
//! - Buffer sizes must be accurate
#![allow(clippy::missing_safety_doc)]
#![allow(unsafe_op_in_unsafe_fn)]

use crate::rule::{PathBuffer, Rewrite};
use crate::state;
use ctor::ctor;
use libc::{DIR, FILE, c_char, c_int, c_uint, c_void, mode_t, off_t, size_t, ssize_t};
use std::cell::Cell;
use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

// Thread-local recursion guard to prevent infinite recursion in hooks
thread_local! {
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// RAII guard for recursion protection
struct RecursionGuard;

impl RecursionGuard {
    /// Try to enter hook. Returns Some(guard) if not already in hook, None otherwise.
    fn try_enter() -> Option<Self> {
        IN_HOOK.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(RecursionGuard)
            }
        })
    }
}

impl Drop for RecursionGuard {
    fn drop(&mut self) {
        IN_HOOK.with(|flag| flag.set(false));
    }
}

/// Value a hook returns when the original symbol is missing.
trait Failure {
    fn failure() -> Self;
}

impl Failure for c_int {
    fn failure() -> Self {
        -1
    }
}

impl Failure for ssize_t {
    fn failure() -> Self {
        -1
    }
}

impl<T> Failure for *mut T {
    fn failure() -> Self {
        ptr::null_mut()
    }
}

/// Lazily resolved original function.
///
/// Racing resolvers store the same pointer, so a plain atomic is enough.
struct Real<F> {
    symbol: &'static CStr,
    ptr: AtomicPtr<c_void>,
    _fn: PhantomData<F>,
}

impl<F: Copy> Real<F> {
    const fn new(symbol: &'static CStr) -> Self {
        Self {
            symbol,
            ptr: AtomicPtr::new(ptr::null_mut()),
            _fn: PhantomData,
        }
    }

    fn resolve(&self) -> Option<F> {
        let mut ptr = self.ptr.load(Ordering::Acquire);
        if ptr.is_null() {
            ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, self.symbol.as_ptr()) };
            if ptr.is_null() {
                return None;
            }
            self.ptr.store(ptr, Ordering::Release);
        }
        Some(unsafe { std::mem::transmute_copy(&ptr) })
    }

    unsafe fn call<R: Failure>(&self, body: impl FnOnce(F) -> R) -> R {
        match self.resolve() {
            Some(f) => body(f),
            None => fail(libc::ENOSYS),
        }
    }
}

/// Set errno and return the failure value.
unsafe fn fail<R: Failure>(errno: c_int) -> R {
    *libc::__errno_location() = errno;
    R::failure()
}

/// Working directory into `buf`; errno is left untouched.
unsafe fn current_dir(buf: &mut PathBuffer) -> Option<()> {
    let errno = *libc::__errno_location();
    let filled = buf.fill(|bytes| !libc::getcwd(bytes.as_mut_ptr().cast(), bytes.len()).is_null());
    if filled.is_none() {
        *libc::__errno_location() = errno;
    }
    filled
}

/// Rewrite `path` into `out`.
///
/// Relative paths are joined onto the working directory only for `AT_FDCWD`;
/// a relative path under a real directory descriptor is left alone.
unsafe fn rewrite_path(dirfd: c_int, path: *const c_char, out: &mut PathBuffer) -> Rewrite {
    if path.is_null() {
        return Rewrite::Unchanged;
    }
    let Some(config) = state::config() else {
        return Rewrite::Unchanged;
    };
    let bytes = CStr::from_ptr(path).to_bytes();
    match bytes.first() {
        None => Rewrite::Unchanged,
        Some(b'/') => config.rewrite_into(bytes, out),
        Some(_) if dirfd == libc::AT_FDCWD => {
            let mut absolute = PathBuffer::new();
            if current_dir(&mut absolute).is_none() {
                return Rewrite::Unchanged;
            }
            if absolute.join(bytes).is_none() {
                return Rewrite::TooLong;
            }
            config.rewrite_into(absolute.as_bytes(), out)
        }
        Some(_) => Rewrite::Unchanged,
    }
}

unsafe fn redirect<R: Failure>(path: *const c_char, call: impl FnOnce(*const c_char) -> R) -> R {
    redirect_at(libc::AT_FDCWD, path, call)
}

unsafe fn redirect_at<R: Failure>(
    dirfd: c_int,
    path: *const c_char,
    call: impl FnOnce(*const c_char) -> R,
) -> R {
    let _guard = match RecursionGuard::try_enter() {
        Some(g) => g,
        None => return call(path),
    };

    let mut out = PathBuffer::new();
    match rewrite_path(dirfd, path, &mut out) {
        Rewrite::Unchanged => call(path),
        Rewrite::Rewritten => call(out.as_ptr()),
        Rewrite::TooLong => fail(libc::ENAMETOOLONG),
    }
}

unsafe fn redirect_pair_at<R: Failure>(
    olddirfd: c_int,
    oldpath: *const c_char,
    newdirfd: c_int,
    newpath: *const c_char,
    call: impl FnOnce(*const c_char, *const c_char) -> R,
) -> R {
    let _guard = match RecursionGuard::try_enter() {
        Some(g) => g,
        None => return call(oldpath, newpath),
    };

    let mut old = PathBuffer::new();
    let mut new = PathBuffer::new();
    let old = match rewrite_path(olddirfd, oldpath, &mut old) {
        Rewrite::Unchanged => oldpath,
        Rewrite::Rewritten => old.as_ptr(),
        Rewrite::TooLong => return fail(libc::ENAMETOOLONG),
    };
    let new = match rewrite_path(newdirfd, newpath, &mut new) {
        Rewrite::Unchanged => newpath,
        Rewrite::Rewritten => new.as_ptr(),
        Rewrite::TooLong => return fail(libc::ENAMETOOLONG),
    };
    call(old, new)
}

/// Report a resolved path under the target at its place under the source.
///
/// `resolved` is either the caller's `PATH_MAX` buffer or memory `realpath`
/// allocated, which the caller frees.
unsafe fn restore_resolved(resolved: *mut c_char, caller_buf: *mut c_char) -> *mut c_char {
    let Some(config) = state::config() else {
        return resolved;
    };
    let mut restored = PathBuffer::new();
    match config.restore_into(CStr::from_ptr(resolved).to_bytes(), &mut restored) {
        Rewrite::Unchanged => resolved,
        Rewrite::TooLong => {
            if caller_buf.is_null() {
                libc::free(resolved.cast());
            }
            fail(libc::ENAMETOOLONG)
        }
        Rewrite::Rewritten => {
            let bytes = restored.as_bytes_with_nul();
            let out = if caller_buf.is_null() {
                let out = libc::realloc(resolved.cast(), bytes.len()).cast::<c_char>();
                if out.is_null() {
                    libc::free(resolved.cast());
                    return fail(libc::ENOMEM);
                }
                out
            } else {
                resolved
            };
            ptr::copy_nonoverlapping(bytes.as_ptr(), out.cast::<u8>(), bytes.len());
            out
        }
    }
}

// Type aliases for function pointers
type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;
type OpenatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, mode_t) -> c_int;
type CreatFn = unsafe extern "C" fn(*const c_char, mode_t) -> c_int;
type FopenFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut FILE;
type FreopenFn = unsafe extern "C" fn(*const c_char, *const c_char, *mut FILE) -> *mut FILE;
type StatFn = unsafe extern "C" fn(*const c_char, *mut libc::stat) -> c_int;
type FstatatFn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat, c_int) -> c_int;
type AccessFn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
type FaccessatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, c_int) -> c_int;
type OpendirFn = unsafe extern "C" fn(*const c_char) -> *mut DIR;
type ScandirFn =
    unsafe extern "C" fn(*const c_char, *mut *mut *mut libc::dirent, *const c_void, *const c_void)
        -> c_int;
type MkdirFn = unsafe extern "C" fn(*const c_char, mode_t) -> c_int;
type MkdiratFn = unsafe extern "C" fn(c_int, *const c_char, mode_t) -> c_int;
type PathFn = unsafe extern "C" fn(*const c_char) -> c_int;
type UnlinkatFn = unsafe extern "C" fn(c_int, *const c_char, c_int) -> c_int;
type RenameFn = unsafe extern "C" fn(*const c_char, *const c_char) -> c_int;
type RenameatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int;
type ReadlinkFn = unsafe extern "C" fn(*const c_char, *mut c_char, size_t) -> ssize_t;
type ReadlinkatFn = unsafe extern "C" fn(c_int, *const c_char, *mut c_char, size_t) -> ssize_t;
type RealpathFn = unsafe extern "C" fn(*const c_char, *mut c_char) -> *mut c_char;
type TruncateFn = unsafe extern "C" fn(*const c_char, off_t) -> c_int;

// glibc-only entry points: LFS aliases, fortified opens and the legacy stat ABI
#[cfg(target_env = "gnu")]
type Open2Fn = unsafe extern "C" fn(*const c_char, c_int) -> c_int;
#[cfg(target_env = "gnu")]
type Openat2Fn = unsafe extern "C" fn(c_int, *const c_char, c_int) -> c_int;
#[cfg(target_env = "gnu")]
type Stat64Fn = unsafe extern "C" fn(*const c_char, *mut libc::stat64) -> c_int;
#[cfg(target_env = "gnu")]
type Fstatat64Fn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat64, c_int) -> c_int;
#[cfg(target_env = "gnu")]
type StatxFn = unsafe extern "C" fn(c_int, *const c_char, c_int, c_uint, *mut libc::statx) -> c_int;
#[cfg(target_env = "gnu")]
type XstatFn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat) -> c_int;
#[cfg(target_env = "gnu")]
type Xstat64Fn = unsafe extern "C" fn(c_int, *const c_char, *mut libc::stat64) -> c_int;
#[cfg(target_env = "gnu")]
type FxstatatFn =
    unsafe extern "C" fn(c_int, c_int, *const c_char, *mut libc::stat, c_int) -> c_int;
#[cfg(target_env = "gnu")]
type Fxstatat64Fn =
    unsafe extern "C" fn(c_int, c_int, *const c_char, *mut libc::stat64, c_int) -> c_int;
#[cfg(target_env = "gnu")]
type Renameat2Fn =
    unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char, c_uint) -> c_int;
#[cfg(target_env = "gnu")]
type Truncate64Fn = unsafe extern "C" fn(*const c_char, libc::off64_t) -> c_int;

macro_rules! originals {
    ($($(#[$attr:meta])* $name:ident: $ty:ty = $symbol:literal;)+) => {
        $(
            $(#[$attr])*
            static $name: Real<$ty> = Real::new($symbol);
        )+

        fn resolve_all() {
            $(
                $(#[$attr])*
                let _ = $name.resolve();
            )+
        }
    };
}

originals! {
    OPEN: OpenFn = c"open";
    OPENAT: OpenatFn = c"openat";
    CREAT: CreatFn = c"creat";
    FOPEN: FopenFn = c"fopen";
    FREOPEN: FreopenFn = c"freopen";
    STAT: StatFn = c"stat";
    LSTAT: StatFn = c"lstat";
    FSTATAT: FstatatFn = c"fstatat";
    ACCESS: AccessFn = c"access";
    FACCESSAT: FaccessatFn = c"faccessat";
    OPENDIR: OpendirFn = c"opendir";
    SCANDIR: ScandirFn = c"scandir";
    MKDIR: MkdirFn = c"mkdir";
    MKDIRAT: MkdiratFn = c"mkdirat";
    RMDIR: PathFn = c"rmdir";
    UNLINK: PathFn = c"unlink";
    UNLINKAT: UnlinkatFn = c"unlinkat";
    RENAME: RenameFn = c"rename";
    RENAMEAT: RenameatFn = c"renameat";
    READLINK: ReadlinkFn = c"readlink";
    READLINKAT: ReadlinkatFn = c"readlinkat";
    REALPATH: RealpathFn = c"realpath";
    TRUNCATE: TruncateFn = c"truncate";
    #[cfg(target_env = "gnu")] OPEN64: OpenFn = c"open64";
    #[cfg(target_env = "gnu")] OPEN_2: Open2Fn = c"__open_2";
    #[cfg(target_env = "gnu")] OPEN64_2: Open2Fn = c"__open64_2";
    #[cfg(target_env = "gnu")] OPENAT64: OpenatFn = c"openat64";
    #[cfg(target_env = "gnu")] OPENAT_2: Openat2Fn = c"__openat_2";
    #[cfg(target_env = "gnu")] OPENAT64_2: Openat2Fn = c"__openat64_2";
    #[cfg(target_env = "gnu")] CREAT64: CreatFn = c"creat64";
    #[cfg(target_env = "gnu")] FOPEN64: FopenFn = c"fopen64";
    #[cfg(target_env = "gnu")] STAT64: Stat64Fn = c"stat64";
    #[cfg(target_env = "gnu")] LSTAT64: Stat64Fn = c"lstat64";
    #[cfg(target_env = "gnu")] FSTATAT64: Fstatat64Fn = c"fstatat64";
    #[cfg(target_env = "gnu")] STATX: StatxFn = c"statx";
    #[cfg(target_env = "gnu")] XSTAT: XstatFn = c"__xstat";
    #[cfg(target_env = "gnu")] XSTAT64: Xstat64Fn = c"__xstat64";
    #[cfg(target_env = "gnu")] LXSTAT: XstatFn = c"__lxstat";
    #[cfg(target_env = "gnu")] LXSTAT64: Xstat64Fn = c"__lxstat64";
    #[cfg(target_env = "gnu")] FXSTATAT: FxstatatFn = c"__fxstatat";
    #[cfg(target_env = "gnu")] FXSTATAT64: Fxstatat64Fn = c"__fxstatat64";
    #[cfg(target_env = "gnu")] EUIDACCESS: AccessFn = c"euidaccess";
    #[cfg(target_env = "gnu")] EACCESS: AccessFn = c"eaccess";
    #[cfg(target_env = "gnu")] RENAMEAT2: Renameat2Fn = c"renameat2";
    #[cfg(target_env = "gnu")] TRUNCATE64: Truncate64Fn = c"truncate64";
}

/// Library constructor: resolves the originals and reads the environment
/// before the host's `main` runs.
#[ctor]
unsafe fn init() {
    resolve_all();
    let _ = state::config();
}

//
// File open functions
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    OPEN.call(|f| redirect(path, |p| f(p, flags, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    OPEN64.call(|f| redirect(path, |p| f(p, flags, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __open_2(path: *const c_char, flags: c_int) -> c_int {
    OPEN_2.call(|f| redirect(path, |p| f(p, flags)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __open64_2(path: *const c_char, flags: c_int) -> c_int {
    OPEN64_2.call(|f| redirect(path, |p| f(p, flags)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    OPENAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn openat64(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    OPENAT64.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __openat_2(dirfd: c_int, path: *const c_char, flags: c_int) -> c_int {
    OPENAT_2.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __openat64_2(dirfd: c_int, path: *const c_char, flags: c_int) -> c_int {
    OPENAT64_2.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn creat(path: *const c_char, mode: mode_t) -> c_int {
    CREAT.call(|f| redirect(path, |p| f(p, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn creat64(path: *const c_char, mode: mode_t) -> c_int {
    CREAT64.call(|f| redirect(path, |p| f(p, mode)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fopen(path: *const c_char, mode: *const c_char) -> *mut FILE {
    FOPEN.call(|f| redirect(path, |p| f(p, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fopen64(path: *const c_char, mode: *const c_char) -> *mut FILE {
    FOPEN64.call(|f| redirect(path, |p| f(p, mode)))
}

// a null path reopens the same file with a new mode and passes through
#[unsafe(no_mangle)]
pub unsafe extern "C" fn freopen(
    path: *const c_char,
    mode: *const c_char,
    stream: *mut FILE,
) -> *mut FILE {
    FREOPEN.call(|f| redirect(path, |p| f(p, mode, stream)))
}

//
// Stat functions
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn stat(path: *const c_char, buf: *mut libc::stat) -> c_int {
    STAT.call(|f| redirect(path, |p| f(p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn stat64(path: *const c_char, buf: *mut libc::stat64) -> c_int {
    STAT64.call(|f| redirect(path, |p| f(p, buf)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn lstat(path: *const c_char, buf: *mut libc::stat) -> c_int {
    LSTAT.call(|f| redirect(path, |p| f(p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn lstat64(path: *const c_char, buf: *mut libc::stat64) -> c_int {
    LSTAT64.call(|f| redirect(path, |p| f(p, buf)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn fstatat(
    dirfd: c_int,
    path: *const c_char,
    buf: *mut libc::stat,
    flags: c_int,
) -> c_int {
    FSTATAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, buf, flags)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn fstatat64(
    dirfd: c_int,
    path: *const c_char,
    buf: *mut libc::stat64,
    flags: c_int,
) -> c_int {
    FSTATAT64.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, buf, flags)))
}

// `statx(fd, "", AT_EMPTY_PATH, ...)` has nothing to rewrite and passes through
#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn statx(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mask: c_uint,
    buf: *mut libc::statx,
) -> c_int {
    STATX.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags, mask, buf)))
}

//
// Glibc internal stat functions (pre-2.33 binaries)
//

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __xstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    XSTAT.call(|f| redirect(path, |p| f(ver, p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __xstat64(
    ver: c_int,
    path: *const c_char,
    buf: *mut libc::stat64,
) -> c_int {
    XSTAT64.call(|f| redirect(path, |p| f(ver, p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __lxstat(ver: c_int, path: *const c_char, buf: *mut libc::stat) -> c_int {
    LXSTAT.call(|f| redirect(path, |p| f(ver, p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __lxstat64(
    ver: c_int,
    path: *const c_char,
    buf: *mut libc::stat64,
) -> c_int {
    LXSTAT64.call(|f| redirect(path, |p| f(ver, p, buf)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __fxstatat(
    ver: c_int,
    dirfd: c_int,
    path: *const c_char,
    buf: *mut libc::stat,
    flags: c_int,
) -> c_int {
    FXSTATAT.call(|f| redirect_at(dirfd, path, |p| f(ver, dirfd, p, buf, flags)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn __fxstatat64(
    ver: c_int,
    dirfd: c_int,
    path: *const c_char,
    buf: *mut libc::stat64,
    flags: c_int,
) -> c_int {
    FXSTATAT64.call(|f| redirect_at(dirfd, path, |p| f(ver, dirfd, p, buf, flags)))
}

//
// Existence checks
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn access(path: *const c_char, mode: c_int) -> c_int {
    ACCESS.call(|f| redirect(path, |p| f(p, mode)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn faccessat(
    dirfd: c_int,
    path: *const c_char,
    mode: c_int,
    flags: c_int,
) -> c_int {
    FACCESSAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, mode, flags)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn euidaccess(path: *const c_char, mode: c_int) -> c_int {
    EUIDACCESS.call(|f| redirect(path, |p| f(p, mode)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn eaccess(path: *const c_char, mode: c_int) -> c_int {
    EACCESS.call(|f| redirect(path, |p| f(p, mode)))
}

//
// Directory functions
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn opendir(path: *const c_char) -> *mut DIR {
    OPENDIR.call(|f| redirect(path, |p| f(p)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn scandir(
    path: *const c_char,
    namelist: *mut *mut *mut libc::dirent,
    filter: *const c_void,
    compar: *const c_void,
) -> c_int {
    SCANDIR.call(|f| redirect(path, |p| f(p, namelist, filter, compar)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn mkdir(path: *const c_char, mode: mode_t) -> c_int {
    MKDIR.call(|f| redirect(path, |p| f(p, mode)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn mkdirat(dirfd: c_int, path: *const c_char, mode: mode_t) -> c_int {
    MKDIRAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, mode)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rmdir(path: *const c_char) -> c_int {
    RMDIR.call(|f| redirect(path, |p| f(p)))
}

//
// File manipulation functions
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn unlink(path: *const c_char) -> c_int {
    UNLINK.call(|f| redirect(path, |p| f(p)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn unlinkat(dirfd: c_int, path: *const c_char, flags: c_int) -> c_int {
    UNLINKAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, flags)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn rename(oldpath: *const c_char, newpath: *const c_char) -> c_int {
    RENAME.call(|f| {
        redirect_pair_at(libc::AT_FDCWD, oldpath, libc::AT_FDCWD, newpath, |o, n| f(o, n))
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn renameat(
    olddirfd: c_int,
    oldpath: *const c_char,
    newdirfd: c_int,
    newpath: *const c_char,
) -> c_int {
    RENAMEAT.call(|f| {
        redirect_pair_at(olddirfd, oldpath, newdirfd, newpath, |o, n| {
            f(olddirfd, o, newdirfd, n)
        })
    })
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn renameat2(
    olddirfd: c_int,
    oldpath: *const c_char,
    newdirfd: c_int,
    newpath: *const c_char,
    flags: c_uint,
) -> c_int {
    RENAMEAT2.call(|f| {
        redirect_pair_at(olddirfd, oldpath, newdirfd, newpath, |o, n| {
            f(olddirfd, o, newdirfd, n, flags)
        })
    })
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn truncate(path: *const c_char, length: off_t) -> c_int {
    TRUNCATE.call(|f| redirect(path, |p| f(p, length)))
}

#[cfg(target_env = "gnu")]
#[unsafe(no_mangle)]
pub unsafe extern "C" fn truncate64(path: *const c_char, length: libc::off64_t) -> c_int {
    TRUNCATE64.call(|f| redirect(path, |p| f(p, length)))
}

//
// Link resolution functions
//

#[unsafe(no_mangle)]
pub unsafe extern "C" fn readlink(
    path: *const c_char,
    buf: *mut c_char,
    bufsiz: size_t,
) -> ssize_t {
    READLINK.call(|f| redirect(path, |p| f(p, buf, bufsiz)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn readlinkat(
    dirfd: c_int,
    path: *const c_char,
    buf: *mut c_char,
    bufsiz: size_t,
) -> ssize_t {
    READLINKAT.call(|f| redirect_at(dirfd, path, |p| f(dirfd, p, buf, bufsiz)))
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn realpath(path: *const c_char, resolved_path: *mut c_char) -> *mut c_char {
    REALPATH.call(|f| {
        let _guard = match RecursionGuard::try_enter() {
            Some(g) => g,
            None => return f(path, resolved_path),
        };

        // a result under the target is reported under the source again
        let mut rewritten = PathBuffer::new();
        match rewrite_path(libc::AT_FDCWD, path, &mut rewritten) {
            Rewrite::Unchanged => f(path, resolved_path),
            Rewrite::TooLong => fail(libc::ENAMETOOLONG),
            Rewrite::Rewritten => {
                let resolved = f(rewritten.as_ptr(), resolved_path);
                if resolved.is_null() {
                    resolved
                } else {
                    restore_resolved(resolved, resolved_path)
                }
            }
        }
    })
}
