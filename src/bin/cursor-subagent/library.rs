use crate::contract::{LIBRARY_FILE_NAME, VERSION_SYMBOL};
use anyhow::Context as _;
use libloading::{Library, Symbol};
use std::ffi::{CStr, c_char};
use std::path::{Path, PathBuf};

/// Library produced next to this binary by the same build.
const BUILD_TREE_LIBRARY: &str = env!("DYLIB_PATH");

/// Pick the interception library among the install locations.
///
/// The first existing file wins. When none exists, the user install
/// location is returned so the error names where it was expected.
pub fn locate(home: &Path, project_root: &Path, exe_dir: Option<&Path>) -> PathBuf {
    let installed = home
        .join(".local")
        .join("share")
        .join("cursor-subagent")
        .join(LIBRARY_FILE_NAME);
    let mut candidates = vec![installed.clone(), project_root.join(LIBRARY_FILE_NAME)];
    if let Some(exe_dir) = exe_dir {
        candidates.push(exe_dir.join(LIBRARY_FILE_NAME));
    }
    candidates.extend(build_tree_candidates());

    for candidate in candidates {
        tracing::trace!("library candidate: {}", candidate.display());
        if candidate.is_file() {
            return candidate;
        }
    }
    installed
}

/// Library in the build tree: the profile directory, or `deps/` where
/// `cargo test` leaves it without the final copy.
fn build_tree_candidates() -> Vec<PathBuf> {
    let library = PathBuf::from(BUILD_TREE_LIBRARY);
    let deps = library
        .parent()
        .map(|dir| dir.join("deps").join(LIBRARY_FILE_NAME));
    std::iter::once(library).chain(deps).collect()
}

pub struct DyLib {
    cdylib: Library,
}

impl DyLib {
    pub fn load(library_path: &Path) -> anyhow::Result<Self> {
        let cdylib = unsafe { Library::new(library_path).context("failed to load library") }?;
        Ok(Self { cdylib })
    }

    pub fn version(&self) -> anyhow::Result<String> {
        unsafe {
            let func: Symbol<unsafe extern "C" fn() -> *const c_char> = self
                .cdylib
                .get(VERSION_SYMBOL)
                .context("failed to load version function")?;
            let ptr = func();
            anyhow::ensure!(!ptr.is_null(), "library returned no version");
            Ok(CStr::from_ptr(ptr).to_string_lossy().to_string())
        }
    }
}
