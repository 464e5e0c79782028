//! Process-wide redirect configuration, loaded once.

use crate::rule::RedirectConfig;
use std::sync::OnceLock;

/// Lifecycle of the redirect configuration.
///
/// The transition out of `Unconfigured` happens once and is permanent.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedirectState {
    Unconfigured = 0,
    Disabled = 1,
    Configured = 2,
}

/// Write-once slot for a [`RedirectConfig`].
///
/// Concurrent first callers block until the winner publishes its value, so
/// nobody observes a half-built config.
pub struct ConfigCell(OnceLock<Option<RedirectConfig>>);

impl ConfigCell {
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    pub fn get_or_load(
        &self,
        load: impl FnOnce() -> Option<RedirectConfig>,
    ) -> Option<&RedirectConfig> {
        self.0.get_or_init(load).as_ref()
    }

    pub fn state(&self) -> RedirectState {
        match self.0.get() {
            None => RedirectState::Unconfigured,
            Some(None) => RedirectState::Disabled,
            Some(Some(_)) => RedirectState::Configured,
        }
    }
}

impl Default for ConfigCell {
    fn default() -> Self {
        Self::new()
    }
}

static CONFIG: ConfigCell = ConfigCell::new();

/// Config from the process environment, read on first use.
pub fn config() -> Option<&'static RedirectConfig> {
    CONFIG.get_or_load(RedirectConfig::from_env)
}

pub fn state() -> RedirectState {
    CONFIG.state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn state_follows_first_load() {
        let cell = ConfigCell::new();
        assert_eq!(cell.state(), RedirectState::Unconfigured);
        assert!(cell.get_or_load(|| None).is_none());
        assert_eq!(cell.state(), RedirectState::Disabled);
        // later loaders never run
        assert!(cell.get_or_load(|| RedirectConfig::new("/a", "/b")).is_none());
        assert_eq!(cell.state(), RedirectState::Disabled);

        let cell = ConfigCell::new();
        let loaded = cell.get_or_load(|| RedirectConfig::new("/a", "/b"));
        assert_eq!(loaded.map(|c| c.target().to_owned()), Some("/b".into()));
        assert_eq!(cell.state(), RedirectState::Configured);
    }

    #[test]
    fn concurrent_first_use_sees_one_config() {
        const THREADS: usize = 128;
        let cell = Arc::new(ConfigCell::new());
        let loads = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let loads = Arc::clone(&loads);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let config = cell.get_or_load(|| {
                        loads.fetch_add(1, Ordering::SeqCst);
                        thread::yield_now();
                        RedirectConfig::new("/repo/.cursor", "/repo/.cursor/agents/backend")
                    });
                    config.map(|c| (c.source().to_owned(), c.target().to_owned()))
                })
            })
            .collect();

        for handle in handles {
            let (source, target) = handle.join().unwrap().expect("configured");
            assert_eq!(source, std::path::Path::new("/repo/.cursor"));
            assert_eq!(target, std::path::Path::new("/repo/.cursor/agents/backend"));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cell.state(), RedirectState::Configured);
    }
}
