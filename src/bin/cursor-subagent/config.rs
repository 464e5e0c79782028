use crate::library;
use anyhow::{Context as _, Result};
use serde::Deserialize;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".cursor-subagent.toml";

/// Overrides the `cursor-agent` executable location.
pub const CURSOR_AGENT_VAR: &str = "CURSOR_AGENT_PATH";
/// Overrides the interception library location.
pub const LIBRARY_VAR: &str = "CURSOR_SUBAGENT_DYLIB_PATH";

/// Configuration object
///
/// `.cursor-subagent.toml` is deserialized to this object
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    cursor_agent: Option<PathBuf>,
    library: Option<PathBuf>,
}

impl Config {
    pub fn from_file_path(p: impl AsRef<Path>) -> Result<Self> {
        let s = fs::read_to_string(p.as_ref())
            .with_context(|| format!("Config file read error: {}", p.as_ref().display()))?;
        let c = toml::from_str(&s)
            .with_context(|| format!("Config file format error: {}", p.as_ref().display()))?;
        Ok(c)
    }

    /// Search `file_name` from `p` up through its parents.
    ///
    /// The nearest file wins; no file at all yields the default config.
    pub fn from_dir_path(p: impl AsRef<Path>, file_name: impl AsRef<Path>) -> Result<Self> {
        let mut path = fs::canonicalize(p).context("Failed to get absolute path")?;
        let f = file_name.as_ref();
        loop {
            let file_path = path.join(f);
            if file_path.is_file() {
                return Self::from_file_path(file_path);
            }
            if let Some(new_path) = path.parent() {
                path = new_path.to_path_buf();
            } else {
                return Ok(Self::default());
            }
        }
    }

    /// Get configured cursor-agent path
    pub fn cursor_agent(&self) -> Option<&Path> {
        self.cursor_agent.as_deref()
    }
    /// Get configured library path
    pub fn library(&self) -> Option<&Path> {
        self.library.as_deref()
    }
}

/// Effective locations for one launcher invocation
#[derive(Clone, Debug)]
pub struct Settings {
    pub project_root: PathBuf,
    pub cursor_agent: PathBuf,
    pub library: PathBuf,
}

impl Settings {
    /// Resolve settings for the current directory and environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|config| config)
    }

    /// [`Settings::load`] for help and version output, where a broken config
    /// file is only a warning.
    pub fn load_lenient() -> Result<Self> {
        Self::load_with(|config| {
            Ok(config.unwrap_or_else(|e| {
                tracing::warn!("{e:#}");
                Config::default()
            }))
        })
    }

    fn load_with(config: impl FnOnce(Result<Config>) -> Result<Config>) -> Result<Self> {
        let cwd = env::current_dir().context("failed to get current dir")?;
        let project_root = fs::canonicalize(&cwd).context("Failed to get absolute path")?;
        let config = config(Config::from_dir_path(&project_root, CONFIG_FILE_NAME))?;
        let home = env::var_os("HOME").map(PathBuf::from);
        let exe_dir = env::current_exe()
            .ok()
            .and_then(|v| v.parent().map(Path::to_path_buf));
        tracing::debug!("project root: {}", project_root.display());
        Ok(Self::resolve(
            project_root,
            home.as_deref(),
            exe_dir.as_deref(),
            &config,
            |key| env::var_os(key),
        ))
    }

    /// Precedence: environment, then config file, then defaults.
    pub fn resolve(
        project_root: PathBuf,
        home: Option<&Path>,
        exe_dir: Option<&Path>,
        config: &Config,
        lookup: impl Fn(&str) -> Option<OsString>,
    ) -> Self {
        let home = home.map(Path::to_path_buf).unwrap_or_default();
        let cursor_agent = lookup(CURSOR_AGENT_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| config.cursor_agent().map(Path::to_path_buf))
            .unwrap_or_else(|| home.join(".local").join("bin").join("cursor-agent"));
        let library = lookup(LIBRARY_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| config.library().map(Path::to_path_buf))
            .unwrap_or_else(|| library::locate(&home, &project_root, exe_dir));
        Self {
            project_root,
            cursor_agent,
            library,
        }
    }

    /// Shared configuration root, the redirect source
    pub fn cursor_dir(&self) -> PathBuf {
        self.project_root.join(".cursor")
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.cursor_dir().join("agents")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_file_is_found_in_parent_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "cursor_agent = \"/opt/cursor/cursor-agent\"\n",
        )
        .unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::from_dir_path(&nested, CONFIG_FILE_NAME).unwrap();
        assert_eq!(
            config.cursor_agent(),
            Some(Path::new("/opt/cursor/cursor-agent"))
        );
        assert_eq!(config.library(), None);
    }

    #[test]
    fn malformed_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "unknown_key = 1\n").unwrap();
        let err = Config::from_dir_path(dir.path(), CONFIG_FILE_NAME).unwrap_err();
        assert!(format!("{err:#}").contains("Config file format error"));
    }

    #[test]
    fn environment_overrides_config_file() {
        let config: Config =
            toml::from_str("cursor_agent = \"/from/file\"\nlibrary = \"/from/file.so\"\n").unwrap();
        let settings = Settings::resolve(
            PathBuf::from("/proj"),
            Some(Path::new("/home/u")),
            None,
            &config,
            |key| match key {
                CURSOR_AGENT_VAR => Some(OsString::from("/from/env")),
                _ => None,
            },
        );
        assert_eq!(settings.cursor_agent, PathBuf::from("/from/env"));
        assert_eq!(settings.library, PathBuf::from("/from/file.so"));
    }

    #[test]
    fn defaults_live_under_home() {
        let settings = Settings::resolve(
            PathBuf::from("/nonexistent/proj"),
            Some(Path::new("/nonexistent/home")),
            None,
            &Config::default(),
            |_| None,
        );
        assert_eq!(
            settings.cursor_agent,
            PathBuf::from("/nonexistent/home/.local/bin/cursor-agent")
        );
        assert_eq!(settings.cursor_dir(), PathBuf::from("/nonexistent/proj/.cursor"));
        assert_eq!(
            settings.agents_dir(),
            PathBuf::from("/nonexistent/proj/.cursor/agents")
        );
    }
}
