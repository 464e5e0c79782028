use crate::agents;
use crate::config::Settings;
use crate::contract::{PRELOAD_VAR, SOURCE_VAR, TARGET_VAR};
use crate::error::LaunchError;
use crate::library::DyLib;
use anyhow::Context as _;
use nix::{
    sys::{signal, wait},
    unistd,
};
use std::env;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::{OsStrExt as _, OsStringExt as _};
use std::path::Path;

const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run `cursor-agent` with `args`, unmodified.
pub fn forward(settings: &Settings, args: &[OsString]) -> anyhow::Result<i32> {
    ensure_cursor_agent(settings)?;
    spawn(&settings.cursor_agent, args, &settings.project_root, env::vars_os().collect())
}

/// Run `cursor-agent` with `agent`'s directory standing in for `.cursor/`.
pub fn run_with_agent(settings: &Settings, agent: &str, args: &[OsString]) -> anyhow::Result<i32> {
    if !cfg!(target_os = "linux") {
        return Err(LaunchError::UnsupportedPlatform.into());
    }
    let agent_path = agents::find_agent(&settings.agents_dir(), agent)?;
    ensure_cursor_agent(settings)?;
    if !settings.library.is_file() {
        return Err(LaunchError::LibraryNotFound(settings.library.clone()).into());
    }
    check_library(&settings.library)?;

    tracing::info!("running agent {agent} from {}", agent_path.display());
    let envs = agent_env(
        env::vars_os(),
        &settings.library,
        &settings.cursor_dir(),
        &agent_path,
    );
    spawn(&settings.cursor_agent, args, &settings.project_root, envs)
}

fn ensure_cursor_agent(settings: &Settings) -> Result<(), LaunchError> {
    if settings.cursor_agent.is_file() {
        Ok(())
    } else {
        Err(LaunchError::CursorAgentNotFound(
            settings.cursor_agent.clone(),
        ))
    }
}

/// A library the loader cannot open would be skipped silently in the child.
fn check_library(path: &Path) -> anyhow::Result<()> {
    let lib = DyLib::load(path)
        .with_context(|| format!("failed to load interception library: {}", path.display()))?;
    match lib.version() {
        Ok(version) if version == PKG_VERSION => {
            tracing::debug!("library version: {version}");
        }
        Ok(version) => {
            tracing::warn!("library version {version} differs from launcher {PKG_VERSION}");
        }
        Err(e) => tracing::warn!("{e:?}"),
    }
    Ok(())
}

/// Child environment: inherited variables plus the preload and redirect pair.
///
/// An inherited preload list is kept after the interception library.
pub fn agent_env(
    inherited: impl IntoIterator<Item = (OsString, OsString)>,
    library: &Path,
    source: &Path,
    target: &Path,
) -> Vec<(OsString, OsString)> {
    let mut preload = library.as_os_str().to_os_string();
    let mut envs = Vec::new();
    for (key, value) in inherited {
        if key == PRELOAD_VAR {
            if !value.is_empty() {
                preload.push(":");
                preload.push(&value);
            }
        } else if key != SOURCE_VAR && key != TARGET_VAR {
            envs.push((key, value));
        }
    }
    envs.push((PRELOAD_VAR.into(), preload));
    envs.push((SOURCE_VAR.into(), source.as_os_str().to_os_string()));
    envs.push((TARGET_VAR.into(), target.as_os_str().to_os_string()));
    envs
}

fn c_string(v: &OsStr) -> anyhow::Result<CString> {
    CString::new(v.as_bytes()).context("failed to get C string")
}

/// Fork and exec `program` in `cwd`, then wait for it.
///
/// Returns the child's exit code, or 128 plus the signal number.
fn spawn(
    program: &Path,
    args: &[OsString],
    cwd: &Path,
    envs: Vec<(OsString, OsString)>,
) -> anyhow::Result<i32> {
    let command = c_string(program.as_os_str())?;
    let argv = std::iter::once(Ok(command.clone()))
        .chain(args.iter().map(|v| c_string(v)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let envp = envs
        .into_iter()
        .map(|(key, value)| {
            let mut pair = key.into_vec();
            pair.push(b'=');
            pair.extend(value.into_vec());
            CString::new(pair).context("failed to get C string")
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let cwd = c_string(cwd.as_os_str())?;
    tracing::debug!("exec {} with {} args", program.display(), args.len());

    let child_pid = match unsafe { unistd::fork().context("failed to start child process")? } {
        unistd::ForkResult::Parent { child } => child,
        unistd::ForkResult::Child => {
            let err = match unistd::chdir(cwd.as_c_str()) {
                Ok(()) => match unistd::execve(&command, &argv, &envp) {
                    Ok(never) => match never {},
                    Err(e) => e,
                },
                Err(e) => e,
            };
            eprintln!("Error: failed to start {}: {err}", program.display());
            unsafe { libc::_exit(127) }
        }
    };

    // the child shares our terminal and handles interrupts itself
    let previous = unsafe {
        (
            signal::signal(signal::Signal::SIGINT, signal::SigHandler::SigIgn),
            signal::signal(signal::Signal::SIGQUIT, signal::SigHandler::SigIgn),
        )
    };

    let code = loop {
        match wait::waitpid(child_pid, None) {
            Ok(wait::WaitStatus::Exited(_, code)) => break code,
            Ok(wait::WaitStatus::Signaled(_, sig, _)) => break 128 + (sig as i32),
            Ok(_) => continue,
            Err(nix::errno::Errno::EINTR) => continue,
            Err(e) => return Err(e).context("failed to wait child process"),
        }
    };

    unsafe {
        if let Ok(handler) = previous.0 {
            let _ = signal::signal(signal::Signal::SIGINT, handler);
        }
        if let Ok(handler) = previous.1 {
            let _ = signal::signal(signal::Signal::SIGQUIT, handler);
        }
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(envs: &'a [(OsString, OsString)], key: &str) -> Option<&'a OsStr> {
        envs.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    #[test]
    fn agent_env_sets_redirect_pair() {
        let inherited = vec![
            (OsString::from("PATH"), OsString::from("/usr/bin")),
            (OsString::from(SOURCE_VAR), OsString::from("/stale")),
        ];
        let envs = agent_env(
            inherited,
            Path::new("/lib/libcursor_redirect.so"),
            Path::new("/repo/.cursor"),
            Path::new("/repo/.cursor/agents/backend"),
        );
        assert_eq!(lookup(&envs, "PATH"), Some(OsStr::new("/usr/bin")));
        assert_eq!(lookup(&envs, SOURCE_VAR), Some(OsStr::new("/repo/.cursor")));
        assert_eq!(
            lookup(&envs, TARGET_VAR),
            Some(OsStr::new("/repo/.cursor/agents/backend"))
        );
        assert_eq!(
            lookup(&envs, PRELOAD_VAR),
            Some(OsStr::new("/lib/libcursor_redirect.so"))
        );
        assert_eq!(envs.iter().filter(|(k, _)| k == SOURCE_VAR).count(), 1);
    }

    #[test]
    fn existing_preload_is_kept() {
        let inherited = vec![(OsString::from(PRELOAD_VAR), OsString::from("/lib/other.so"))];
        let envs = agent_env(inherited, Path::new("/lib/a.so"), Path::new("/s"), Path::new("/t"));
        assert_eq!(
            lookup(&envs, PRELOAD_VAR),
            Some(OsStr::new("/lib/a.so:/lib/other.so"))
        );
    }

    #[test]
    fn exit_code_and_signal_are_reported() {
        let cwd = env::temp_dir();
        let sh = Path::new("/bin/sh");
        let envs: Vec<_> = env::vars_os().collect();
        let code = spawn(sh, &["-c".into(), "exit 7".into()], &cwd, envs.clone()).unwrap();
        assert_eq!(code, 7);
        let code = spawn(sh, &["-c".into(), "kill -TERM $$".into()], &cwd, envs).unwrap();
        assert_eq!(code, 128 + 15);
    }
}
